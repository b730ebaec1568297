//! Healthdeck - periodic check and alerting engine
//!
//! Probes HTTP endpoints and remote data checks on a fixed tick, derives
//! durable statuses, and sends deduplicated alert e-mails on transitions.

pub mod clock;
pub mod config;
pub mod dashboard;
pub mod downtime;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod gate;
pub mod io;
pub mod mailer;
pub mod outcome;
pub mod probe;
pub mod scheduler;
pub mod store;
pub mod target;
pub mod throttle;

pub use config::{load_config, Config};
pub use error::{HealthdeckError, Result};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::clock::{Clock, SystemClock};
use crate::downtime::DowntimeManager;
use crate::engine::Engine;
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::scheduler::Scheduler;
use crate::store::{MemoryStore, Store};

/// Run the healthdeck service with the given configuration
pub async fn run(config: Config) -> Result<()> {
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cancel = CancellationToken::new();

    // Seed the store
    let memory = Arc::new(MemoryStore::new());
    for target in &config.targets {
        memory.insert_target(target.clone()).await;
    }
    for user in &config.users {
        memory.set_preferences(&user.email, user.preferences).await;
    }
    let store: Arc<dyn Store> = memory;

    let mailer = mailer::build_mailer(&config.mailer, Arc::clone(&http));
    let engine = Arc::new(Engine::new(
        Arc::clone(&store),
        http,
        mailer,
        Arc::clone(&clock),
        &config.scheduler,
    ));
    let downtime = Arc::new(DowntimeManager::new(Arc::clone(&store), Arc::clone(&clock)));
    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&engine),
        Arc::clone(&store),
        Arc::clone(&downtime),
        clock,
        &config.scheduler,
    ));

    // Setup shutdown handler
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl-c");
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    // Start dashboard if enabled
    if config.dashboard.enabled {
        let dashboard_port = config.dashboard.port;
        let dashboard_state = dashboard::DashboardState {
            engine,
            scheduler: Arc::clone(&scheduler),
            downtime,
            store,
        };
        let cancel_for_dashboard = cancel.clone();

        tokio::spawn(async move {
            let router = dashboard::build_router(dashboard_state);
            let addr = SocketAddr::from(([0, 0, 0, 0], dashboard_port));
            tracing::info!("Dashboard listening on http://{}", addr);

            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(e) => {
                    tracing::error!(
                        "Failed to bind dashboard to port {}: {}. Continuing without dashboard.",
                        dashboard_port,
                        e
                    );
                    return;
                }
            };

            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    cancel_for_dashboard.cancelled().await;
                })
                .await
                .ok();

            tracing::debug!("Dashboard stopped");
        });
    }

    tracing::info!(
        "Healthdeck started with {} targets",
        config.targets.len()
    );

    // Blocks until cancelled
    scheduler.run(cancel).await;

    tracing::info!("Healthdeck stopped");
    Ok(())
}
