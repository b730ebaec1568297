//! BDD test world for healthdeck service

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use cucumber::World;
use healthdeck::clock::ManualClock;
use healthdeck::config::SchedulerConfig;
use healthdeck::downtime::DowntimeManager;
use healthdeck::engine::Engine;
use healthdeck::io::{FailureClass, HttpClient, HttpResponse, TransportFailure};
use healthdeck::mailer::MemoryMailer;
use healthdeck::scheduler::{Scheduler, TickReport};
use healthdeck::store::MemoryStore;
use healthdeck::target::{Target, TargetId};
use healthdeck::HealthdeckError;

/// HTTP client answering from per-URL scripts. GETs default to 200,
/// POSTs to unscripted URLs are refused.
#[derive(Debug, Default)]
pub struct ScriptedHttp {
    get_status: Mutex<HashMap<String, u16>>,
    unreachable: Mutex<Vec<String>>,
    post_replies: Mutex<HashMap<String, (u16, String)>>,
    get_calls: Mutex<Vec<String>>,
}

impl ScriptedHttp {
    pub fn forget_post(&self, url: &str) {
        self.post_replies.lock().unwrap().remove(url);
    }

    pub fn respond(&self, url: &str, status: u16) {
        self.get_status
            .lock()
            .unwrap()
            .insert(url.to_string(), status);
        self.unreachable.lock().unwrap().retain(|u| u != url);
    }

    pub fn make_unreachable(&self, url: &str) {
        self.unreachable.lock().unwrap().push(url.to_string());
    }

    pub fn reply_to_post(&self, url: &str, status: u16, body: &str) {
        self.post_replies
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, body.to_string()));
    }

    pub fn get_calls(&self) -> Vec<String> {
        self.get_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn get(
        &self,
        url: &str,
        _headers: &[(String, String)],
        _timeout: Duration,
    ) -> healthdeck::Result<HttpResponse> {
        self.get_calls.lock().unwrap().push(url.to_string());
        if self.unreachable.lock().unwrap().iter().any(|u| u == url) {
            return Err(HealthdeckError::Transport(TransportFailure {
                class: FailureClass::ConnectionRefused,
                message: format!("GET {} failed: connection refused", url),
            }));
        }
        let status = self
            .get_status
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or(200);
        Ok(HttpResponse {
            status,
            body: String::new(),
        })
    }

    async fn post_json(
        &self,
        url: &str,
        _headers: &[(String, String)],
        _body: &serde_json::Value,
        _timeout: Duration,
    ) -> healthdeck::Result<HttpResponse> {
        match self.post_replies.lock().unwrap().get(url) {
            Some((status, body)) => Ok(HttpResponse {
                status: *status,
                body: body.clone(),
            }),
            None => Err(HealthdeckError::Transport(TransportFailure {
                class: FailureClass::ConnectionRefused,
                message: format!("POST {} failed: connection refused", url),
            })),
        }
    }
}

pub struct Services {
    pub engine: Arc<Engine>,
    pub scheduler: Arc<Scheduler>,
    pub downtime: Arc<DowntimeManager>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct HealthdeckWorld {
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<MemoryMailer>,
    pub http: Arc<ScriptedHttp>,
    pub config: SchedulerConfig,
    pub services: Option<Services>,
    pub last_tick: Option<TickReport>,
    pub last_error: Option<String>,
    pub remote_base: Option<String>,
    pub remote_results: Vec<serde_json::Value>,
}

impl HealthdeckWorld {
    fn new() -> Self {
        Self {
            clock: Arc::new(ManualClock::new(
                Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
            )),
            store: Arc::new(MemoryStore::new()),
            mailer: Arc::new(MemoryMailer::new()),
            http: Arc::new(ScriptedHttp::default()),
            config: SchedulerConfig::default(),
            services: None,
            last_tick: None,
            last_error: None,
            remote_base: None,
            remote_results: Vec::new(),
        }
    }

    /// Wire the engine on first use so earlier steps can adjust the config
    pub fn services(&mut self) -> &Services {
        if self.services.is_none() {
            let engine = Arc::new(Engine::new(
                self.store.clone(),
                self.http.clone(),
                self.mailer.clone(),
                self.clock.clone(),
                &self.config,
            ));
            let downtime = Arc::new(DowntimeManager::new(
                self.store.clone(),
                self.clock.clone(),
            ));
            let scheduler = Arc::new(Scheduler::new(
                engine.clone(),
                self.store.clone(),
                downtime.clone(),
                self.clock.clone(),
                &self.config,
            ));
            self.services = Some(Services {
                engine,
                scheduler,
                downtime,
            });
        }
        self.services.as_ref().expect("services were just built")
    }

    pub async fn target(&self, id: TargetId) -> Target {
        use healthdeck::store::Store;
        self.store
            .target(id)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("target {id} not found"))
    }

    pub fn http_url(id: TargetId) -> String {
        format!("http://service-{id}.internal/health")
    }

    /// Publish the accumulated results as the client's execute-all reply
    pub fn publish_remote_results(&self) {
        let base = self.remote_base.as_deref().expect("no remote client");
        let body = serde_json::json!({ "results": self.remote_results });
        self.http.reply_to_post(
            &format!("{}/api/execute-all", base),
            200,
            &body.to_string(),
        );
    }

    pub async fn tick(&mut self) {
        let services = self.services();
        let engine = services.engine.clone();
        let scheduler = services.scheduler.clone();
        let report = scheduler.tick().await.expect("tick failed");
        engine.settle_notifications().await;
        self.last_tick = Some(report);
    }
}

/// Parse a snake/kebab-case label through the type's serde representation
pub fn parse_label<T: serde::de::DeserializeOwned>(label: &str) -> T {
    serde_json::from_value(serde_json::Value::String(label.to_string()))
        .unwrap_or_else(|e| panic!("invalid label {label:?}: {e}"))
}
