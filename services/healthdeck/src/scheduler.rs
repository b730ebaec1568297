//! Scheduler: the fixed-tick driver that fans probes out in batches

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::downtime::DowntimeManager;
use crate::engine::{Engine, JobSummary};
use crate::probe::plan_jobs;
use crate::store::Store;

/// What one tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Targets whose timed downtime ran out this tick
    pub resumed: usize,
    pub due: usize,
    /// Sequential batches of jobs; see [`plan_jobs`]
    pub batches: usize,
    pub probed: usize,
    /// Targets whose pipeline failed after probing
    pub failed: usize,
}

/// Health snapshot of the scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub running: bool,
    pub interval_ms: u64,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub last_tick_duration_ms: Option<u64>,
    pub last_tick_error: Option<String>,
}

pub struct Scheduler {
    engine: Arc<Engine>,
    store: Arc<dyn Store>,
    downtime: Arc<DowntimeManager>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    batch_size: usize,
    status: RwLock<SchedulerStatus>,
}

impl Scheduler {
    pub fn new(
        engine: Arc<Engine>,
        store: Arc<dyn Store>,
        downtime: Arc<DowntimeManager>,
        clock: Arc<dyn Clock>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            engine,
            store,
            downtime,
            clock,
            interval: config.tick_interval,
            batch_size: config.batch_size.max(1),
            status: RwLock::new(SchedulerStatus {
                running: false,
                interval_ms: config.tick_interval.as_millis() as u64,
                last_tick_at: None,
                last_tick_duration_ms: None,
                last_tick_error: None,
            }),
        }
    }

    pub async fn status(&self) -> SchedulerStatus {
        self.status.read().await.clone()
    }

    /// Resume expired downtime, probe everything due in sequential batches
    /// and record the tick in the status snapshot
    pub async fn tick(&self) -> crate::Result<TickReport> {
        let started_at = self.clock.now();
        let started = Instant::now();

        let result = self.run_tick().await;

        let mut status = self.status.write().await;
        status.last_tick_at = Some(started_at);
        status.last_tick_duration_ms = Some(started.elapsed().as_millis() as u64);
        status.last_tick_error = result.as_ref().err().map(|e| e.to_string());
        drop(status);

        match &result {
            Ok(report) if report.due > 0 => tracing::info!(
                "Tick probed {} of {} due targets in {} batches ({} failed, {} resumed)",
                report.probed,
                report.due,
                report.batches,
                report.failed,
                report.resumed
            ),
            Ok(report) => tracing::debug!("Tick found nothing due ({} resumed)", report.resumed),
            Err(e) => tracing::error!("Tick failed: {}", e),
        }

        result
    }

    async fn run_tick(&self) -> crate::Result<TickReport> {
        let resumed = self.downtime.resume_expired().await?;

        let now = self.clock.now();
        let due: Vec<_> = self
            .store
            .targets()
            .await?
            .into_iter()
            .filter(|t| t.is_due(now))
            .collect();

        let mut report = TickReport {
            resumed: resumed.len(),
            due: due.len(),
            ..TickReport::default()
        };

        let jobs = plan_jobs(due);
        for batch in jobs.chunks(self.batch_size) {
            report.batches += 1;
            let summaries =
                futures::future::join_all(batch.iter().map(|job| self.engine.run_job(job))).await;
            let total = summaries
                .into_iter()
                .fold(JobSummary::default(), |acc, s| JobSummary {
                    probed: acc.probed + s.probed,
                    failed: acc.failed + s.failed,
                });
            report.probed += total.probed;
            report.failed += total.failed;
        }

        Ok(report)
    }

    /// Tick on a fixed interval until cancelled. Tick errors are recorded
    /// and never stop the loop.
    pub async fn run(&self, cancel: CancellationToken) {
        self.status.write().await.running = true;
        tracing::info!("Scheduler started, ticking every {:?}", self.interval);

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let _ = self.tick().await;
                }
                _ = cancel.cancelled() => {
                    tracing::debug!("Scheduler loop cancelled");
                    break;
                }
            }
        }

        self.engine.settle_notifications().await;
        self.status.write().await.running = false;
        tracing::info!("Scheduler stopped");
    }
}
