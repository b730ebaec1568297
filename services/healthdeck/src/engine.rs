//! Engine: the per-target probe → evaluate → persist → notify pipeline

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::task::TaskTracker;

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::evaluator::{evaluate_check, evaluate_http, Reading};
use crate::gate::{NotificationGate, Transition};
use crate::io::HttpClient;
use crate::mailer::Mailer;
use crate::outcome::{AlertKind, CheckOutcome};
use crate::probe::{HttpProbe, ProbeJob, RemoteCheckClient};
use crate::store::{StatusUpdate, Store};
use crate::target::{Status, Target, TargetId, TargetKind};
use crate::HealthdeckError;

const MISSING_FROM_REPORT: &str = "check not reported by remote client";

/// Result of running one outcome through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub previous: Status,
    pub status: Status,
    pub alert: Option<AlertKind>,
}

/// Per-job tally the scheduler folds into its tick report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub probed: usize,
    pub failed: usize,
}

pub struct Engine {
    store: Arc<dyn Store>,
    http_probe: HttpProbe,
    remote: RemoteCheckClient,
    gate: Arc<NotificationGate>,
    clock: Arc<dyn Clock>,
    failure_threshold: u32,
    notifications: TaskTracker,
}

impl Engine {
    pub fn new(
        store: Arc<dyn Store>,
        http: Arc<dyn HttpClient>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        config: &SchedulerConfig,
    ) -> Self {
        let window = chrono::Duration::from_std(config.dedup_window)
            .unwrap_or_else(|_| chrono::Duration::minutes(15));
        let gate = NotificationGate::new(
            Arc::clone(&store),
            mailer,
            Arc::clone(&clock),
            window,
        );

        Self {
            http_probe: HttpProbe::new(Arc::clone(&http)),
            remote: RemoteCheckClient::new(http, config.remote_timeout),
            gate: Arc::new(gate),
            store,
            clock,
            failure_threshold: config.failure_threshold,
            notifications: TaskTracker::new(),
        }
    }

    pub fn remote(&self) -> &RemoteCheckClient {
        &self.remote
    }

    /// Probe one target now. Probe failures become error or failure
    /// outcomes; nothing is persisted.
    pub async fn check_monitor(&self, target: &Target) -> CheckOutcome {
        match &target.kind {
            TargetKind::Http {
                url,
                expected_status,
                timeout_ms,
                headers,
            } => {
                let result = self
                    .http_probe
                    .probe(
                        url,
                        *expected_status,
                        Duration::from_millis(*timeout_ms),
                        headers,
                    )
                    .await;
                CheckOutcome {
                    target_id: target.id,
                    success: result.success,
                    label: if result.success {
                        Status::Up
                    } else {
                        Status::Down
                    },
                    status_code: result.status_code,
                    value: None,
                    latency_ms: result.latency_ms,
                    error: result.error,
                    checked_at: self.clock.now(),
                }
            }
            TargetKind::DataCheck {
                client_base, code, ..
            } => match self.remote.execute_one(client_base, code).await {
                Ok(result) => self.data_outcome(
                    target,
                    &result.reading(),
                    result.execution_time_ms.unwrap_or_default(),
                ),
                Err(e) => self.data_outcome(target, &Reading::Failed(raw_message(&e)), 0),
            },
        }
    }

    /// Derive the new status for `outcome`, persist both atomically and queue
    /// the notification work for a transition
    pub async fn evaluate_and_notify(
        &self,
        target: &Target,
        outcome: CheckOutcome,
    ) -> crate::Result<Evaluation> {
        let previous = target.status();
        let next = match &target.kind {
            TargetKind::Http { .. } => {
                let mut recent = vec![outcome.success];
                let lookback = self.failure_threshold.max(1) as usize - 1;
                if lookback > 0 {
                    let stored = self.store.recent_outcomes(target.id, lookback).await?;
                    recent.extend(stored.iter().map(|o| o.success));
                }
                evaluate_http(previous, &recent, self.failure_threshold)
            }
            TargetKind::DataCheck { .. } => outcome.label,
        };

        let (state, alert) = target.state.advance(next, outcome.checked_at);
        let value = if target.is_http() { None } else { outcome.value };
        self.store
            .record_outcome(&outcome, StatusUpdate { state, value })
            .await?;

        if previous != next {
            tracing::info!(
                "Target {} ({}) {} -> {}",
                target.id,
                target.name,
                previous,
                next
            );
        }

        if alert.is_some() {
            let transition = Transition {
                target: target.clone(),
                previous,
                current: next,
                outcome,
                previous_value: target.last_value,
            };
            let gate = Arc::clone(&self.gate);
            self.notifications.spawn(async move {
                if let Err(e) = gate.process(&transition).await {
                    tracing::warn!(
                        "Notification for target {} failed: {}",
                        transition.target.id,
                        e
                    );
                }
            });
        }

        Ok(Evaluation {
            previous,
            status: next,
            alert,
        })
    }

    /// Probe a target immediately, outside its cadence. Shares the failure
    /// streak with scheduled probes.
    pub async fn run_now(&self, id: TargetId) -> crate::Result<Evaluation> {
        let target = self
            .store
            .target(id)
            .await?
            .ok_or(HealthdeckError::NotFound(id))?;
        tracing::debug!("Manual check of target {} ({})", target.id, target.name);
        let outcome = self.check_monitor(&target).await;
        self.evaluate_and_notify(&target, outcome).await
    }

    /// Execute one scheduled job. Failures are logged per target and never
    /// escape.
    pub async fn run_job(&self, job: &ProbeJob) -> JobSummary {
        match job {
            ProbeJob::Http(target) => {
                let outcome = self.check_monitor(target).await;
                self.settle(target, outcome).await
            }
            ProbeJob::RemoteClient { base, targets } => {
                self.run_remote_client(base, targets).await
            }
        }
    }

    /// Trigger `execute-all` on a client and evaluate each of its due
    /// targets. A client failure marks every one of them `error`.
    pub async fn run_remote_client(&self, base: &str, targets: &[Target]) -> JobSummary {
        let mut summary = JobSummary::default();

        match self.remote.execute_all(base).await {
            Ok(results) => {
                for target in targets {
                    let TargetKind::DataCheck { code, .. } = &target.kind else {
                        continue;
                    };
                    let outcome = match results.iter().find(|r| &r.code == code) {
                        Some(result) => self.data_outcome(
                            target,
                            &result.reading(),
                            result.execution_time_ms.unwrap_or_default(),
                        ),
                        None => self.data_outcome(
                            target,
                            &Reading::Failed(MISSING_FROM_REPORT.to_string()),
                            0,
                        ),
                    };
                    summary = summary.merge(self.settle(target, outcome).await);
                }
            }
            Err(e) => {
                let message = raw_message(&e);
                tracing::warn!(
                    "Remote client {} failed, marking {} checks as error: {}",
                    base,
                    targets.len(),
                    message
                );
                for target in targets {
                    let outcome =
                        self.data_outcome(target, &Reading::Failed(message.clone()), 0);
                    summary = summary.merge(self.settle(target, outcome).await);
                }
            }
        }

        summary
    }

    /// Wait until every queued notification has finished
    pub async fn settle_notifications(&self) {
        self.notifications.close();
        self.notifications.wait().await;
        self.notifications.reopen();
    }

    async fn settle(&self, target: &Target, outcome: CheckOutcome) -> JobSummary {
        match self.evaluate_and_notify(target, outcome).await {
            Ok(_) => JobSummary {
                probed: 1,
                failed: 0,
            },
            Err(e) => {
                tracing::warn!(
                    "Pipeline for target {} ({}) failed: {}",
                    target.id,
                    target.name,
                    e
                );
                JobSummary {
                    probed: 1,
                    failed: 1,
                }
            }
        }
    }

    fn data_outcome(&self, target: &Target, reading: &Reading, latency_ms: u64) -> CheckOutcome {
        let label = match &target.kind {
            TargetKind::DataCheck { check, .. } => evaluate_check(check, reading),
            TargetKind::Http { .. } => Status::Error,
        };
        let (value, error) = match reading {
            Reading::Value(value) => (Some(*value), None),
            Reading::Failed(message) => (None, Some(message.clone())),
        };
        CheckOutcome {
            target_id: target.id,
            success: label == Status::Pass,
            label,
            status_code: None,
            value,
            latency_ms,
            error,
            checked_at: self.clock.now(),
        }
    }
}

impl JobSummary {
    fn merge(self, other: JobSummary) -> JobSummary {
        JobSummary {
            probed: self.probed + other.probed,
            failed: self.failed + other.failed,
        }
    }
}

fn raw_message(err: &HealthdeckError) -> String {
    match err {
        HealthdeckError::Remote(message) => message.clone(),
        other => other.to_string(),
    }
}
