//! Notification Gate: decides whether a transition may alert and performs
//! the delivery side effects

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::clock::Clock;
use crate::evaluator::CheckKind;
use crate::mailer::{compose_alert, describe_value, Mailer};
use crate::outcome::{AlertKind, CheckOutcome, FollowUpTask, NotificationRecord, TaskPriority};
use crate::store::Store;
use crate::target::{Severity, Status, Target, TargetId, TargetKind};
use crate::throttle::NotificationThrottle;

/// What the gate did with a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The status change does not warrant an alert
    NotApplicable,
    /// The same alert fired for this target inside the dedup window
    Deduplicated,
    /// The target has no notification address
    NoRecipient,
    /// The recipient disabled this alert category
    OptedOut,
    /// The mailer refused the message; nothing was recorded
    DeliveryFailed,
    Sent,
}

/// A status change handed to the gate
#[derive(Debug, Clone)]
pub struct Transition {
    pub target: Target,
    pub previous: Status,
    pub current: Status,
    pub outcome: CheckOutcome,
    /// Value stored on the target before this probe
    pub previous_value: Option<f64>,
}

pub struct NotificationGate {
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    throttle: NotificationThrottle,
    clock: Arc<dyn Clock>,
    /// Serializes dedup check, delivery and record per `(target, alert)`
    slots: Mutex<HashMap<(TargetId, AlertKind), Arc<tokio::sync::Mutex<()>>>>,
}

impl std::fmt::Debug for NotificationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationGate")
            .field("mailer", &self.mailer.type_name())
            .field("window", &self.throttle.window())
            .finish()
    }
}

impl NotificationGate {
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        window: chrono::Duration,
    ) -> Self {
        Self {
            store,
            mailer,
            throttle: NotificationThrottle::new(Arc::clone(&clock), window),
            clock,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, id: TargetId, alert: AlertKind) -> Arc<tokio::sync::Mutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(slots.entry((id, alert)).or_default())
    }

    /// Run a transition through dedup, task creation, opt-out and delivery.
    ///
    /// Store failures propagate; delivery failures are logged and reported
    /// as [`GateDecision::DeliveryFailed`].
    pub async fn process(&self, transition: &Transition) -> crate::Result<GateDecision> {
        let Some(alert) = crate::evaluator::transition(transition.previous, transition.current)
        else {
            return Ok(GateDecision::NotApplicable);
        };
        let target = &transition.target;

        // Held until the ledger is written so a concurrent run of the same
        // alert sees this one
        let slot = self.slot(target.id, alert);
        let _held = slot.lock().await;

        if self.is_duplicate(target, alert).await? {
            tracing::debug!(
                "Suppressing duplicate '{}' alert for target {} ({})",
                alert,
                target.id,
                target.name
            );
            return Ok(GateDecision::Deduplicated);
        }

        if alert == AlertKind::Fail {
            self.create_follow_up(transition).await?;
        }

        let Some(recipient) = target.notification_email.as_deref() else {
            tracing::debug!(
                "Target {} ({}) has no notification address, '{}' alert not sent",
                target.id,
                target.name,
                alert
            );
            return Ok(GateDecision::NoRecipient);
        };

        if let Some(preferences) = self.store.notification_preferences(recipient).await? {
            if !preferences.allows(alert) {
                tracing::debug!("{} opted out of '{}' alerts", recipient, alert);
                return Ok(GateDecision::OptedOut);
            }
        }

        let email = compose_alert(
            recipient,
            target,
            alert,
            &transition.outcome,
            transition.previous_value,
        );
        if let Err(e) = self.mailer.send_email(&email).await {
            tracing::warn!(
                "Failed to deliver '{}' alert for target {} to {}: {}",
                alert,
                target.id,
                recipient,
                e
            );
            return Ok(GateDecision::DeliveryFailed);
        }

        if !target.is_http() {
            self.throttle.record(target.id, alert);
        }
        self.store
            .record_notification(&NotificationRecord {
                target_id: target.id,
                alert,
                recipient: recipient.to_string(),
                sent_at: self.clock.now(),
                details: serde_json::json!({
                    "previousStatus": transition.previous,
                    "status": transition.current,
                    "statusCode": transition.outcome.status_code,
                    "value": transition.outcome.value,
                    "previousValue": transition.previous_value,
                    "error": transition.outcome.error,
                }),
            })
            .await?;

        tracing::info!(
            "Sent '{}' alert for target {} ({}) to {}",
            alert,
            target.id,
            target.name,
            recipient
        );
        Ok(GateDecision::Sent)
    }

    async fn is_duplicate(&self, target: &Target, alert: AlertKind) -> crate::Result<bool> {
        if target.is_http() {
            let since = self.clock.now() - self.throttle.window();
            self.store
                .notification_sent_since(target.id, alert, since)
                .await
        } else {
            Ok(!self.throttle.allows(target.id, alert))
        }
    }

    async fn create_follow_up(&self, transition: &Transition) -> crate::Result<()> {
        let TargetKind::DataCheck {
            code,
            check,
            severity,
            ..
        } = &transition.target.kind
        else {
            return Ok(());
        };

        let task = follow_up_task(transition, code, check, *severity, self.clock.now());
        let task_id = self.store.create_task(&task).await?;
        tracing::info!(
            "Created follow-up task {} ({:?}) for data check {}",
            task_id,
            task.priority,
            code
        );
        Ok(())
    }
}

fn follow_up_task(
    transition: &Transition,
    code: &str,
    check: &CheckKind,
    severity: Severity,
    now: chrono::DateTime<chrono::Utc>,
) -> FollowUpTask {
    let description = format!(
        "Data check {} ({}) failed.\nCurrent value: {}\nPrevious value: {}\nExpected: {}",
        transition.target.name,
        code,
        describe_value(transition.outcome.value),
        describe_value(transition.previous_value),
        check.expectation(),
    );

    FollowUpTask {
        target_id: transition.target.id,
        title: format!("Investigate failing data check: {}", transition.target.name),
        description,
        priority: TaskPriority::from(severity),
        created_at: now,
    }
}
