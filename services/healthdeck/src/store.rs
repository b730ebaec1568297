//! Persistence seam for targets, outcomes, the notification ledger and tasks

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::outcome::{CheckOutcome, FollowUpTask, NotificationPreferences, NotificationRecord};
use crate::outcome::AlertKind;
use crate::target::{StatusState, Target, TargetId};
use crate::HealthdeckError;

/// Status fields written together with an outcome
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusUpdate {
    pub state: StatusState,
    /// New last observed value; `None` leaves the stored value untouched
    pub value: Option<f64>,
}

/// Read and status-mutate access to the relational store
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait Store: Send + Sync {
    async fn targets(&self) -> crate::Result<Vec<Target>>;

    async fn target(&self, id: TargetId) -> crate::Result<Option<Target>>;

    /// Reactivate every inactive target whose `suspended_until` is at or
    /// before `now`, clearing the resume time. Returns the affected ids.
    async fn resume_expired_suspensions(&self, now: DateTime<Utc>)
        -> crate::Result<Vec<TargetId>>;

    async fn set_suspension(
        &self,
        id: TargetId,
        active: bool,
        suspended_until: Option<DateTime<Utc>>,
    ) -> crate::Result<()>;

    /// Most recent outcomes for a target, newest first
    async fn recent_outcomes(&self, id: TargetId, limit: usize)
        -> crate::Result<Vec<CheckOutcome>>;

    /// Append an outcome, stamp the target's last-checked time and apply the
    /// status update as one single-target transaction
    async fn record_outcome(
        &self,
        outcome: &CheckOutcome,
        update: StatusUpdate,
    ) -> crate::Result<()>;

    async fn record_notification(&self, record: &NotificationRecord) -> crate::Result<()>;

    /// Whether `alert` was recorded for `id` at or after `since`
    async fn notification_sent_since(
        &self,
        id: TargetId,
        alert: AlertKind,
        since: DateTime<Utc>,
    ) -> crate::Result<bool>;

    async fn notifications(&self, id: TargetId) -> crate::Result<Vec<NotificationRecord>>;

    /// Preferences of the user account owning `email`, if there is one
    async fn notification_preferences(
        &self,
        email: &str,
    ) -> crate::Result<Option<NotificationPreferences>>;

    async fn create_task(&self, task: &FollowUpTask) -> crate::Result<u64>;
}

#[derive(Debug, Default)]
struct Tables {
    targets: BTreeMap<TargetId, Target>,
    outcomes: Vec<CheckOutcome>,
    notifications: Vec<NotificationRecord>,
    preferences: HashMap<String, NotificationPreferences>,
    tasks: Vec<(u64, FollowUpTask)>,
}

/// Process-local store backed by in-memory tables
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_target(&self, target: Target) {
        self.tables.write().await.targets.insert(target.id, target);
    }

    pub async fn set_preferences(&self, email: &str, preferences: NotificationPreferences) {
        self.tables
            .write()
            .await
            .preferences
            .insert(email.to_ascii_lowercase(), preferences);
    }

    /// All outcomes for a target in insertion order
    pub async fn outcomes(&self, id: TargetId) -> Vec<CheckOutcome> {
        self.tables
            .read()
            .await
            .outcomes
            .iter()
            .filter(|o| o.target_id == id)
            .cloned()
            .collect()
    }

    pub async fn tasks(&self) -> Vec<FollowUpTask> {
        self.tables
            .read()
            .await
            .tasks
            .iter()
            .map(|(_, task)| task.clone())
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn targets(&self) -> crate::Result<Vec<Target>> {
        Ok(self.tables.read().await.targets.values().cloned().collect())
    }

    async fn target(&self, id: TargetId) -> crate::Result<Option<Target>> {
        Ok(self.tables.read().await.targets.get(&id).cloned())
    }

    async fn resume_expired_suspensions(
        &self,
        now: DateTime<Utc>,
    ) -> crate::Result<Vec<TargetId>> {
        let mut tables = self.tables.write().await;
        let mut resumed = Vec::new();
        for target in tables.targets.values_mut() {
            if target.suspension_expired(now) {
                target.active = true;
                target.suspended_until = None;
                resumed.push(target.id);
            }
        }
        Ok(resumed)
    }

    async fn set_suspension(
        &self,
        id: TargetId,
        active: bool,
        suspended_until: Option<DateTime<Utc>>,
    ) -> crate::Result<()> {
        let mut tables = self.tables.write().await;
        let target = tables
            .targets
            .get_mut(&id)
            .ok_or(HealthdeckError::NotFound(id))?;
        target.active = active;
        target.suspended_until = suspended_until;
        Ok(())
    }

    async fn recent_outcomes(
        &self,
        id: TargetId,
        limit: usize,
    ) -> crate::Result<Vec<CheckOutcome>> {
        Ok(self
            .tables
            .read()
            .await
            .outcomes
            .iter()
            .rev()
            .filter(|o| o.target_id == id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn record_outcome(
        &self,
        outcome: &CheckOutcome,
        update: StatusUpdate,
    ) -> crate::Result<()> {
        let mut tables = self.tables.write().await;
        let target = tables
            .targets
            .get_mut(&outcome.target_id)
            .ok_or(HealthdeckError::NotFound(outcome.target_id))?;
        target.last_checked_at = Some(outcome.checked_at);
        target.state = update.state;
        if update.value.is_some() {
            target.last_value = update.value;
        }
        tables.outcomes.push(outcome.clone());
        Ok(())
    }

    async fn record_notification(&self, record: &NotificationRecord) -> crate::Result<()> {
        self.tables.write().await.notifications.push(record.clone());
        Ok(())
    }

    async fn notification_sent_since(
        &self,
        id: TargetId,
        alert: AlertKind,
        since: DateTime<Utc>,
    ) -> crate::Result<bool> {
        Ok(self
            .tables
            .read()
            .await
            .notifications
            .iter()
            .any(|n| n.target_id == id && n.alert == alert && n.sent_at >= since))
    }

    async fn notifications(&self, id: TargetId) -> crate::Result<Vec<NotificationRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .notifications
            .iter()
            .filter(|n| n.target_id == id)
            .cloned()
            .collect())
    }

    async fn notification_preferences(
        &self,
        email: &str,
    ) -> crate::Result<Option<NotificationPreferences>> {
        Ok(self
            .tables
            .read()
            .await
            .preferences
            .get(&email.to_ascii_lowercase())
            .copied())
    }

    async fn create_task(&self, task: &FollowUpTask) -> crate::Result<u64> {
        let mut tables = self.tables.write().await;
        let id = tables.tasks.len() as u64 + 1;
        tables.tasks.push((id, task.clone()));
        Ok(id)
    }
}
