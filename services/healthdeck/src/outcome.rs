//! Immutable records produced by the engine

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::target::{Severity, Status, TargetId};

/// Record of one probe's result. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub target_id: TargetId,
    pub success: bool,
    /// Status label derived from this probe alone (`up`/`down` or `pass`/`fail`/`error`)
    pub label: Status,
    pub status_code: Option<u16>,
    pub value: Option<f64>,
    pub latency_ms: u64,
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// Kind of alert a transition can raise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    #[serde(rename = "down")]
    Down,
    #[serde(rename = "recovery")]
    Recovery,
    #[serde(rename = "fail")]
    Fail,
    #[serde(rename = "pass-recovery")]
    PassRecovery,
}

/// Preference category an alert belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCategory {
    Monitor,
    DataCheck,
}

impl AlertKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::Down => "down",
            AlertKind::Recovery => "recovery",
            AlertKind::Fail => "fail",
            AlertKind::PassRecovery => "pass-recovery",
        }
    }

    pub fn category(self) -> AlertCategory {
        match self {
            AlertKind::Down | AlertKind::Recovery => AlertCategory::Monitor,
            AlertKind::Fail | AlertKind::PassRecovery => AlertCategory::DataCheck,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deduplication ledger entry written after a successful send. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub target_id: TargetId,
    pub alert: AlertKind,
    pub recipient: String,
    pub sent_at: DateTime<Utc>,
    pub details: serde_json::Value,
}

/// Per-user switches for alert e-mails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    #[serde(default = "default_true")]
    pub monitor_alerts: bool,
    #[serde(default = "default_true")]
    pub data_check_alerts: bool,
}

impl NotificationPreferences {
    pub fn allows(&self, alert: AlertKind) -> bool {
        match alert.category() {
            AlertCategory::Monitor => self.monitor_alerts,
            AlertCategory::DataCheck => self.data_check_alerts,
        }
    }
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            monitor_alerts: true,
            data_check_alerts: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Urgent,
    High,
    Medium,
    Low,
}

impl From<Severity> for TaskPriority {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Critical => TaskPriority::Urgent,
            Severity::High => TaskPriority::High,
            Severity::Medium => TaskPriority::Medium,
            Severity::Low => TaskPriority::Low,
        }
    }
}

/// Follow-up task raised for a failing data check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUpTask {
    pub target_id: TargetId,
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub created_at: DateTime<Utc>,
}
