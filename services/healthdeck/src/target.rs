//! Monitored targets and their status state machine

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::evaluator::CheckKind;
use crate::outcome::AlertKind;

pub type TargetId = u64;

/// Derived status of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Unknown,
    Up,
    Down,
    Pass,
    Fail,
    Error,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Unknown => "unknown",
            Status::Up => "up",
            Status::Down => "down",
            Status::Pass => "pass",
            Status::Fail => "fail",
            Status::Error => "error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current status of a target plus the moment it was entered
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusState {
    pub status: Status,
    pub entered_at: Option<DateTime<Utc>>,
}

impl StatusState {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            entered_at: None,
        }
    }

    /// Move to `next`, returning the new state and the alert the move
    /// warrants. Repeating the current status keeps the original
    /// `entered_at` and never alerts.
    pub fn advance(self, next: Status, at: DateTime<Utc>) -> (StatusState, Option<AlertKind>) {
        if next == self.status {
            return (self, None);
        }
        let state = StatusState {
            status: next,
            entered_at: Some(at),
        };
        (state, crate::evaluator::transition(self.status, next))
    }
}

impl Default for StatusState {
    fn default() -> Self {
        Self::new(Status::Unknown)
    }
}

/// Importance of a data check, which drives follow-up task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

/// How a target is probed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetKind {
    /// HTTP reachability probe
    Http {
        url: String,
        #[serde(default = "default_expected_status")]
        expected_status: u16,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
    /// Check executed by a remote client that reports a numeric value
    DataCheck {
        client_base: String,
        code: String,
        check: CheckKind,
        #[serde(default)]
        severity: Severity,
    },
}

/// A monitored HTTP endpoint or registered data check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    pub name: String,
    pub kind: TargetKind,
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub suspended_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub state: StatusState,
    #[serde(default)]
    pub last_checked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_value: Option<f64>,
    #[serde(default)]
    pub notification_email: Option<String>,
}

impl Target {
    pub fn new(id: TargetId, name: impl Into<String>, kind: TargetKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            interval_seconds: default_interval(),
            active: true,
            suspended_until: None,
            state: StatusState::default(),
            last_checked_at: None,
            last_value: None,
            notification_email: None,
        }
    }

    pub fn status(&self) -> Status {
        self.state.status
    }

    pub fn is_http(&self) -> bool {
        matches!(self.kind, TargetKind::Http { .. })
    }

    /// Active and either never probed or its cadence has elapsed
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        match self.last_checked_at {
            None => true,
            Some(last) => now >= last + Duration::seconds(self.interval_seconds as i64),
        }
    }

    pub fn is_suspended(&self) -> bool {
        !self.active
    }

    /// Timed suspension whose resume time has passed
    pub fn suspension_expired(&self, now: DateTime<Utc>) -> bool {
        !self.active && self.suspended_until.is_some_and(|until| until <= now)
    }
}

fn default_expected_status() -> u16 {
    200
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_interval() -> u64 {
    60
}

fn default_true() -> bool {
    true
}
