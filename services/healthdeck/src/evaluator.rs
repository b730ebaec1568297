//! Status evaluation and transition detection
//!
//! Everything here is pure: callers fetch the inputs and persist the result.

use serde::{Deserialize, Serialize};

use crate::outcome::AlertKind;
use crate::target::Status;

/// Threshold rule applied to the value reported by a data check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckKind {
    /// Pass iff the value is exactly zero
    Zero,
    /// Pass iff the value is strictly positive
    Positive,
    /// Pass iff `min <= value <= max`
    Range {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    /// Same bounds semantics as `Range`, configured by the check owner
    CustomThreshold {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
}

impl CheckKind {
    pub fn passes(&self, value: f64) -> bool {
        match self {
            CheckKind::Zero => value == 0.0,
            CheckKind::Positive => value > 0.0,
            CheckKind::Range { min, max } | CheckKind::CustomThreshold { min, max } => {
                let (min, max) = bounds(*min, *max);
                min <= value && value <= max
            }
        }
    }

    /// Human-readable description of the passing condition
    pub fn expectation(&self) -> String {
        match self {
            CheckKind::Zero => "value == 0".to_string(),
            CheckKind::Positive => "value > 0".to_string(),
            CheckKind::Range { min, max } | CheckKind::CustomThreshold { min, max } => {
                match (min, max) {
                    (Some(min), Some(max)) => format!("{} <= value <= {}", min, max),
                    (Some(min), None) => format!("value >= {}", min),
                    (None, Some(max)) => format!("value <= {}", max),
                    (None, None) => "any value".to_string(),
                }
            }
        }
    }
}

/// Unset bounds open up to the widest representable range
fn bounds(min: Option<f64>, max: Option<f64>) -> (f64, f64) {
    (min.unwrap_or(f64::MIN), max.unwrap_or(f64::MAX))
}

/// What a data check execution produced
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Value(f64),
    Failed(String),
}

/// Status of a data check for one reading. Execution errors win over
/// any threshold math.
pub fn evaluate_check(kind: &CheckKind, reading: &Reading) -> Status {
    match reading {
        Reading::Failed(_) => Status::Error,
        Reading::Value(value) if kind.passes(*value) => Status::Pass,
        Reading::Value(_) => Status::Fail,
    }
}

/// Status of an HTTP target.
///
/// `recent` holds probe successes newest first, including the probe being
/// evaluated. A success forces `Up`; `threshold` consecutive failures force
/// `Down`; a shorter failure streak keeps `previous`.
pub fn evaluate_http(previous: Status, recent: &[bool], threshold: u32) -> Status {
    let threshold = threshold.max(1) as usize;
    match recent.first() {
        None => previous,
        Some(true) => Status::Up,
        Some(false) => {
            let streak = recent.iter().take_while(|ok| !**ok).count();
            if streak >= threshold {
                Status::Down
            } else {
                previous
            }
        }
    }
}

/// Alert warranted by moving from `old` to `new`, if any
pub fn transition(old: Status, new: Status) -> Option<AlertKind> {
    match (old, new) {
        (Status::Up | Status::Unknown, Status::Down) => Some(AlertKind::Down),
        (Status::Down, Status::Up) => Some(AlertKind::Recovery),
        (old, Status::Fail) if old != Status::Fail => Some(AlertKind::Fail),
        (Status::Fail, Status::Pass) => Some(AlertKind::PassRecovery),
        _ => None,
    }
}
