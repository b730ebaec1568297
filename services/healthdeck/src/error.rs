//! Error types for the healthdeck service

use crate::io::TransportFailure;
use crate::target::TargetId;

/// Errors that can occur in the healthdeck service
#[derive(Debug, thiserror::Error)]
pub enum HealthdeckError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Transport(TransportFailure),

    #[error("Remote client error: {0}")]
    Remote(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Target {0} not found")]
    NotFound(TargetId),

    #[error("Unsupported downtime duration: {0} seconds")]
    InvalidDowntime(u64),

    #[error("Mailer error: {0}")]
    Mailer(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for healthdeck operations
pub type Result<T> = std::result::Result<T, HealthdeckError>;
