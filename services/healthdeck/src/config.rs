//! Configuration types for the healthdeck service

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::outcome::NotificationPreferences;
use crate::target::Target;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub mailer: MailerConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    /// Targets loaded into the store at startup
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

/// Tick cadence, fan-out and alerting thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_tick_interval", with = "humantime_serde")]
    pub tick_interval: Duration,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_dedup_window", with = "humantime_serde")]
    pub dedup_window: Duration,
    #[serde(default = "default_remote_timeout", with = "humantime_serde")]
    pub remote_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            batch_size: default_batch_size(),
            failure_threshold: default_failure_threshold(),
            dedup_window: default_dedup_window(),
            remote_timeout: default_remote_timeout(),
        }
    }
}

/// Outbound e-mail transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MailerConfig {
    /// Write alerts to the log instead of delivering them
    Log,
    /// POST alerts as JSON to an e-mail relay endpoint
    HttpRelay {
        url: String,
        #[serde(default)]
        api_token: Option<String>,
        #[serde(default = "default_from")]
        from: String,
    },
}

impl Default for MailerConfig {
    fn default() -> Self {
        MailerConfig::Log
    }
}

/// Dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_dashboard_port(),
        }
    }
}

/// A user account whose alert preferences are honoured
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub email: String,
    #[serde(default)]
    pub preferences: NotificationPreferences,
}

fn default_tick_interval() -> Duration {
    Duration::from_secs(15)
}

fn default_batch_size() -> usize {
    10
}

fn default_failure_threshold() -> u32 {
    2
}

fn default_dedup_window() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_remote_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_from() -> String {
    "alerts@healthdeck.local".to_string()
}

fn default_true() -> bool {
    true
}

fn default_dashboard_port() -> u16 {
    11116
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::HealthdeckError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
