//! Client for remote data-check executors

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::evaluator::Reading;
use crate::io::{HttpClient, HttpResponse};
use crate::HealthdeckError;

/// One check result as reported by a remote client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteResult {
    pub code: String,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub actual_value: Option<f64>,
    #[serde(default)]
    pub execution_time_ms: Option<u64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl RemoteResult {
    /// A value only counts when the run succeeded without an error message
    pub fn reading(&self) -> Reading {
        match (&self.error_message, self.actual_value) {
            (Some(message), _) => Reading::Failed(message.clone()),
            (None, Some(value)) if self.success => Reading::Value(value),
            (None, Some(_)) => Reading::Failed("check execution failed".to_string()),
            (None, None) => Reading::Failed("check returned no value".to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExecuteAllResponse {
    #[serde(default)]
    results: Vec<RemoteResult>,
}

/// A check registered on a remote client, used for discovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckDescriptor {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub suggested_kind: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CheckListing {
    Bare(Vec<CheckDescriptor>),
    Wrapped { checks: Vec<CheckDescriptor> },
}

pub struct RemoteCheckClient {
    http: Arc<dyn HttpClient>,
    timeout: Duration,
}

impl RemoteCheckClient {
    pub fn new(http: Arc<dyn HttpClient>, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    /// Run every check registered on the client
    pub async fn execute_all(&self, base: &str) -> crate::Result<Vec<RemoteResult>> {
        let url = format!("{}/api/execute-all", base.trim_end_matches('/'));
        let response = self.post(&url).await?;
        let parsed: ExecuteAllResponse = parse(&url, &response)?;
        tracing::debug!("{} returned {} results", url, parsed.results.len());
        Ok(parsed.results)
    }

    /// Run a single check by code
    pub async fn execute_one(&self, base: &str, code: &str) -> crate::Result<RemoteResult> {
        let url = check_execute_url(base, code)?;
        let response = self.post(&url).await?;
        parse(&url, &response)
    }

    /// List the checks the client knows about
    pub async fn list_checks(&self, base: &str) -> crate::Result<Vec<CheckDescriptor>> {
        let url = format!("{}/api/checks", base.trim_end_matches('/'));
        let response = self
            .http
            .get(&url, &[], self.timeout)
            .await
            .map_err(raw_remote_error)?;
        match parse(&url, &response)? {
            CheckListing::Bare(checks) | CheckListing::Wrapped { checks } => Ok(checks),
        }
    }

    async fn post(&self, url: &str) -> crate::Result<HttpResponse> {
        self.http
            .post_json(url, &[], &serde_json::json!({}), self.timeout)
            .await
            .map_err(raw_remote_error)
    }
}

/// `{base}/api/checks/{code}/execute` with the code as one encoded segment
fn check_execute_url(base: &str, code: &str) -> crate::Result<String> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|e| HealthdeckError::Remote(format!("invalid client address {}: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| HealthdeckError::Remote(format!("invalid client address {}", base)))?
        .pop_if_empty()
        .extend(["api", "checks", code, "execute"]);
    Ok(url.to_string())
}

/// Remote failures surface the unclassified message to operators
fn raw_remote_error(err: HealthdeckError) -> HealthdeckError {
    match err {
        HealthdeckError::Transport(failure) => HealthdeckError::Remote(failure.message),
        other => HealthdeckError::Remote(other.to_string()),
    }
}

fn parse<T: serde::de::DeserializeOwned>(url: &str, response: &HttpResponse) -> crate::Result<T> {
    if !(200..300).contains(&response.status) {
        return Err(HealthdeckError::Remote(format!(
            "{} returned status {}: {}",
            url, response.status, response.body
        )));
    }
    serde_json::from_str(&response.body).map_err(|e| {
        HealthdeckError::Remote(format!("{} returned an unreadable body: {}", url, e))
    })
}
