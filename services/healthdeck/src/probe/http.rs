//! HTTP reachability probe

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::io::HttpClient;
use crate::HealthdeckError;

/// Normalized result of one GET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpProbeResult {
    pub status_code: Option<u16>,
    pub latency_ms: u64,
    pub success: bool,
    pub error: Option<String>,
}

pub struct HttpProbe {
    http: Arc<dyn HttpClient>,
}

impl HttpProbe {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    /// GET `url` and compare the status against `expected_status`. Transport
    /// failures never escape: they come back as a classified error text.
    pub async fn probe(
        &self,
        url: &str,
        expected_status: u16,
        timeout: Duration,
        headers: &BTreeMap<String, String>,
    ) -> HttpProbeResult {
        let headers: Vec<(String, String)> = headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let started = Instant::now();
        let result = self.http.get(url, &headers, timeout).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                let success = response.status == expected_status;
                let error = (!success).then(|| {
                    format!(
                        "Expected status {}, got {}",
                        expected_status, response.status
                    )
                });
                tracing::debug!(
                    "Probe {} -> {} in {} ms (success={})",
                    url,
                    response.status,
                    latency_ms,
                    success
                );
                HttpProbeResult {
                    status_code: Some(response.status),
                    latency_ms,
                    success,
                    error,
                }
            }
            Err(e) => {
                if let HealthdeckError::Transport(failure) = &e {
                    tracing::debug!("Probe {} failed: {}", url, failure.message);
                }
                HttpProbeResult {
                    status_code: None,
                    latency_ms,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
