//! HTTP client abstraction for testability, plus transport failure classification

use std::fmt;
use std::io::ErrorKind;
use std::time::Duration;

use async_trait::async_trait;

/// HTTP response from a request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Abstraction over HTTP client for dependency injection
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait HttpClient: Send + Sync {
    /// Send a GET request, following redirects, bounded by `timeout`
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> crate::Result<HttpResponse>;

    /// Send a POST request with a JSON body
    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &serde_json::Value,
        timeout: Duration,
    ) -> crate::Result<HttpResponse>;
}

/// Category of a transport-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Dns,
    ConnectionRefused,
    ConnectionReset,
    ConnectTimeout,
    RequestTimeout,
    Tls,
    Other,
}

impl FailureClass {
    /// Operator-facing label, `None` when only the raw message is meaningful
    pub fn label(self) -> Option<&'static str> {
        match self {
            FailureClass::Dns => Some("DNS resolution failed"),
            FailureClass::ConnectionRefused => Some("Connection refused"),
            FailureClass::ConnectionReset => Some("Connection reset"),
            FailureClass::ConnectTimeout => Some("Connection timed out"),
            FailureClass::RequestTimeout => Some("Request timed out"),
            FailureClass::Tls => Some("TLS/SSL certificate error"),
            FailureClass::Other => None,
        }
    }
}

/// A classified transport failure together with the raw error chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub class: FailureClass,
    pub message: String,
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.class.label() {
            Some(label) => f.write_str(label),
            None => f.write_str(&self.message),
        }
    }
}

/// Classify a failure from the text of its error causes.
///
/// `causes` must not contain the request URL, only the underlying error
/// messages, so host names cannot trip the keyword matching.
pub fn classify(
    causes: &str,
    io_kind: Option<ErrorKind>,
    timed_out: bool,
    during_connect: bool,
) -> FailureClass {
    let causes = causes.to_ascii_lowercase();
    let mentions = |needles: &[&str]| needles.iter().any(|n| causes.contains(n));

    if mentions(&[
        "dns error",
        "failed to lookup address",
        "name or service not known",
        "no such host",
        "nodename nor servname",
        "temporary failure in name resolution",
    ]) {
        FailureClass::Dns
    } else if mentions(&[
        "certificate",
        "unknownissuer",
        "notvalidforname",
        "expired",
        "ssl",
        "tls handshake",
    ]) {
        FailureClass::Tls
    } else if timed_out {
        if during_connect {
            FailureClass::ConnectTimeout
        } else {
            FailureClass::RequestTimeout
        }
    } else if io_kind == Some(ErrorKind::ConnectionRefused) || mentions(&["connection refused"]) {
        FailureClass::ConnectionRefused
    } else if io_kind == Some(ErrorKind::ConnectionReset)
        || mentions(&["connection reset", "reset by peer"])
    {
        FailureClass::ConnectionReset
    } else if io_kind == Some(ErrorKind::TimedOut) {
        FailureClass::ConnectTimeout
    } else {
        FailureClass::Other
    }
}

fn classify_reqwest(method: &str, url: &str, err: &reqwest::Error) -> crate::HealthdeckError {
    let mut causes = Vec::new();
    let mut io_kind = None;
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            io_kind.get_or_insert(io.kind());
        }
        causes.push(cause.to_string());
        source = cause.source();
    }

    let joined = causes.join(": ");
    let class = classify(&joined, io_kind, err.is_timeout(), err.is_connect());
    let message = if joined.is_empty() {
        format!("{} {} failed: {}", method, url, err)
    } else {
        format!("{} {} failed: {}: {}", method, url, err, joined)
    };

    crate::HealthdeckError::Transport(TransportFailure { class, message })
}

/// Production HTTP client using reqwest
#[derive(Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> crate::Result<HttpResponse> {
        tracing::debug!("GET {}", url);
        let mut request = self.client.get(url).timeout(timeout);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify_reqwest("GET", url, &e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest("GET", url, &e))?;

        tracing::debug!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse { status, body })
    }

    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &serde_json::Value,
        timeout: Duration,
    ) -> crate::Result<HttpResponse> {
        tracing::debug!("POST {}", url);
        let mut request = self.client.post(url).timeout(timeout).json(body);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify_reqwest("POST", url, &e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest("POST", url, &e))?;

        tracing::debug!("POST {} -> {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse { status, body })
    }
}
