//! E-mail delivery seam and alert message composition

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::MailerConfig;
use crate::io::HttpClient;
use crate::outcome::{AlertKind, CheckOutcome};
use crate::target::{Target, TargetKind};

const RELAY_TIMEOUT: Duration = Duration::from_secs(10);

/// A rendered e-mail ready for delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Outbound e-mail transport
#[async_trait]
pub trait Mailer: Send + Sync + fmt::Debug {
    fn type_name(&self) -> &str;

    async fn send_email(&self, email: &Email) -> crate::Result<()>;
}

/// Build the configured mailer
pub fn build_mailer(config: &MailerConfig, http: Arc<dyn HttpClient>) -> Arc<dyn Mailer> {
    match config {
        MailerConfig::Log => Arc::new(LogMailer),
        MailerConfig::HttpRelay { .. } => Arc::new(HttpRelayMailer::new(config, http)),
    }
}

/// Writes e-mails to the log instead of delivering them
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    fn type_name(&self) -> &str {
        "log"
    }

    async fn send_email(&self, email: &Email) -> crate::Result<()> {
        tracing::info!("E-mail to {}: {}", email.to, email.subject);
        tracing::debug!("{}", email.text);
        Ok(())
    }
}

/// Keeps e-mails in memory, optionally refusing them
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<Email>>,
    failing: AtomicBool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    fn type_name(&self) -> &str {
        "memory"
    }

    async fn send_email(&self, email: &Email) -> crate::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(crate::HealthdeckError::Mailer(format!(
                "delivery to {} refused",
                email.to
            )));
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(email.clone());
        Ok(())
    }
}

/// Delivers e-mails through a JSON relay endpoint
pub struct HttpRelayMailer {
    url: String,
    api_token: Option<String>,
    from: String,
    http: Arc<dyn HttpClient>,
}

impl fmt::Debug for HttpRelayMailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRelayMailer")
            .field("url", &self.url)
            .field("from", &self.from)
            .finish()
    }
}

impl HttpRelayMailer {
    pub fn new(config: &MailerConfig, http: Arc<dyn HttpClient>) -> Self {
        let (url, api_token, from) = match config {
            MailerConfig::HttpRelay {
                url,
                api_token,
                from,
            } => (url.clone(), api_token.clone(), from.clone()),
            MailerConfig::Log => (String::new(), None, String::new()),
        };

        tracing::debug!("Created HttpRelayMailer for '{}'", url);

        Self {
            url,
            api_token,
            from,
            http,
        }
    }
}

#[async_trait]
impl Mailer for HttpRelayMailer {
    fn type_name(&self) -> &str {
        "http_relay"
    }

    async fn send_email(&self, email: &Email) -> crate::Result<()> {
        let mut headers = Vec::new();
        if let Some(token) = &self.api_token {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }
        let body = serde_json::json!({
            "from": self.from,
            "to": email.to,
            "subject": email.subject,
            "text": email.text,
            "html": email.html,
        });

        tracing::debug!("Relaying e-mail to {}: '{}'", email.to, email.subject);

        let response = self
            .http
            .post_json(&self.url, &headers, &body, RELAY_TIMEOUT)
            .await
            .map_err(|e| crate::HealthdeckError::Mailer(e.to_string()))?;

        if !(200..300).contains(&response.status) {
            return Err(crate::HealthdeckError::Mailer(format!(
                "relay returned status {}: {}",
                response.status, response.body
            )));
        }

        Ok(())
    }
}

/// Render the alert e-mail for a transition
pub fn compose_alert(
    to: &str,
    target: &Target,
    alert: AlertKind,
    outcome: &CheckOutcome,
    previous_value: Option<f64>,
) -> Email {
    let subject = match alert {
        AlertKind::Down => format!("[DOWN] {} is not responding", target.name),
        AlertKind::Recovery => format!("[UP] {} has recovered", target.name),
        AlertKind::Fail => format!("[FAIL] Data check {} failed", target.name),
        AlertKind::PassRecovery => format!("[PASS] Data check {} recovered", target.name),
    };

    let mut lines = vec![
        format!("Target: {}", target.name),
        format!("Alert: {}", alert),
        format!("Checked at: {}", outcome.checked_at.to_rfc3339()),
    ];
    match &target.kind {
        TargetKind::Http { url, .. } => {
            lines.push(format!("URL: {}", url));
            if let Some(code) = outcome.status_code {
                lines.push(format!("Status code: {}", code));
            }
            lines.push(format!("Response time: {} ms", outcome.latency_ms));
        }
        TargetKind::DataCheck { code, check, .. } => {
            lines.push(format!("Check: {}", code));
            lines.push(format!("Value: {}", describe_value(outcome.value)));
            lines.push(format!("Previous value: {}", describe_value(previous_value)));
            lines.push(format!("Expected: {}", check.expectation()));
        }
    }
    if let Some(error) = &outcome.error {
        lines.push(format!("Error: {}", error));
    }

    let text = lines.join("\n");
    let html = format!(
        "<h2>{}</h2><ul>{}</ul>",
        escape_html(&subject),
        lines
            .iter()
            .map(|line| format!("<li>{}</li>", escape_html(line)))
            .collect::<String>()
    );

    Email {
        to: to.to_string(),
        subject,
        text,
        html,
    }
}

pub(crate) fn describe_value(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
