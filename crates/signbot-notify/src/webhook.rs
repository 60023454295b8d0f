//! Generic HTTP webhook sink: POST with JSON body.

use async_trait::async_trait;
use signbot_core::config::WebhookConfig;
use signbot_core::error::{Result, SignbotError};
use std::time::Duration;

use crate::notification::Notification;
use crate::sink::NotifySink;

pub struct WebhookSink {
    url: String,
    headers: Vec<(String, String)>,
    client: reqwest::Client,
}

impl WebhookSink {
    pub fn new(config: &WebhookConfig) -> Result<Self> {
        if !config.is_configured() {
            return Err(SignbotError::Config("Webhook url is empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SignbotError::Notify(format!("Client error: {e}")))?;
        Ok(Self {
            url: config.url.trim().to_string(),
            headers: config.headers.clone(),
            client,
        })
    }

    pub fn payload(notification: &Notification) -> serde_json::Value {
        serde_json::json!({
            "title": notification.title,
            "body": notification.short_body,
            "counts": notification.counts,
            "timestamp": notification.timestamp.to_rfc3339(),
        })
    }
}

#[async_trait]
impl NotifySink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        let mut req = self.client.post(&self.url).json(&Self::payload(notification));
        for (key, value) in &self.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        let resp = req
            .send()
            .await
            // reqwest errors echo the URL, which may carry a token in its path
            .map_err(|e| SignbotError::sink("webhook", format!("Webhook send failed: {}", e.without_url())))?;

        if resp.status().is_success() {
            tracing::info!(
                "✅ Webhook notification sent to {}: {}",
                display_url(&self.url),
                notification.title
            );
            Ok(())
        } else {
            Err(SignbotError::sink(
                "webhook",
                format!("Webhook error {}", resp.status()),
            ))
        }
    }
}

/// Scheme and host only. Webhook paths and queries often embed the token.
fn display_url(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) => match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}://{host}:{port}/…", parsed.scheme()),
            (Some(host), None) => format!("{}://{host}/…", parsed.scheme()),
            _ => "webhook".to_string(),
        },
        Err(_) => "webhook".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signbot_core::types::{Account, Category, ClassificationResult, RunSummary};

    #[test]
    fn test_requires_url() {
        assert!(WebhookSink::new(&WebhookConfig::default()).is_err());
    }

    #[test]
    fn test_payload_carries_counts() {
        let mut s = RunSummary::new();
        s.push(Account::new("a", "1"), ClassificationResult::new(Category::AlreadyDone, "dup"));
        let n = Notification::from_summary("Check-in", "forum", &s);
        let payload = WebhookSink::payload(&n);
        assert_eq!(payload["title"], "Check-in");
        assert_eq!(payload["counts"]["already_done"], 1);
        assert!(payload["body"].as_str().unwrap().contains("a: dup"));
    }

    #[test]
    fn test_display_url_hides_path_token() {
        assert_eq!(
            display_url("https://discord.com/api/webhooks/123/SECRETTOKEN?wait=true"),
            "https://discord.com/…"
        );
        assert_eq!(display_url("http://127.0.0.1:9/hook/abc"), "http://127.0.0.1:9/…");
        assert_eq!(display_url("not a url"), "webhook");
    }

    #[tokio::test]
    async fn test_send_failure_does_not_echo_url() {
        let sink = WebhookSink::new(&WebhookConfig {
            url: "http://127.0.0.1:9/api/webhooks/123/SECRETTOKEN".into(),
            headers: Vec::new(),
        })
        .unwrap();
        let n = Notification::from_summary("Check-in", "forum", &RunSummary::new());

        let err = sink.deliver(&n).await.unwrap_err().to_string();
        assert!(err.contains("Webhook send failed"));
        assert!(!err.contains("SECRETTOKEN"));
        assert!(!err.contains("/api/webhooks"));
    }
}
