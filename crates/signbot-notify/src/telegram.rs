//! Telegram Bot API sink: `sendMessage` with Markdown.

use async_trait::async_trait;
use serde::Deserialize;
use signbot_core::config::TelegramConfig;
use signbot_core::error::{Result, SignbotError};
use std::time::Duration;

use crate::notification::Notification;
use crate::sink::NotifySink;

/// Telegram rejects messages above 4096 characters.
const MAX_MESSAGE_CHARS: usize = 4000;

#[derive(Debug, Deserialize)]
struct TelegramApiResponse {
    ok: bool,
    description: Option<String>,
}

/// Sends the Markdown rendering to one chat.
pub struct TelegramSink {
    bot_token: String,
    chat_id: String,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramSink {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        if !config.is_configured() {
            return Err(SignbotError::Config(
                "Telegram needs both bot_token and chat_id".into(),
            ));
        }
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(10));
        if let Some(url) = config.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            let proxy = reqwest::Proxy::all(url)
                .map_err(|e| SignbotError::Config(format!("Invalid Telegram proxy {url}: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| SignbotError::Notify(format!("Client error: {e}")))?;
        Ok(Self {
            bot_token: config.bot_token.trim().to_string(),
            chat_id: config.chat_id.trim().to_string(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn api_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }

    /// JSON body for `sendMessage`.
    pub fn payload(&self, notification: &Notification) -> serde_json::Value {
        serde_json::json!({
            "chat_id": self.chat_id,
            "text": truncate_lines(&notification.markdown_body, MAX_MESSAGE_CHARS),
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        })
    }
}

#[async_trait]
impl NotifySink for TelegramSink {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        let response = self
            .client
            .post(self.api_url())
            .json(&self.payload(notification))
            .send()
            .await
            // reqwest errors echo the URL, which contains the bot token
            .map_err(|e| SignbotError::sink("telegram", format!("sendMessage failed: {}", e.without_url())))?;

        let status = response.status();
        let body: TelegramApiResponse = response.json().await.map_err(|e| {
            SignbotError::sink("telegram", format!("Invalid response (HTTP {status}): {}", e.without_url()))
        })?;

        if !body.ok {
            return Err(SignbotError::sink(
                "telegram",
                format!(
                    "Telegram API error {status}: {}",
                    body.description.unwrap_or_default()
                ),
            ));
        }
        tracing::info!("✅ Telegram notification sent: {}", notification.title);
        Ok(())
    }
}

/// Longest single line kept; longer ones are clipped so later accounts still fit.
const MAX_LINE_CHARS: usize = 512;

/// Fit `text` into `max_chars`, dropping whole lines from the end.
fn truncate_lines(text: &str, max_chars: usize) -> String {
    let budget = max_chars.saturating_sub(2);
    let lines: Vec<String> = text
        .lines()
        .map(|line| clip_line(line, MAX_LINE_CHARS.min(budget)))
        .collect();
    let joined = lines.join("\n");
    if joined.chars().count() <= max_chars {
        return joined;
    }

    let mut out = String::new();
    let mut used = 0;
    for line in &lines {
        let len = line.chars().count() + 1;
        if used + len > budget {
            break;
        }
        out.push_str(line);
        out.push('\n');
        used += len;
    }
    out.push('…');
    out
}

fn clip_line(line: &str, max_chars: usize) -> String {
    if line.chars().count() <= max_chars {
        return line.to_string();
    }
    let mut cut: String = line.chars().take(max_chars.saturating_sub(1)).collect();
    // Drop a dangling escape
    if cut.ends_with('\\') {
        cut.pop();
    }
    cut.push('…');
    cut
}
