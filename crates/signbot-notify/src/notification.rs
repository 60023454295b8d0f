//! Rendering a run summary into notification text.

use chrono::{DateTime, Utc};
use serde::Serialize;
use signbot_core::types::{Category, ClassificationResult, Counts, RunSummary};

/// A rendered notification, ready for any sink.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    /// Title/summary.
    pub title: String,
    /// Plain text for local display: counts line + one line per account.
    pub short_body: String,
    /// Telegram Markdown text, reserved characters escaped.
    pub markdown_body: String,
    pub counts: Counts,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    /// Render `summary`. Every account gets exactly one line in both bodies.
    pub fn from_summary(title: &str, site: &str, summary: &RunSummary) -> Self {
        Self::render_at(title, site, summary, Utc::now())
    }

    pub fn render_at(title: &str, site: &str, summary: &RunSummary, timestamp: DateTime<Utc>) -> Self {
        let counts = summary.counts();
        Self {
            title: title.to_string(),
            short_body: render_short(summary),
            markdown_body: render_markdown(title, site, summary, timestamp),
            counts,
            timestamp,
        }
    }
}

fn counts_line(counts: &Counts) -> String {
    format!(
        "✅ {} · 🔁 {} · ❌ {}",
        counts.success, counts.already_done, counts.failure
    )
}

/// First line of a possibly multi-line message.
fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or_default().trim()
}

fn detail(result: &ClassificationResult) -> String {
    let message = first_line(&result.display_message);
    match result.category {
        Category::Success => format!("{message} (reward: {})", result.value_or_unknown()),
        _ => message.to_string(),
    }
}

fn render_short(summary: &RunSummary) -> String {
    let mut lines = vec![counts_line(&summary.counts())];
    for (account, result) in summary.results() {
        lines.push(format!("{}: {}", account.name, detail(result)));
    }
    lines.join("\n")
}

fn render_markdown(title: &str, site: &str, summary: &RunSummary, timestamp: DateTime<Utc>) -> String {
    let counts = summary.counts();
    let mut text = format!(
        "*{}*\n{}\n{}\n",
        escape_markdown(title),
        escape_markdown(site),
        counts_line(&counts)
    );
    if !summary.is_empty() {
        text.push('\n');
    }
    for (account, result) in summary.results() {
        text.push_str(&format!(
            "{} *{}*: {}\n",
            result.category.emoji(),
            escape_markdown(&account.name),
            escape_markdown(&detail(result))
        ));
    }
    text.push_str(&format!("\n_{}_", timestamp.format("%Y-%m-%d %H:%M:%S UTC")));
    text
}

/// Escape Telegram MarkdownV1 special characters.
pub fn escape_markdown(s: &str) -> String {
    s.replace('_', "\\_")
        .replace('*', "\\*")
        .replace('[', "\\[")
        .replace('`', "\\`")
}
