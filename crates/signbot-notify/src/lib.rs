//! # Signbot Notify
//!
//! Renders a run summary and fans it out to every configured sink.
//! Fire-and-report: each sink is tried on its own, a failing sink is logged
//! and reported but never stops the others or fails the run.

pub mod notification;
pub mod sink;
pub mod telegram;
pub mod webhook;

pub use notification::{Notification, escape_markdown};
pub use sink::{LocalSink, NotifySink};
pub use telegram::TelegramSink;
pub use webhook::WebhookSink;

use signbot_core::config::NotifyConfig;
use signbot_core::types::RunSummary;

/// What happened to one sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered,
    /// Not configured; not an error.
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReport {
    pub sink: String,
    pub status: DeliveryStatus,
}

/// Per-sink results of one fan-out.
#[derive(Debug, Clone, Default)]
pub struct NotifyReport {
    pub reports: Vec<SinkReport>,
}

impl NotifyReport {
    pub fn status_of(&self, sink: &str) -> Option<&DeliveryStatus> {
        self.reports.iter().find(|r| r.sink == sink).map(|r| &r.status)
    }

    pub fn delivered(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.status == DeliveryStatus::Delivered)
            .count()
    }

    /// No sink failed. Skipped sinks don't count against this.
    pub fn all_delivered(&self) -> bool {
        !self
            .reports
            .iter()
            .any(|r| matches!(r.status, DeliveryStatus::Failed(_)))
    }
}

enum SinkSlot {
    Ready(Box<dyn NotifySink>),
    Skipped { name: String, reason: String },
    Broken { name: String, error: String },
}

/// Holds the sinks of a run and dispatches to all of them.
#[derive(Default)]
pub struct Notifier {
    slots: Vec<SinkSlot>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build sinks from config. Absent credentials skip a sink; a sink that
    /// cannot be built (bad proxy URL, ...) is reported as failed at send time.
    pub fn from_config(config: &NotifyConfig) -> Self {
        let mut notifier = Self::new();

        if config.local.enabled {
            notifier.add_sink(Box::new(LocalSink::new()));
        } else {
            notifier.add_skipped("local", "disabled in config");
        }

        if config.telegram.is_configured() {
            match TelegramSink::new(&config.telegram) {
                Ok(sink) => notifier.add_sink(Box::new(sink)),
                Err(e) => notifier.add_broken("telegram", e.to_string()),
            }
        } else {
            notifier.add_skipped("telegram", "bot token or chat id not configured");
        }

        if config.webhook.is_configured() {
            match WebhookSink::new(&config.webhook) {
                Ok(sink) => notifier.add_sink(Box::new(sink)),
                Err(e) => notifier.add_broken("webhook", e.to_string()),
            }
        }

        notifier
    }

    pub fn add_sink(&mut self, sink: Box<dyn NotifySink>) {
        self.slots.push(SinkSlot::Ready(sink));
    }

    pub fn add_skipped(&mut self, name: &str, reason: &str) {
        self.slots.push(SinkSlot::Skipped {
            name: name.to_string(),
            reason: reason.to_string(),
        });
    }

    pub fn add_broken(&mut self, name: &str, error: String) {
        self.slots.push(SinkSlot::Broken {
            name: name.to_string(),
            error,
        });
    }

    pub fn sink_count(&self) -> usize {
        self.slots.len()
    }

    /// Render `summary` and deliver it everywhere.
    pub async fn notify_summary(&self, title: &str, site: &str, summary: &RunSummary) -> NotifyReport {
        let notification = Notification::from_summary(title, site, summary);
        self.notify(&notification).await
    }

    /// Deliver to every sink in registration order, one report per sink.
    pub async fn notify(&self, notification: &Notification) -> NotifyReport {
        let mut report = NotifyReport::default();
        for slot in &self.slots {
            let (sink, status) = match slot {
                SinkSlot::Ready(sink) => {
                    let status = match sink.deliver(notification).await {
                        Ok(()) => DeliveryStatus::Delivered,
                        Err(e) => {
                            tracing::warn!("⚠️ Notification via {} failed: {e}", sink.name());
                            DeliveryStatus::Failed(e.to_string())
                        }
                    };
                    (sink.name().to_string(), status)
                }
                SinkSlot::Skipped { name, reason } => {
                    tracing::info!("⏭️ Skipping {name} notification: {reason}");
                    (name.clone(), DeliveryStatus::Skipped(reason.clone()))
                }
                SinkSlot::Broken { name, error } => {
                    tracing::warn!("⚠️ Notification via {name} unavailable: {error}");
                    (name.clone(), DeliveryStatus::Failed(error.clone()))
                }
            };
            report.reports.push(SinkReport { sink, status });
        }
        report
    }
}
