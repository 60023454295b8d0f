//! Notification sink seam and the local console sink.

use async_trait::async_trait;
use signbot_core::error::Result;

use crate::notification::Notification;

/// A destination for a rendered notification.
#[async_trait]
pub trait NotifySink: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Prints the short form to stdout.
pub struct LocalSink;

impl LocalSink {
    pub fn new() -> Self {
        Self
    }

    pub fn render(notification: &Notification) -> String {
        format!("📋 {}\n{}", notification.title, notification.short_body)
    }
}

impl Default for LocalSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotifySink for LocalSink {
    fn name(&self) -> &str {
        "local"
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        println!("{}", Self::render(notification));
        Ok(())
    }
}
