//! Multi-account orchestrator.
//!
//! Runs one pipeline per account, sequentially by default or with bounded
//! fan-out. Each pipeline is isolated: errors and panics become a FAILURE for
//! that account only. Results go through a single appender keyed by the
//! account's position, so the summary is always in configuration order.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::{FutureExt, StreamExt};
use signbot_core::config::{JitterMode, RunConfig};
use signbot_core::error::Result;
use signbot_core::types::{Account, ClassificationResult, RunSummary};

use crate::delay;

/// Display message for accounts cut off by the run deadline.
pub const TIMED_OUT: &str = "timed out";

/// Drives per-account pipelines and collects a [`RunSummary`].
#[derive(Debug, Clone)]
pub struct Orchestrator {
    concurrency: usize,
    jitter: JitterMode,
    max_delay_secs: u64,
    timeout: Option<Duration>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            concurrency: 1,
            jitter: JitterMode::Off,
            max_delay_secs: 0,
            timeout: None,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            jitter: config.jitter,
            max_delay_secs: config.max_delay_secs,
            timeout: config.timeout(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_jitter(mut self, jitter: JitterMode, max_delay_secs: u64) -> Self {
        self.jitter = jitter;
        self.max_delay_secs = max_delay_secs;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run `per_account` for every account and summarize.
    ///
    /// The run-level jitter (if any) happens before the deadline starts.
    /// Accounts still pending when the deadline hits are reported as
    /// FAILURE with [`TIMED_OUT`].
    pub async fn run<F, Fut>(&self, accounts: Vec<Account>, per_account: F) -> RunSummary
    where
        F: Fn(Account) -> Fut,
        Fut: Future<Output = Result<ClassificationResult>>,
    {
        let total = accounts.len();
        if total == 0 {
            tracing::info!("No accounts configured, nothing to do");
            return RunSummary::new();
        }

        if self.jitter == JitterMode::PerRun {
            delay::jitter(self.max_delay_secs).await;
        }

        tracing::info!(
            "🚀 Checking in {} account(s) (concurrency {})",
            total,
            self.concurrency
        );

        let per_account = &per_account;
        let account_jitter = match self.jitter {
            JitterMode::PerAccount => self.max_delay_secs,
            _ => 0,
        };
        // A deadline past the clock's range is no deadline
        let deadline = self
            .timeout
            .and_then(|t| tokio::time::Instant::now().checked_add(t));

        let mut slots: Vec<Option<ClassificationResult>> = vec![None; total];
        let mut done = 0usize;
        {
            let stream = futures::stream::iter(accounts.iter().cloned().enumerate())
                .map(move |(idx, account)| async move {
                    delay::jitter(account_jitter).await;
                    let name = account.name.clone();
                    let result = AssertUnwindSafe(async move { per_account(account).await })
                        .catch_unwind()
                        .await;
                    let result = match result {
                        Ok(Ok(result)) => result,
                        Ok(Err(e)) => {
                            tracing::warn!("⚠️ Account '{name}' pipeline error: {e}");
                            ClassificationResult::failure(e.to_string())
                        }
                        Err(panic) => {
                            let reason = panic_message(panic.as_ref());
                            tracing::error!("💥 Account '{name}' pipeline panicked: {reason}");
                            ClassificationResult::failure(format!("internal error: {reason}"))
                        }
                    };
                    (idx, result)
                })
                .buffer_unordered(self.concurrency);
            let mut stream = std::pin::pin!(stream);

            loop {
                let next = match deadline {
                    Some(deadline) => {
                        match tokio::time::timeout_at(deadline, stream.next()).await {
                            Ok(next) => next,
                            Err(_) => {
                                tracing::warn!(
                                    "⏰ Run deadline reached with {}/{} account(s) finished",
                                    done,
                                    total
                                );
                                break;
                            }
                        }
                    }
                    None => stream.next().await,
                };
                let Some((idx, result)) = next else { break };

                done += 1;
                tracing::info!(
                    "[{}/{}] {} {}: {}",
                    done,
                    total,
                    result.category.emoji(),
                    accounts[idx].name,
                    result.display_message
                );
                slots[idx] = Some(result);
            }
        }

        let mut summary = RunSummary::new();
        for (account, slot) in accounts.into_iter().zip(slots) {
            let result = slot.unwrap_or_else(|| ClassificationResult::failure(TIMED_OUT));
            summary.push(account, result);
        }

        let counts = summary.counts();
        tracing::info!(
            success = counts.success,
            already_done = counts.already_done,
            failure = counts.failure,
            "🏁 Check-in run finished"
        );
        summary
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
