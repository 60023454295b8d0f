//! Per-account check-in job: build request → retrying request → classify.

use std::sync::Arc;

use signbot_core::config::{SignbotConfig, SiteConfig};
use signbot_core::error::Result;
use signbot_core::traits::Transport;
use signbot_core::types::{Account, ClassificationResult, RunSummary};
use signbot_http::Requester;

use crate::classifier::Classifier;
use crate::orchestrator::Orchestrator;

/// Everything one account's pipeline needs. Shared read-only across accounts.
#[derive(Clone)]
pub struct CheckinJob {
    site: SiteConfig,
    requester: Requester,
    classifier: Arc<Classifier>,
}

impl CheckinJob {
    pub fn new(site: SiteConfig, requester: Requester, classifier: Classifier) -> Self {
        Self {
            site,
            requester,
            classifier: Arc::new(classifier),
        }
    }

    /// Wire up requester and classifier from config.
    pub fn from_config(config: &SignbotConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let classifier = Classifier::from_config(&config.classifier)?;
        let requester = Requester::from_config(transport, &config.retry);
        Ok(Self::new(config.site.clone(), requester, classifier))
    }

    pub fn site_name(&self) -> &str {
        &self.site.name
    }

    /// Check in a single account.
    pub async fn run(&self, account: &Account) -> ClassificationResult {
        let spec = self.site.request_for(account);
        tracing::debug!("🔑 Checking in '{}' at {}", account.name, self.site.name);
        let outcome = self.requester.request(&spec).await;
        self.classifier.classify(&outcome)
    }

    /// Check in every account through `orchestrator`.
    pub async fn run_all(&self, orchestrator: &Orchestrator, accounts: Vec<Account>) -> RunSummary {
        orchestrator
            .run(accounts, move |account| async move { Ok(self.run(&account).await) })
            .await
    }
}
