//! # Signbot: multi-account check-in runner
//!
//! Usage:
//!   signbot                              # Use ~/.signbot/config.toml + env
//!   signbot --config ./forum.toml        # Explicit config file
//!   signbot --accounts 'a@cookie1&b@cookie2' --no-delay
//!   signbot --dry-run                    # Render an empty report, no network

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use signbot_core::config::{JitterMode, SignbotConfig};
use signbot_core::types::RunSummary;
use signbot_http::ReqwestTransport;
use signbot_notify::{DeliveryStatus, LocalSink, Notification, Notifier};
use signbot_pipeline::{CheckinJob, Orchestrator};

#[derive(Parser)]
#[command(
    name = "signbot",
    version,
    about = "📋 Signbot: check in every account, then report"
)]
struct Cli {
    /// Config file (default: ~/.signbot/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Account list, overrides config and SIGNBOT_ACCOUNTS
    #[arg(long)]
    accounts: Option<String>,

    /// Use the alternate endpoint/body
    #[arg(long)]
    variant: bool,

    /// Skip the startup jitter
    #[arg(long)]
    no_delay: bool,

    /// Accounts processed at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Render the notification for an empty run and exit
    #[arg(long)]
    dry_run: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> Result<SignbotConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = shellexpand::tilde(path).to_string();
            SignbotConfig::load_from(std::path::Path::new(&path))?
        }
        None => SignbotConfig::load()?,
    };
    config.apply_env()?;

    if let Some(accounts) = &cli.accounts {
        config.run.accounts = accounts.clone();
    }
    if cli.variant {
        config.site.use_variant = true;
    }
    if cli.no_delay {
        config.run.jitter = JitterMode::Off;
    }
    if let Some(n) = cli.concurrency {
        config.run.concurrency = n;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "signbot=debug" } else { "signbot=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = load_config(&cli).context("Failed to load configuration")?;

    if cli.dry_run {
        let notification =
            Notification::from_summary(&config.notify.title, &config.site.name, &RunSummary::new());
        println!("{}", LocalSink::render(&notification));
        println!("\n{}", notification.markdown_body);
        return Ok(());
    }

    config.validate()?;
    let accounts = config.accounts()?;
    if accounts.is_empty() {
        tracing::warn!("⚠️ No accounts configured, nothing to check in");
    }

    let transport = Arc::new(ReqwestTransport::new()?);
    let job = CheckinJob::from_config(&config, transport)?;
    let orchestrator = Orchestrator::from_config(&config.run);

    tracing::info!("🌐 Site: {} ({})", job.site_name(), config.site.url);
    let summary = job.run_all(&orchestrator, accounts).await;

    let report = Notifier::from_config(&config.notify)
        .notify_summary(&config.notify.title, job.site_name(), &summary)
        .await;
    for sink in &report.reports {
        match &sink.status {
            DeliveryStatus::Delivered => tracing::debug!("📨 {}: delivered", sink.sink),
            DeliveryStatus::Skipped(reason) => tracing::debug!("📨 {}: skipped ({reason})", sink.sink),
            DeliveryStatus::Failed(e) => tracing::warn!("📨 {}: failed ({e})", sink.sink),
        }
    }

    let counts = summary.counts();
    tracing::info!(
        "🏁 Done: {} succeeded, {} already done, {} failed",
        counts.success,
        counts.already_done,
        counts.failure
    );
    Ok(())
}
