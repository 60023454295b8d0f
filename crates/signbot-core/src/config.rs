//! Signbot configuration system.
//!
//! Loaded once at startup from `~/.signbot/config.toml` (or an explicit path),
//! then patched from environment variables. Nothing downstream reads the
//! environment again; the finished struct is handed to each component.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::account::{DEFAULT_SEPARATOR, parse_accounts};
use crate::error::{Result, SignbotError};
use crate::types::{Account, HttpMethod, RequestSpec};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignbotConfig {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl SignbotConfig {
    /// Load config from the default path, falling back to defaults if absent.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load config from a specific path. A missing file is an error here.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SignbotError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| SignbotError::Config(format!("Failed to parse config: {e}")))
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the signbot home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".signbot")
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup. Empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("SIGNBOT_ACCOUNTS") {
            self.run.accounts = v;
        }
        if let Some(v) = get("SIGNBOT_ACCOUNT_SEPARATOR") {
            self.run.separator = v;
        }
        if let Some(v) = get("SIGNBOT_VARIANT") {
            self.site.use_variant = is_truthy(&v);
        }
        if let Some(v) = get("SIGNBOT_MAX_DELAY_SECS") {
            self.run.max_delay_secs = v.trim().parse().map_err(|_| {
                SignbotError::Config(format!("SIGNBOT_MAX_DELAY_SECS is not a number: {v}"))
            })?;
        }
        if let Some(v) = get("TG_BOT_TOKEN") {
            self.notify.telegram.bot_token = v;
        }
        if let Some(v) = get("TG_CHAT_ID") {
            self.notify.telegram.chat_id = v;
        }
        if let Some(v) = get("TG_API_BASE") {
            self.notify.telegram.api_base = v;
        }
        if let Some(v) = get("TG_PROXY") {
            self.notify.telegram.proxy = Some(v);
        }
        if let Some(v) = get("SIGNBOT_WEBHOOK_URL") {
            self.notify.webhook.url = v;
        }
        Ok(())
    }

    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.site.url.trim().is_empty() {
            return Err(SignbotError::Config("[site] url is required".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(SignbotError::Config(
                "[retry] max_attempts must be at least 1".into(),
            ));
        }
        if self.run.concurrency == 0 {
            return Err(SignbotError::Config(
                "[run] concurrency must be at least 1".into(),
            ));
        }
        if let BackoffPolicy::Fixed { min_ms, max_ms } = self.retry.backoff
            && min_ms > max_ms
        {
            return Err(SignbotError::Config(format!(
                "[retry.backoff] min_ms ({min_ms}) exceeds max_ms ({max_ms})"
            )));
        }
        Ok(())
    }

    /// Parse the configured account list.
    pub fn accounts(&self) -> Result<Vec<Account>> {
        parse_accounts(&self.run.accounts, &self.run.separator)
    }
}

fn is_truthy(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// When the startup jitter is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JitterMode {
    /// Once before any account starts.
    #[default]
    PerRun,
    /// Before each account.
    PerAccount,
    Off,
}

/// Run-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub accounts: String,
    #[serde(default = "default_separator")]
    pub separator: String,
    /// Upper bound of the random startup delay, in seconds. 0 disables it.
    #[serde(default)]
    pub max_delay_secs: u64,
    #[serde(default)]
    pub jitter: JitterMode,
    /// Accounts processed at once. 1 is strictly sequential.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Wall-clock cap for all accounts together. 0 disables it.
    #[serde(default = "default_run_timeout")]
    pub timeout_secs: u64,
}

fn default_separator() -> String { DEFAULT_SEPARATOR.into() }
fn default_concurrency() -> usize { 1 }
fn default_run_timeout() -> u64 { 600 }

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            accounts: String::new(),
            separator: default_separator(),
            max_delay_secs: 0,
            jitter: JitterMode::default(),
            concurrency: default_concurrency(),
            timeout_secs: default_run_timeout(),
        }
    }
}

impl RunConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Upstream check-in endpoint description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_name")]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    /// Ordered `[name, value]` pairs. Values may use `{secret}` and `{name}`.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub variant_url: Option<String>,
    #[serde(default)]
    pub variant_body: Option<String>,
    /// Mode flag selecting the variant request.
    #[serde(default)]
    pub use_variant: bool,
    /// Header carrying the secret when no placeholder references it.
    #[serde(default = "default_credential_header")]
    pub credential_header: String,
    #[serde(default = "bool_true")]
    pub require_body: bool,
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn bool_true() -> bool { true }
fn default_site_name() -> String { "site".into() }
fn default_credential_header() -> String { "Cookie".into() }
fn default_request_timeout() -> u64 { 15 }

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            url: String::new(),
            method: HttpMethod::default(),
            headers: Vec::new(),
            body: None,
            variant_url: None,
            variant_body: None,
            use_variant: false,
            credential_header: default_credential_header(),
            require_body: true,
            timeout_secs: default_request_timeout(),
        }
    }
}

impl SiteConfig {
    /// Build the request descriptor for one account.
    pub fn request_for(&self, account: &Account) -> RequestSpec {
        let fill = |s: &str| fill_placeholders(s, account);

        let url = match (&self.variant_url, self.use_variant) {
            (Some(v), true) => v.as_str(),
            _ => self.url.as_str(),
        };
        let body = match (&self.variant_body, self.use_variant) {
            (Some(v), true) => Some(v.as_str()),
            _ => self.body.as_deref(),
        };

        let mentions_secret = url.contains("{secret}")
            || body.is_some_and(|b| b.contains("{secret}"))
            || self.headers.iter().any(|(_, v)| v.contains("{secret}"));

        let mut spec = RequestSpec::new(self.method, fill(url));
        for (name, value) in &self.headers {
            spec.headers.push((name.clone(), fill(value)));
        }
        if !mentions_secret {
            spec.headers
                .push((self.credential_header.clone(), account.secret.clone()));
        }
        spec.body = body.map(fill);
        spec.require_body = self.require_body;
        spec.timeout = Duration::from_secs(self.timeout_secs.max(1));
        spec.sensitive = vec![account.secret.clone()];
        spec
    }
}

/// Substitute `{secret}` and `{name}` in one pass. Substituted text is never rescanned.
fn fill_placeholders(template: &str, account: &Account) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix("{secret}") {
            out.push_str(&account.secret);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{name}") {
            out.push_str(&account.name);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

/// Delay between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffPolicy {
    /// Uniformly random in `[min_ms, max_ms]` before every retry.
    Fixed { min_ms: u64, max_ms: u64 },
    /// `base_ms + step_ms * (attempt - 1)`.
    Incremental { base_ms: u64, step_ms: u64 },
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Fixed {
            min_ms: 3000,
            max_ms: 5000,
        }
    }
}

impl BackoffPolicy {
    /// No waiting at all.
    pub fn none() -> Self {
        BackoffPolicy::Fixed { min_ms: 0, max_ms: 0 }
    }
}

/// Retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub backoff: BackoffPolicy,
}

fn default_max_attempts() -> u32 { 3 }

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Response classification rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Boolean field flagging success in the JSON envelope.
    #[serde(default = "default_success_field")]
    pub success_field: String,
    /// Candidate message fields, first non-empty wins.
    #[serde(default = "default_message_fields")]
    pub message_fields: Vec<String>,
    /// Regexes marking a granted reward. Checked before `already_done_patterns`.
    #[serde(default = "default_success_patterns")]
    pub success_patterns: Vec<String>,
    #[serde(default = "default_already_done_patterns")]
    pub already_done_patterns: Vec<String>,
    /// Regex pulling the reward out of a success message. Group 1 if present.
    #[serde(default = "default_reward_pattern")]
    pub reward_pattern: String,
    /// Report HTTP 403 as a distinct "blocked" failure.
    #[serde(default = "bool_true")]
    pub distinguish_forbidden: bool,
}

fn default_success_field() -> String { "success".into() }
fn default_message_fields() -> Vec<String> {
    vec!["message", "msg"].into_iter().map(String::from).collect()
}
fn default_success_patterns() -> Vec<String> {
    vec!["签到成功", "获得了", "(?i)checkin! got", "(?i)you got"]
        .into_iter().map(String::from).collect()
}
fn default_already_done_patterns() -> Vec<String> {
    vec!["已经签到", "签到过", "今日已签", "(?i)already", "(?i)try tomorrow"]
        .into_iter().map(String::from).collect()
}
fn default_reward_pattern() -> String { r"(\d+)".into() }

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            success_field: default_success_field(),
            message_fields: default_message_fields(),
            success_patterns: default_success_patterns(),
            already_done_patterns: default_already_done_patterns(),
            reward_pattern: default_reward_pattern(),
            distinguish_forbidden: true,
        }
    }
}

/// Notification sinks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_notify_title")]
    pub title: String,
    #[serde(default)]
    pub local: LocalSinkConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

fn default_notify_title() -> String { "Signbot check-in".into() }

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            title: default_notify_title(),
            local: LocalSinkConfig::default(),
            telegram: TelegramConfig::default(),
            webhook: WebhookConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalSinkConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
}

impl Default for LocalSinkConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Telegram bot delivery. Both token and chat id are needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
    /// Bot API host; point it at a relay when api.telegram.org is unreachable.
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
    /// Outbound proxy URL (http, https or socks5).
    #[serde(default)]
    pub proxy: Option<String>,
}

fn default_telegram_api_base() -> String { "https://api.telegram.org".into() }

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: default_telegram_api_base(),
            proxy: None,
        }
    }
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        !self.bot_token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

impl WebhookConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = SignbotConfig::default();
        assert_eq!(config.run.separator, "&");
        assert_eq!(config.run.concurrency, 1);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(
            config.retry.backoff,
            BackoffPolicy::Fixed { min_ms: 3000, max_ms: 5000 }
        );
        assert!(config.notify.local.enabled);
        assert!(!config.notify.telegram.is_configured());
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config = SignbotConfig::from_toml("").unwrap();
        assert_eq!(config.site.credential_header, "Cookie");
        assert_eq!(config.classifier.message_fields, vec!["message", "msg"]);
        assert_eq!(config.run.timeout_secs, 600);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [run]
            accounts = "a@1|b@2"
            separator = "|"
            concurrency = 2
            jitter = "per_account"

            [site]
            name = "forum"
            url = "https://forum.example/api/checkin"
            method = "POST"
            headers = [["Authorization", "Bearer {secret}"]]
            body = '{"token":"glados.one"}'

            [retry]
            max_attempts = 5
            [retry.backoff]
            kind = "incremental"
            base_ms = 100
            step_ms = 50
        "#;
        let config = SignbotConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.run.jitter, JitterMode::PerAccount);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(
            config.retry.backoff,
            BackoffPolicy::Incremental { base_ms: 100, step_ms: 50 }
        );
        let accounts = config.accounts().unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[1].name, "b");
        config.validate().unwrap();
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SIGNBOT_ACCOUNTS", "x@1&y@2"),
            ("SIGNBOT_VARIANT", "true"),
            ("TG_BOT_TOKEN", "123:abc"),
            ("TG_CHAT_ID", "42"),
            ("TG_API_BASE", ""),
        ]
        .into_iter()
        .collect();

        let mut config = SignbotConfig::default();
        config
            .apply_env_with(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.run.accounts, "x@1&y@2");
        assert!(config.site.use_variant);
        assert!(config.notify.telegram.is_configured());
        // Empty values do not clobber defaults
        assert_eq!(config.notify.telegram.api_base, "https://api.telegram.org");
    }

    #[test]
    fn test_env_bad_number() {
        let mut config = SignbotConfig::default();
        let res = config.apply_env_with(|k| {
            (k == "SIGNBOT_MAX_DELAY_SECS").then(|| "soon".to_string())
        });
        assert!(res.is_err());
    }

    #[test]
    fn test_validate_requires_url() {
        let config = SignbotConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_request_for_credential_header() {
        let site = SiteConfig {
            url: "https://example.com/checkin".into(),
            body: Some(r#"{"user":"{name}"}"#.into()),
            ..SiteConfig::default()
        };
        let spec = site.request_for(&Account::new("alice", "sid=1"));
        assert_eq!(spec.body.as_deref(), Some(r#"{"user":"alice"}"#));
        assert_eq!(
            spec.headers.last(),
            Some(&("Cookie".to_string(), "sid=1".to_string()))
        );
    }

    #[test]
    fn test_request_for_placeholder_and_variant() {
        let site = SiteConfig {
            url: "https://example.com/a".into(),
            variant_url: Some("https://example.com/b".into()),
            headers: vec![("Authorization".into(), "Bearer {secret}".into())],
            use_variant: true,
            ..SiteConfig::default()
        };
        let spec = site.request_for(&Account::new("bob", "tok"));
        assert_eq!(spec.url, "https://example.com/b");
        assert_eq!(spec.headers.len(), 1);
        assert_eq!(spec.headers[0].1, "Bearer tok");
    }

    #[test]
    fn test_placeholders_filled_in_one_pass() {
        let site = SiteConfig {
            url: "https://example.com/u/{name}".into(),
            body: Some(r#"{"token":"{secret}","user":"{name}"}"#.into()),
            ..SiteConfig::default()
        };
        let spec = site.request_for(&Account::new("alice", "abc{name}xyz"));
        assert_eq!(spec.url, "https://example.com/u/alice");
        assert_eq!(
            spec.body.as_deref(),
            Some(r#"{"token":"abc{name}xyz","user":"alice"}"#)
        );
        // Secret is in the body, so no credential header
        assert!(spec.headers.is_empty());
    }
}
