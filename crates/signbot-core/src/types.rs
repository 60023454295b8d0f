//! Core data model shared by the requester, classifier, orchestrator and notifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A configured check-in identity. The secret is an opaque credential blob
/// (cookie, token, ...) and never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub secret: String,
}

impl Account {
    pub fn new(name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("name", &self.name)
            .field("secret", &"••••")
            .finish()
    }
}

/// HTTP method of a check-in request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Put => write!(f, "PUT"),
        }
    }
}

/// A fully-formed request descriptor for one logical check-in call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// An empty response body counts as a transport failure.
    pub require_body: bool,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Values masked whenever this request is logged.
    pub sensitive: Vec<String>,
}

impl RequestSpec {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            require_body: true,
            timeout: Duration::from_secs(15),
            sensitive: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Transport-level failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Network,
    Timeout,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Network => write!(f, "network"),
            ErrorKind::Timeout => write!(f, "timeout"),
        }
    }
}

/// Normalized result of a (possibly retried) request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestOutcome {
    pub succeeded: bool,
    pub http_status: Option<u16>,
    pub raw_body: Option<String>,
    pub error_kind: Option<ErrorKind>,
    /// Text of the last transport error, if any.
    pub error_message: Option<String>,
    /// Attempts made, including the successful one.
    pub attempts: u32,
}

impl RequestOutcome {
    pub fn success(http_status: u16, raw_body: impl Into<String>, attempts: u32) -> Self {
        Self {
            succeeded: true,
            http_status: Some(http_status),
            raw_body: Some(raw_body.into()),
            error_kind: None,
            error_message: None,
            attempts,
        }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>, attempts: u32) -> Self {
        Self {
            succeeded: false,
            http_status: None,
            raw_body: None,
            error_kind: Some(kind),
            error_message: Some(message.into()),
            attempts,
        }
    }
}

/// Classification taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Success,
    AlreadyDone,
    Failure,
    ParseError,
}

impl Category {
    /// Parse errors are tallied as failures.
    pub fn counts_as_failure(&self) -> bool {
        matches!(self, Category::Failure | Category::ParseError)
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Category::Success => "✅",
            Category::AlreadyDone => "🔁",
            Category::Failure => "❌",
            Category::ParseError => "⚠️",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Success => write!(f, "success"),
            Category::AlreadyDone => write!(f, "already done"),
            Category::Failure => write!(f, "failure"),
            Category::ParseError => write!(f, "parse error"),
        }
    }
}

/// Interpretation of one account's outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: Category,
    pub display_message: String,
    /// Reward amount or similar value pulled out of the message.
    pub extracted_value: Option<String>,
    /// Set when the failure came from the transport.
    pub error_kind: Option<ErrorKind>,
    /// Upstream refused the request (HTTP 403) rather than rejecting it.
    #[serde(default)]
    pub blocked: bool,
}

impl ClassificationResult {
    pub fn new(category: Category, display_message: impl Into<String>) -> Self {
        Self {
            category,
            display_message: display_message.into(),
            extracted_value: None,
            error_kind: None,
            blocked: false,
        }
    }

    pub fn failure(display_message: impl Into<String>) -> Self {
        Self::new(Category::Failure, display_message)
    }

    pub fn with_value(mut self, value: Option<String>) -> Self {
        self.extracted_value = value;
        self
    }

    pub fn with_error_kind(mut self, kind: ErrorKind) -> Self {
        self.error_kind = Some(kind);
        self
    }

    pub fn blocked(mut self) -> Self {
        self.blocked = true;
        self
    }

    /// Extracted value for display, `unknown` when nothing was captured.
    pub fn value_or_unknown(&self) -> &str {
        self.extracted_value.as_deref().unwrap_or("unknown")
    }
}

/// Per-category tallies of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub success: usize,
    pub already_done: usize,
    pub failure: usize,
}

impl Counts {
    pub fn total(&self) -> usize {
        self.success + self.already_done + self.failure
    }
}

/// Aggregated results of one run, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    results: Vec<(Account, ClassificationResult)>,
    counts: Counts,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one account's result. Counts are updated in the same step so
    /// they always agree with the result list.
    pub fn push(&mut self, account: Account, result: ClassificationResult) {
        match result.category {
            Category::Success => self.counts.success += 1,
            Category::AlreadyDone => self.counts.already_done += 1,
            Category::Failure | Category::ParseError => self.counts.failure += 1,
        }
        self.results.push((account, result));
    }

    pub fn results(&self) -> &[(Account, ClassificationResult)] {
        &self.results
    }

    pub fn counts(&self) -> Counts {
        self.counts
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// True when every account either succeeded or had already checked in.
    pub fn all_ok(&self) -> bool {
        self.counts.failure == 0
    }
}
