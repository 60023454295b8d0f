//! Response classifier: maps a request outcome onto the check-in taxonomy.
//!
//! Rules are an ordered list evaluated top-down, first match wins. Success
//! rules come before already-done rules, so "签到成功，已经签到过了" is a
//! success. [`Classifier::push_rule`] appends, which keeps that order intact.

use regex::Regex;
use serde_json::Value;
use signbot_core::config::ClassifierConfig;
use signbot_core::error::{Result, SignbotError};
use signbot_core::types::{Category, ClassificationResult, ErrorKind, RequestOutcome};

/// Characters of an unparseable body echoed back to the user.
const SNIPPET_CHARS: usize = 60;

/// What a rule looks at.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// A boolean field of the envelope equals `true`.
    Flag(String),
    /// The envelope message matches a regex.
    Pattern(Regex),
}

/// One classification rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub category: Category,
    matcher: Matcher,
    extractor: Option<Regex>,
}

impl Rule {
    pub fn flag(field: &str, category: Category) -> Self {
        Self {
            category,
            matcher: Matcher::Flag(field.to_string()),
            extractor: None,
        }
    }

    pub fn pattern(pattern: &str, category: Category) -> Result<Self> {
        Ok(Self {
            category,
            matcher: Matcher::Pattern(compile(pattern)?),
            extractor: None,
        })
    }

    /// Pull a value out of the message when this rule matches.
    pub fn with_extractor(mut self, extractor: Regex) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    fn matches(&self, envelope: &Envelope) -> bool {
        match &self.matcher {
            Matcher::Flag(field) => envelope.flag(field),
            Matcher::Pattern(re) => re.is_match(&envelope.message),
        }
    }

    fn extract(&self, message: &str) -> Option<String> {
        let caps = self.extractor.as_ref()?.captures(message)?;
        caps.get(1)
            .or_else(|| caps.get(0))
            .map(|m| m.as_str().to_string())
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| SignbotError::Config(format!("Invalid classifier pattern '{pattern}': {e}")))
}

/// Parsed response body.
struct Envelope {
    value: Value,
    message: String,
}

impl Envelope {
    fn parse(body: &str, message_fields: &[String]) -> Option<Self> {
        let value: Value = serde_json::from_str(body.trim()).ok()?;
        let message = match &value {
            Value::String(s) => s.clone(),
            Value::Object(map) => message_fields
                .iter()
                .filter_map(|f| map.get(f))
                .find_map(|v| match v {
                    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .unwrap_or_default(),
            _ => String::new(),
        };
        Some(Self { value, message })
    }

    fn flag(&self, field: &str) -> bool {
        self.value.get(field).and_then(Value::as_bool) == Some(true)
    }
}

/// Ordered rule set plus envelope handling.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<Rule>,
    message_fields: Vec<String>,
    distinguish_forbidden: bool,
}

impl Classifier {
    /// An empty classifier: everything parseable is a failure until rules are added.
    pub fn new(message_fields: Vec<String>, distinguish_forbidden: bool) -> Self {
        Self {
            rules: Vec::new(),
            message_fields,
            distinguish_forbidden,
        }
    }

    /// Build the standard rule chain: success flag, success patterns,
    /// already-done patterns. Every success rule extracts the reward.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        let reward = compile(&config.reward_pattern)?;
        let mut classifier = Self::new(config.message_fields.clone(), config.distinguish_forbidden);

        if !config.success_field.is_empty() {
            classifier.push_rule(
                Rule::flag(&config.success_field, Category::Success).with_extractor(reward.clone()),
            );
        }
        for pattern in &config.success_patterns {
            classifier.push_rule(
                Rule::pattern(pattern, Category::Success)?.with_extractor(reward.clone()),
            );
        }
        for pattern in &config.already_done_patterns {
            classifier.push_rule(Rule::pattern(pattern, Category::AlreadyDone)?);
        }
        Ok(classifier)
    }

    /// Append a rule. It is checked after every existing rule.
    pub fn push_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Classify an outcome. Pure: same outcome, same result.
    pub fn classify(&self, outcome: &RequestOutcome) -> ClassificationResult {
        if !outcome.succeeded {
            return transport_failure(outcome);
        }

        let status = outcome.http_status.unwrap_or(0);
        let body = outcome.raw_body.as_deref().unwrap_or_default();
        let Some(envelope) = Envelope::parse(body, &self.message_fields) else {
            return ClassificationResult::new(
                Category::ParseError,
                format!("Unparseable response (HTTP {status}): {}", snippet(body)),
            );
        };

        if status == 403 && self.distinguish_forbidden {
            return ClassificationResult::failure(format!(
                "Blocked by upstream (HTTP 403){}",
                suffix(&envelope.message)
            ))
            .blocked();
        }

        if let Some(rule) = self.rules.iter().find(|r| r.matches(&envelope)) {
            let display = if envelope.message.is_empty() {
                default_message(rule.category).to_string()
            } else {
                envelope.message.clone()
            };
            return ClassificationResult::new(rule.category, display)
                .with_value(rule.extract(&envelope.message));
        }

        if envelope.message.is_empty() {
            ClassificationResult::failure(format!("Check-in failed (HTTP {status})"))
        } else {
            ClassificationResult::failure(envelope.message)
        }
    }
}

fn transport_failure(outcome: &RequestOutcome) -> ClassificationResult {
    let kind = outcome.error_kind.unwrap_or(ErrorKind::Network);
    let detail = outcome.error_message.as_deref().unwrap_or("unknown error");
    let lead = match kind {
        ErrorKind::Network => "Network error",
        ErrorKind::Timeout => "Request timed out",
    };
    ClassificationResult::failure(format!(
        "{lead} after {} attempt(s): {detail}",
        outcome.attempts
    ))
    .with_error_kind(kind)
}

fn default_message(category: Category) -> &'static str {
    match category {
        Category::Success => "Check-in succeeded",
        Category::AlreadyDone => "Already checked in",
        Category::Failure => "Check-in failed",
        Category::ParseError => "Unparseable response",
    }
}

fn suffix(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(": {message}")
    }
}

fn snippet(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return "<empty>".into();
    }
    if body.chars().count() <= SNIPPET_CHARS {
        body.to_string()
    } else {
        let head: String = body.chars().take(SNIPPET_CHARS).collect();
        format!("{head}…")
    }
}
