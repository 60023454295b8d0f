//! Log-safe rendering of request targets and headers.

/// Headers logged per attempt.
const MAX_LOGGED_HEADERS: usize = 6;
/// Characters kept from each logged header value.
const MAX_VALUE_CHARS: usize = 32;

const SENSITIVE_HEADERS: &[&str] = &["cookie", "authorization", "token", "x-api-key", "api-key"];

/// Mask a secret string for display, keeping the first 4 chars
pub fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    if s.chars().count() <= 4 {
        return "••••".to_string();
    }
    let head: String = s.chars().take(4).collect();
    format!("{head}••••")
}

/// Replace every occurrence of a sensitive value with its masked form.
pub fn redact_text(text: &str, sensitive: &[String]) -> String {
    let mut out = text.to_string();
    for secret in sensitive.iter().filter(|s| !s.is_empty()) {
        out = out.replace(secret.as_str(), &mask_secret(secret));
    }
    out
}

/// Render headers as `name: value; ...`, masking credentials and truncating
/// both the list and each value.
pub fn redact_headers(headers: &[(String, String)], sensitive: &[String]) -> String {
    let mut parts: Vec<String> = headers
        .iter()
        .take(MAX_LOGGED_HEADERS)
        .map(|(name, value)| {
            let lower = name.to_ascii_lowercase();
            let shown = if SENSITIVE_HEADERS.iter().any(|h| lower.contains(h)) {
                mask_secret(value)
            } else {
                truncate(&redact_text(value, sensitive), MAX_VALUE_CHARS)
            };
            format!("{name}: {shown}")
        })
        .collect();
    if headers.len() > MAX_LOGGED_HEADERS {
        parts.push(format!("(+{} more)", headers.len() - MAX_LOGGED_HEADERS));
    }
    parts.join("; ")
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars).collect();
        format!("{head}…")
    }
}
