//! Retrying requester: one logical check-in call, bounded sequential retries.
//!
//! Transport errors and empty bodies are retried; any response that carries
//! a body is returned immediately, whatever its status code. A 403 or 500 is
//! data for the classifier, not a reason to hammer the upstream again.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use signbot_core::config::{BackoffPolicy, RetryConfig};
use signbot_core::traits::{Transport, TransportError};
use signbot_core::types::{ErrorKind, RequestOutcome, RequestSpec};

use crate::redact::{redact_headers, redact_text};

/// Issues requests through a [`Transport`] with retry and backoff.
#[derive(Clone)]
pub struct Requester {
    transport: Arc<dyn Transport>,
    max_attempts: u32,
    backoff: BackoffPolicy,
}

impl Requester {
    pub fn new(transport: Arc<dyn Transport>, max_attempts: u32, backoff: BackoffPolicy) -> Self {
        Self {
            transport,
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(transport: Arc<dyn Transport>, config: &RetryConfig) -> Self {
        Self::new(transport, config.max_attempts, config.backoff)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run the request until it yields a body or attempts run out.
    pub async fn request(&self, spec: &RequestSpec) -> RequestOutcome {
        let target = redact_text(&spec.url, &spec.sensitive);
        let mut last_error = TransportError::network("no attempt made");

        for attempt in 1..=self.max_attempts {
            tracing::info!(
                attempt,
                max_attempts = self.max_attempts,
                transport = self.transport.name(),
                headers = %redact_headers(&spec.headers, &spec.sensitive),
                "📤 {} {}",
                spec.method,
                target
            );

            match self.transport.send(spec).await {
                Ok(resp) if spec.require_body && resp.body.trim().is_empty() => {
                    last_error = TransportError::network(format!(
                        "empty response body (HTTP {})",
                        resp.status
                    ));
                }
                Ok(resp) => {
                    tracing::debug!("📥 HTTP {} from {} (attempt {attempt})", resp.status, target);
                    return RequestOutcome::success(resp.status, resp.body, attempt);
                }
                Err(e) => last_error = e,
            }

            if attempt < self.max_attempts {
                let delay = backoff_delay(&self.backoff, attempt);
                tracing::warn!(
                    "⚠️ Attempt {attempt}/{} to {} failed: {}; retrying in {}ms",
                    self.max_attempts,
                    target,
                    redact_text(&last_error.message, &spec.sensitive),
                    delay.as_millis()
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            } else {
                tracing::warn!(
                    "❌ Giving up on {} after {} attempts: {}",
                    target,
                    self.max_attempts,
                    redact_text(&last_error.message, &spec.sensitive)
                );
            }
        }

        // Exhausted retries are a network failure; the message keeps the last cause
        RequestOutcome::failure(
            ErrorKind::Network,
            redact_text(&last_error.to_string(), &spec.sensitive),
            self.max_attempts,
        )
    }
}

/// Wait before the retry that follows attempt number `attempt` (1-based).
pub fn backoff_delay(policy: &BackoffPolicy, attempt: u32) -> Duration {
    match *policy {
        BackoffPolicy::Fixed { min_ms, max_ms } => {
            let ms = if max_ms <= min_ms {
                min_ms
            } else {
                rand::thread_rng().gen_range(min_ms..=max_ms)
            };
            Duration::from_millis(ms)
        }
        BackoffPolicy::Incremental { base_ms, step_ms } => {
            let extra = step_ms.saturating_mul(u64::from(attempt.saturating_sub(1)));
            Duration::from_millis(base_ms.saturating_add(extra))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use signbot_core::traits::RawResponse;
    use signbot_core::types::HttpMethod;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Replays a script of results, repeating the last one.
    struct ScriptedTransport {
        script: Mutex<Vec<Result<RawResponse, TransportError>>>,
        calls: AtomicU32,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<RawResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn send(&self, _request: &RequestSpec) -> Result<RawResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.remove(0)
            } else {
                script[0].clone()
            }
        }
    }

    fn ok(status: u16, body: &str) -> Result<RawResponse, TransportError> {
        Ok(RawResponse {
            status,
            body: body.into(),
        })
    }

    fn spec() -> RequestSpec {
        RequestSpec::new(HttpMethod::Post, "https://forum.test/checkin")
    }

    #[tokio::test]
    async fn test_always_failing_transport_makes_exactly_max_attempts() {
        let transport = ScriptedTransport::new(vec![Err(TransportError::network("connection refused"))]);
        let requester = Requester::new(transport.clone(), 3, BackoffPolicy::none());

        let outcome = requester.request(&spec()).await;
        assert!(!outcome.succeeded);
        assert_eq!(outcome.error_kind, Some(ErrorKind::Network));
        assert_eq!(outcome.attempts, 3);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::timeout("deadline elapsed")),
            ok(200, r#"{"ret":1}"#),
        ]);
        let requester = Requester::new(transport.clone(), 3, BackoffPolicy::none());

        let outcome = requester.request(&spec()).await;
        assert!(outcome.succeeded);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.raw_body.as_deref(), Some(r#"{"ret":1}"#));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_forbidden_is_not_retried() {
        let transport = ScriptedTransport::new(vec![ok(403, r#"{"message":"blocked"}"#)]);
        let requester = Requester::new(transport.clone(), 3, BackoffPolicy::none());

        let outcome = requester.request(&spec()).await;
        assert!(outcome.succeeded);
        assert_eq!(outcome.http_status, Some(403));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_body_is_retried_when_required() {
        let transport = ScriptedTransport::new(vec![ok(200, "  ")]);
        let requester = Requester::new(transport.clone(), 2, BackoffPolicy::none());

        let outcome = requester.request(&spec()).await;
        assert!(!outcome.succeeded);
        assert_eq!(outcome.error_kind, Some(ErrorKind::Network));
        assert!(outcome.error_message.unwrap().contains("empty response body"));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_body_accepted_when_not_required() {
        let transport = ScriptedTransport::new(vec![ok(204, "")]);
        let requester = Requester::new(transport.clone(), 3, BackoffPolicy::none());

        let mut spec = spec();
        spec.require_body = false;
        let outcome = requester.request(&spec).await;
        assert!(outcome.succeeded);
        assert_eq!(outcome.http_status, Some(204));
    }

    #[tokio::test]
    async fn test_exhausted_timeouts_reported_as_network() {
        let transport = ScriptedTransport::new(vec![Err(TransportError::timeout("slow"))]);
        let requester = Requester::new(transport.clone(), 3, BackoffPolicy::none());
        let outcome = requester.request(&spec()).await;
        assert!(!outcome.succeeded);
        assert_eq!(outcome.error_kind, Some(ErrorKind::Network));
        assert_eq!(outcome.attempts, 3);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.error_message.as_deref(), Some("timeout error: slow"));
    }

    #[tokio::test]
    async fn test_error_message_redacted() {
        let transport = ScriptedTransport::new(vec![Err(TransportError::network(
            "bad url https://x.test/?k=topsecret99",
        ))]);
        let requester = Requester::new(transport, 1, BackoffPolicy::none());
        let mut spec = spec();
        spec.sensitive = vec!["topsecret99".into()];
        let outcome = requester.request(&spec).await;
        assert!(!outcome.error_message.unwrap().contains("topsecret99"));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        let transport = ScriptedTransport::new(vec![ok(200, "x")]);
        let requester = Requester::new(transport, 0, BackoffPolicy::none());
        assert_eq!(requester.max_attempts(), 1);
    }

    #[test]
    fn test_backoff_fixed_range() {
        let policy = BackoffPolicy::Fixed { min_ms: 3000, max_ms: 5000 };
        for attempt in 1..20 {
            let d = backoff_delay(&policy, attempt).as_millis();
            assert!((3000..=5000).contains(&d));
        }
    }

    #[test]
    fn test_backoff_incremental() {
        let policy = BackoffPolicy::Incremental { base_ms: 1000, step_ms: 500 };
        assert_eq!(backoff_delay(&policy, 1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(&policy, 3), Duration::from_millis(2000));
    }
}
