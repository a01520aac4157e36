//! Completion-service boundary.
//!
//! Natural-language authoring lives outside this crate. What lives here is
//! the contract ([`CompletionService`]), its typed errors, and
//! [`call_with_retry`], which bounds every call with a timeout, honours an
//! abort signal and retries only retriable failures with backoff.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Default exponential multiplier
pub const DEFAULT_EXPONENTIAL_MULTIPLIER: f64 = 2.0;

/// Failure class of a completion call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionErrorCode {
    /// Provider throttled the request
    RateLimited,
    /// The call exceeded its budget
    Timeout,
    /// Provider-side failure
    ServerError,
    /// Transport failure
    NetworkError,
    /// Response could not be parsed
    MalformedResponse,
    /// Model or parameters not supported
    UnsupportedConfiguration,
    /// Credentials rejected
    AuthenticationFailed,
    /// Request rejected as invalid
    InvalidRequest,
    /// Caller aborted the call
    Cancelled,
}

impl CompletionErrorCode {
    /// Stable machine-readable code
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "completion_rate_limited",
            Self::Timeout => "completion_timeout",
            Self::ServerError => "completion_server_error",
            Self::NetworkError => "completion_network_error",
            Self::MalformedResponse => "completion_malformed_response",
            Self::UnsupportedConfiguration => "completion_unsupported_configuration",
            Self::AuthenticationFailed => "completion_authentication_failed",
            Self::InvalidRequest => "completion_invalid_request",
            Self::Cancelled => "completion_cancelled",
        }
    }

    /// Whether a retry can succeed
    #[must_use]
    pub const fn is_retriable(self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Timeout | Self::ServerError | Self::NetworkError
        )
    }
}

impl fmt::Display for CompletionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed completion failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct CompletionError {
    /// Failure class
    pub code: CompletionErrorCode,
    /// Provider or local message
    pub message: String,
}

impl CompletionError {
    /// Error of a given class
    #[must_use]
    pub fn new(code: CompletionErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The call exceeded `ms`
    #[must_use]
    pub fn timeout(ms: u64) -> Self {
        Self::new(CompletionErrorCode::Timeout, format!("no response within {ms}ms"))
    }

    /// The caller aborted
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(CompletionErrorCode::Cancelled, "call aborted by caller")
    }

    /// Whether a retry can succeed
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        self.code.is_retriable()
    }
}

/// Request parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Output budget
    pub max_tokens: u32,
    /// Per-call budget in milliseconds
    pub timeout_ms: u64,
}

impl Default for CompletionRequest {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 0.0,
            max_tokens: 1024,
            timeout_ms: 30_000,
        }
    }
}

/// Provider response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated text
    pub completion: String,
    /// Provider metadata (usage, model, ...)
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// A completion provider
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Complete `prompt`
    async fn generate_completion(
        &self,
        prompt: &str,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError>;
}

/// Delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BackoffConfig {
    /// Retry immediately
    #[default]
    None,
    /// `base_delay_ms * attempt`
    Linear { base_delay_ms: u64 },
    /// `base_delay_ms * multiplier^(attempt - 1)`
    Exponential { base_delay_ms: u64, multiplier: f64 },
}

impl BackoffConfig {
    /// Exponential backoff with the default multiplier
    #[must_use]
    pub const fn exponential(base_delay_ms: u64) -> Self {
        Self::Exponential {
            base_delay_ms,
            multiplier: DEFAULT_EXPONENTIAL_MULTIPLIER,
        }
    }

    /// Delay before retry number `attempt` (1-based)
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let ms = match *self {
            Self::None => 0,
            Self::Linear { base_delay_ms } => base_delay_ms.saturating_mul(u64::from(attempt)),
            Self::Exponential {
                base_delay_ms,
                multiplier,
            } => {
                let factor = multiplier.max(1.0).powi(attempt.saturating_sub(1) as i32);
                (base_delay_ms as f64 * factor).min(u64::MAX as f64) as u64
            }
        };
        Duration::from_millis(ms)
    }
}

/// Attempt budget and backoff
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay between attempts
    pub backoff: BackoffConfig,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffConfig::exponential(250),
        }
    }
}

/// Call `service` with a timeout per attempt, retrying retriable failures.
///
/// The in-flight future is dropped on timeout or when `cancel` fires, which
/// aborts the underlying request.
pub async fn call_with_retry(
    service: &dyn CompletionService,
    prompt: &str,
    request: &CompletionRequest,
    policy: &RetryPolicy,
    cancel: Option<&CancellationToken>,
) -> Result<CompletionResponse, CompletionError> {
    let never = CancellationToken::new();
    let cancel = cancel.unwrap_or(&never);
    let budget = Duration::from_millis(request.timeout_ms);
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(CompletionError::cancelled()),
            result = tokio::time::timeout(budget, service.generate_completion(prompt, request)) => {
                result.unwrap_or_else(|_| Err(CompletionError::timeout(request.timeout_ms)))
            }
        };

        match outcome {
            Ok(response) => return Ok(response),
            Err(err) if err.is_retriable() && attempt < max_attempts => {
                let delay = policy.backoff.delay(attempt);
                tracing::warn!(
                    code = %err.code,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "completion failed, retrying"
                );
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(CompletionError::cancelled()),
                    () = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays scripted results, then succeeds
    struct Scripted {
        failures: Mutex<Vec<CompletionErrorCode>>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl Scripted {
        fn new(failures: Vec<CompletionErrorCode>) -> Self {
            Self {
                failures: Mutex::new(failures),
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::new(Vec::new())
            }
        }
    }

    #[async_trait]
    impl CompletionService for Scripted {
        async fn generate_completion(
            &self,
            prompt: &str,
            _request: &CompletionRequest,
        ) -> Result<CompletionResponse, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let next = {
                let mut failures = self.failures.lock().unwrap();
                (!failures.is_empty()).then(|| failures.remove(0))
            };
            match next {
                Some(code) => Err(CompletionError::new(code, "scripted")),
                None => Ok(CompletionResponse {
                    completion: format!("echo: {prompt}"),
                    metadata: BTreeMap::new(),
                }),
            }
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: BackoffConfig::Linear { base_delay_ms: 1 },
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn test_retriable_codes() {
            assert!(CompletionErrorCode::RateLimited.is_retriable());
            assert!(CompletionErrorCode::NetworkError.is_retriable());
            assert!(!CompletionErrorCode::AuthenticationFailed.is_retriable());
            assert!(!CompletionErrorCode::Cancelled.is_retriable());
        }

        #[test]
        fn test_display() {
            let err = CompletionError::timeout(500);
            assert_eq!(err.to_string(), "completion_timeout: no response within 500ms");
        }

        #[test]
        fn test_backoff_delays() {
            let exp = BackoffConfig::exponential(100);
            assert_eq!(exp.delay(1), Duration::from_millis(100));
            assert_eq!(exp.delay(3), Duration::from_millis(400));
            assert_eq!(BackoffConfig::Linear { base_delay_ms: 50 }.delay(3), Duration::from_millis(150));
            assert_eq!(BackoffConfig::None.delay(5), Duration::ZERO);
            assert_eq!(exp.delay(0), Duration::ZERO);
        }
    }

    mod retry_tests {
        use super::*;

        #[tokio::test]
        async fn test_retries_retriable_then_succeeds() {
            let service = Scripted::new(vec![
                CompletionErrorCode::RateLimited,
                CompletionErrorCode::ServerError,
            ]);
            let response = call_with_retry(&service, "hi", &CompletionRequest::default(), &fast_policy(3), None)
                .await
                .unwrap();
            assert_eq!(response.completion, "echo: hi");
            assert_eq!(service.calls.load(Ordering::SeqCst), 3);
        }

        #[tokio::test]
        async fn test_non_retriable_surfaces_immediately() {
            let service = Scripted::new(vec![CompletionErrorCode::MalformedResponse]);
            let err = call_with_retry(&service, "hi", &CompletionRequest::default(), &fast_policy(5), None)
                .await
                .unwrap_err();
            assert_eq!(err.code, CompletionErrorCode::MalformedResponse);
            assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn test_attempts_are_bounded() {
            let service = Scripted::new(vec![CompletionErrorCode::NetworkError; 10]);
            let err = call_with_retry(&service, "hi", &CompletionRequest::default(), &fast_policy(2), None)
                .await
                .unwrap_err();
            assert_eq!(err.code, CompletionErrorCode::NetworkError);
            assert_eq!(service.calls.load(Ordering::SeqCst), 2);
        }

        #[tokio::test]
        async fn test_timeout_aborts_call() {
            let service = Scripted::slow(Duration::from_secs(5));
            let request = CompletionRequest {
                timeout_ms: 20,
                ..CompletionRequest::default()
            };
            let err = call_with_retry(&service, "hi", &request, &fast_policy(1), None)
                .await
                .unwrap_err();
            assert_eq!(err.code, CompletionErrorCode::Timeout);
        }

        #[tokio::test]
        async fn test_cancellation() {
            let service = Scripted::slow(Duration::from_secs(5));
            let token = CancellationToken::new();
            let trigger = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                trigger.cancel();
            });
            let err = call_with_retry(&service, "hi", &CompletionRequest::default(), &fast_policy(3), Some(&token))
                .await
                .unwrap_err();
            assert_eq!(err.code, CompletionErrorCode::Cancelled);
            assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        }
    }
}
