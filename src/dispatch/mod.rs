//! Saving or sending the final reply with backoff on transient
//! provider failures.
//!
//! Classification comes from `ProviderErrorKind`. Credential failures
//! and quota/permission refusals are returned immediately, everything
//! else is retried. A delay follows every transient failure, the last
//! one included, so the default policy takes 1 + 2 + 4 seconds to give
//! up.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::core::PipelineError;
use crate::google::{Capability, MailProvider, ProviderError, ProviderErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Store the reply as a provider draft.
    DraftOnly,
    /// Send the reply.
    Send,
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchMode::DraftOnly => f.write_str("draft"),
            DispatchMode::Send => f.write_str("send"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: usize,
    /// Delay after the first failure, doubled after each one after that.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: usize, initial_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            initial_delay,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (zero based).
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt as u32).unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor)
    }
}

/// Run `op` under `policy`, converting the final failure into a
/// `PipelineError`.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, mut op: F) -> Result<T, PipelineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let attempts = policy.attempts.max(1);
    let mut last_error = String::new();

    for attempt in 0..attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => match err.kind {
                ProviderErrorKind::Auth => {
                    tracing::warn!("Dispatch rejected credentials: {}", err.message);
                    return Err(PipelineError::AuthExpired(err.message));
                }
                ProviderErrorKind::QuotaOrPermission => {
                    tracing::warn!("Dispatch refused: {}", err.message);
                    return Err(PipelineError::QuotaOrPermission(err.message));
                }
                ProviderErrorKind::NotFound | ProviderErrorKind::Transient => {
                    let delay = policy.delay_for(attempt);
                    tracing::warn!(
                        "Dispatch failed (attempt {}/{}): {}. Waiting {:?}",
                        attempt + 1,
                        attempts,
                        err.message,
                        delay
                    );
                    last_error = err.message;
                    tokio::time::sleep(delay).await;
                }
            },
        }
    }

    Err(PipelineError::DispatchExhausted {
        attempts,
        last_error,
    })
}

/// Save or send `raw` in `thread_id`, returning the provider's id for
/// the draft or sent message.
pub async fn dispatch(
    policy: &RetryPolicy,
    mail: &dyn MailProvider,
    cap: &Capability,
    mode: DispatchMode,
    thread_id: &str,
    raw: &str,
) -> Result<String, PipelineError> {
    tracing::info!("Dispatching reply ({}) for thread {}", mode, thread_id);
    with_retry(policy, move || async move {
        match mode {
            DispatchMode::DraftOnly => mail.create_draft(cap, thread_id, raw).await,
            DispatchMode::Send => mail.send_message(cap, thread_id, raw).await,
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::time::Instant;

    use super::*;

    fn transient() -> ProviderError {
        ProviderError::transient("503 backend unavailable")
    }

    #[test]
    fn test_default_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_first_attempt() {
        let calls = AtomicUsize::new(0);
        let start = Instant::now();
        let result = with_retry(&RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ProviderError>("msg-1".to_string()) }
        })
        .await
        .unwrap();

        assert_eq!(result, "msg-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_failure_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let start = Instant::now();
        let err = with_retry(&RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<String, _>(ProviderError::new(ProviderErrorKind::Auth, "401")) }
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind(), "auth_expired");
        assert!(err.detail().contains("log in again"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_failure_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let err = with_retry(&RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<String, _>(ProviderError::new(
                    ProviderErrorKind::QuotaOrPermission,
                    "429 rate limited",
                ))
            }
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind(), "quota_or_permission");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_twice_then_success() {
        let calls = AtomicUsize::new(0);
        let start = Instant::now();
        let result = with_retry(&RetryPolicy::default(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(transient())
                } else {
                    Ok("msg-3".to_string())
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, "msg-3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s after the first failure, 2s after the second
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_after_three_transient_failures() {
        let calls = AtomicUsize::new(0);
        let start = Instant::now();
        let err = with_retry(&RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<String, _>(transient()) }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(7));
        match err {
            PipelineError::DispatchExhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(last_error, "503 backend unavailable");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
