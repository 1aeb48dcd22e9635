use crate::error::{ReorderError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Bounded retry shared by the reversal engine (per move) and the backup
/// append (per batch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per step, the first one included.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// No sleeping between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Delay before attempt `attempt + 1`, after `attempt` failures.
    pub fn backoff(&self, attempt: u32, err: &ReorderError) -> Duration {
        if let ReorderError::RateLimited { retry_after: Some(secs) } = err {
            return std::cmp::min(Duration::from_secs(*secs), MAX_BACKOFF);
        }
        let factor = 1u32 << attempt.saturating_sub(1).min(6);
        std::cmp::min(self.base_delay.saturating_mul(factor), MAX_BACKOFF)
    }

    /// Run `step` until it succeeds or the attempt budget is spent.
    ///
    /// Each call must reissue the same request; `index` is only reported.
    /// Errors that cannot succeed on a reissue end the loop at once, wrapped
    /// in `Stalled` so the caller still learns where work stopped.
    pub async fn run<T, F, Fut>(&self, operation: &str, index: usize, mut step: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match step().await {
                Ok(v) => return Ok(v),
                Err(e) if !e.is_retryable() => {
                    error!("{} at index {} failed: {}", operation, index, e);
                    return Err(ReorderError::Stalled {
                        operation: operation.to_string(),
                        index,
                        source: Box::new(e),
                    });
                }
                Err(e) if attempt >= self.max_attempts => {
                    error!("Giving up on {} at index {} after {} attempts: {}", operation, index, attempt, e);
                    return Err(ReorderError::RetryExhausted {
                        operation: operation.to_string(),
                        index,
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    let wait = self.backoff(attempt, &e);
                    warn!(
                        "{} at index {} failed (attempt {}): {}. Retrying in {:?}",
                        operation, index, attempt, e, wait
                    );
                    if !wait.is_zero() {
                        tokio::time::sleep(wait).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> ReorderError {
        ReorderError::RemoteApi { status: 502, message: "Bad gateway".into() }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let res = RetryPolicy::immediate(3)
            .run("add tracks", 0, || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(transient())
                } else {
                    Ok("ok")
                }
            })
            .await;
        assert_eq!(res.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_budget() {
        let calls = AtomicU32::new(0);
        let res: Result<()> = RetryPolicy::immediate(3)
            .run("move track", 7, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            })
            .await;
        let err = res.unwrap_err();
        assert_eq!(err.stalled_index(), Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn terminal_errors_skip_retry() {
        let calls = AtomicU32::new(0);
        let res: Result<()> = RetryPolicy::immediate(3)
            .run("move track", 0, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ReorderError::Auth("expired".into()))
            })
            .await;
        let err = res.unwrap_err();
        assert!(matches!(err, ReorderError::Stalled { index: 0, .. }));
        assert!(matches!(err.cause(), ReorderError::Auth(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_doubles_and_honours_retry_after() {
        let p = RetryPolicy::new(5, Duration::from_secs(1));
        assert_eq!(p.backoff(1, &transient()), Duration::from_secs(1));
        assert_eq!(p.backoff(3, &transient()), Duration::from_secs(4));
        assert_eq!(p.backoff(20, &transient()), MAX_BACKOFF);
        let limited = ReorderError::RateLimited { retry_after: Some(7) };
        assert_eq!(p.backoff(1, &limited), Duration::from_secs(7));
    }

    #[test]
    fn retry_after_is_capped() {
        let p = RetryPolicy::default();
        let day = ReorderError::RateLimited { retry_after: Some(86_400) };
        assert_eq!(p.backoff(1, &day), MAX_BACKOFF);
    }
}
