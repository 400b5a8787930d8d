//! A small retry wrapper, deliberately not a resilience framework (Design
//! Notes 9: "Retry policy -> library-free helper"). Exponential backoff,
//! capped, with a caller-supplied predicate for which errors are worth
//! retrying at all.

use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(1000),
            max_backoff: Duration::from_millis(30_000),
        }
    }
}

/// Runs `op` up to `policy.max_retries + 1` times total, doubling the
/// backoff after every failure up to `policy.max_backoff`. Stops
/// immediately, without sleeping, the moment `should_retry` returns false
/// for the error produced. `on_retry` fires once per retry, before the
/// backoff sleep, so a caller can keep its own retry count (e.g. a metric)
/// without this module depending on anything outside itself.
pub async fn retry<T, E, F, Fut, ShouldRetry, OnRetry>(
    policy: RetryPolicy,
    mut should_retry: ShouldRetry,
    mut on_retry: OnRetry,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    ShouldRetry: FnMut(&E) -> bool,
    OnRetry: FnMut(),
{
    let mut backoff = policy.initial_backoff;
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_retries && should_retry(&err) => {
                warn!(attempt, ?backoff, "retrying after transient error");
                on_retry();
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(policy.max_backoff);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_up_to_max_then_gives_up() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_retries: 2,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        };
        let result: Result<(), &'static str> = retry(
            policy,
            |_| true,
            || {},
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("boom") }
            },
        )
        .await;
        assert_eq!(result, Err("boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_immediately_on_non_retryable_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default();
        let result: Result<(), &'static str> = retry(
            policy,
            |_| false,
            || {},
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("fatal") }
            },
        )
        .await;
        assert_eq!(result, Err("fatal"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_retries: 5,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        };
        let retries = AtomicU32::new(0);
        let result = retry(
            policy,
            |_: &&str| true,
            || {
                retries.fetch_add(1, Ordering::SeqCst);
            },
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { if n < 2 { Err("not yet") } else { Ok(42) } }
            },
        )
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(retries.load(Ordering::SeqCst), 2, "on_retry fires once per retried attempt");
    }
}
