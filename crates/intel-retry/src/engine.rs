use std::future::Future;
use std::time::{Duration, Instant};

use intel_core::error::IntelError;
use rand::Rng;

use crate::config::RetryConfig;
use crate::events::RetryEvent;

/// Runs `attempt_fn` under the dual-budget retry policy described in §4.1.
///
/// `attempt_fn` receives the 1-indexed attempt number and must produce a
/// fresh future each call (it's an `FnMut` rather than a single `Future`
/// because HTTP calls can't be replayed from a completed future). Two
/// independent counters are consumed depending on how a failure is
/// classified: [`IntelError::is_rate_limit`] draws from the rate-limit
/// budget, every other retryable error draws from the API budget. A
/// non-retryable error (per [`IntelError::is_retryable`]) always propagates
/// immediately.
pub async fn run<F, Fut, T>(config: &RetryConfig, mut attempt_fn: F) -> Result<T, IntelError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, IntelError>>,
{
    let mut attempt: u32 = 0;
    let mut api_attempts: u32 = 0;
    let mut rl_attempts: u32 = 0;

    loop {
        attempt += 1;
        match attempt_fn(attempt).await {
            Ok(value) => {
                config
                    .event_listeners
                    .emit(&RetryEvent::Success {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                        attempts: attempt,
                    });
                return Ok(value);
            }
            Err(err) => {
                if !err.is_retryable() {
                    config.event_listeners.emit(&RetryEvent::IgnoredError {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                    });
                    return Err(err);
                }

                let is_rate_limit = err.is_rate_limit();
                let budget_exhausted = if is_rate_limit {
                    rl_attempts += 1;
                    rl_attempts > config.rate_limit_budget
                } else {
                    api_attempts += 1;
                    api_attempts > config.api_budget
                };

                if budget_exhausted {
                    config.event_listeners.emit(&RetryEvent::BudgetExhausted {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                        attempt,
                        is_rate_limit,
                    });
                    config.event_listeners.emit(&RetryEvent::Error {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                        attempts: attempt,
                    });
                    return Err(err);
                }

                let delay = if is_rate_limit {
                    let computed = exponential(config.rl_base, config.rl_max, rl_attempts);
                    match err.retry_after() {
                        Some(retry_after) => computed.max(retry_after),
                        None => computed,
                    }
                } else {
                    exponential(config.base, config.max, api_attempts)
                };
                let delay = if config.jitter { jittered(delay) } else { delay };

                config.event_listeners.emit(&RetryEvent::Retry {
                    pattern_name: config.name.clone(),
                    timestamp: Instant::now(),
                    attempt,
                    delay,
                    is_rate_limit,
                });

                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// `min(base * 2^(n-1), max)`, `n` being the 1-indexed attempt within its budget.
fn exponential(base: Duration, max: Duration, n: u32) -> Duration {
    let factor = 1u64.checked_shl(n.saturating_sub(1)).unwrap_or(u64::MAX);
    base.saturating_mul(factor as u32).min(max)
}

/// Uniform sample in `[0.5·delay, 1.5·delay]`.
fn jittered(delay: Duration) -> Duration {
    let mut rng = rand::rng();
    let factor: f64 = rng.random_range(0.5..=1.5);
    Duration::from_secs_f64(delay.as_secs_f64() * factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn exponential_backoff_caps_at_max() {
        let base = Duration::from_secs(1);
        let max = Duration::from_secs(30);
        assert_eq!(exponential(base, max, 1), Duration::from_secs(1));
        assert_eq!(exponential(base, max, 2), Duration::from_secs(2));
        assert_eq!(exponential(base, max, 3), Duration::from_secs(4));
        assert_eq!(exponential(base, max, 10), max);
    }

    #[tokio::test]
    async fn succeeds_on_first_try_without_sleeping() {
        let cfg = RetryConfig::default();
        let result: Result<u32, IntelError> = run(&cfg, |_attempt| async { Ok(7u32) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn non_retryable_error_propagates_immediately() {
        let cfg = RetryConfig::default();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let result: Result<(), IntelError> = run(&cfg, move |_attempt| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            async { Err(IntelError::validation("x", "f", "e", "r", "rule")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn api_budget_exhausts_independent_of_rate_limit_budget() {
        let cfg = RetryConfig::builder()
            .api_budget(2)
            .rate_limit_budget(5)
            .backoff(Duration::from_millis(1), Duration::from_millis(5))
            .jitter(false)
            .build();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let result: Result<(), IntelError> = run(&cfg, move |_attempt| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            async { Err(IntelError::api("exa", "exa", "/search", Some(500), 1)) }
        })
        .await;
        assert!(result.is_err());
        // initial attempt + 2 retries (api_budget) = 3 calls total
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rate_limit_failures_consume_only_rate_limit_budget() {
        let cfg = RetryConfig::builder()
            .api_budget(1)
            .rate_limit_budget(3)
            .rl_backoff(Duration::from_millis(1), Duration::from_millis(5))
            .jitter(false)
            .build();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let result: Result<(), IntelError> = run(&cfg, move |_attempt| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            async { Err(IntelError::rate_limit("exa", "exa", 0)) }
        })
        .await;
        assert!(result.is_err());
        // initial attempt + 3 retries (rate_limit_budget), unaffected by api_budget=1
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn retry_after_floors_the_computed_delay() {
        // rl_base is tiny so the computed backoff would be ~1ms; the
        // service-supplied retry_after of 1s must win per §4.1.
        let cfg = RetryConfig::builder()
            .rate_limit_budget(1)
            .rl_backoff(Duration::from_millis(1), Duration::from_secs(5))
            .jitter(false)
            .build();
        let start = Instant::now();
        let result: Result<(), IntelError> = run(&cfg, |attempt| async move {
            if attempt == 1 {
                Err(IntelError::rate_limit("exa", "exa", 1))
            } else {
                Ok(())
            }
        })
        .await;
        assert!(result.is_ok());
        assert!(start.elapsed() >= Duration::from_secs(1));
    }
}
