use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use intel_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use intel_core::error::IntelError;

#[tokio::test]
async fn full_lifecycle_closed_open_half_open_closed() {
    let config = CircuitBreakerConfig::builder()
        .failure_threshold(2)
        .timeout(Duration::from_millis(20))
        .half_open_max_calls(1)
        .build();
    let breaker = CircuitBreaker::new(config);

    for _ in 0..2 {
        let result = breaker
            .call("exa", || async {
                Err::<(), _>(IntelError::api("exa", "exa", "/search", Some(503), 5))
            })
            .await;
        assert!(result.is_err());
    }
    assert_eq!(breaker.state(), CircuitState::Open);

    let rejected = breaker.call("exa", || async { Ok::<_, IntelError>(()) }).await;
    assert!(matches!(rejected, Err(IntelError::CircuitOpen { .. })));

    tokio::time::sleep(Duration::from_millis(25)).await;
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    let probe = breaker.call("exa", || async { Ok::<_, IntelError>(7) }).await;
    assert_eq!(probe.unwrap(), 7);
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test]
async fn half_open_limits_concurrent_probes() {
    let config = CircuitBreakerConfig::builder()
        .failure_threshold(1)
        .timeout(Duration::from_millis(10))
        .half_open_max_calls(1)
        .build();
    let breaker = CircuitBreaker::new(config);

    let _ = breaker
        .call("exa", || async {
            Err::<(), _>(IntelError::api("exa", "exa", "/search", Some(503), 5))
        })
        .await;
    tokio::time::sleep(Duration::from_millis(15)).await;
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    let permitted_calls = Arc::new(AtomicU32::new(0));
    let permitted_clone = permitted_calls.clone();
    let slow_breaker = breaker.clone();
    let slow_probe = tokio::spawn(async move {
        slow_breaker
            .call("exa", move || {
                permitted_clone.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    Ok::<_, IntelError>(())
                }
            })
            .await
    });

    tokio::time::sleep(Duration::from_millis(5)).await;
    let rejected = breaker.call("exa", || async { Ok::<_, IntelError>(()) }).await;
    assert!(matches!(rejected, Err(IntelError::CircuitOpen { .. })));

    slow_probe.await.unwrap().unwrap();
    assert_eq!(permitted_calls.load(Ordering::SeqCst), 1);
    assert_eq!(breaker.state(), CircuitState::Closed);
}
