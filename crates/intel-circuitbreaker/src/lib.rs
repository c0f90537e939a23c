//! Per-service circuit breaker (C4, §4.2).
//!
//! Unlike the teacher crate this started from — a Tower `Layer` tracking
//! failure *rate* over a sliding window of arbitrary size — the breaker here
//! trips on a simple failure *count* within a rolling time window, matching
//! §4.2 exactly. What's preserved is the shape: a builder-configured config
//! object, an event-listener hook, and a mutex-guarded state machine wrapped
//! in a cheaply cloneable handle.
//!
//! ```
//! use intel_circuitbreaker::CircuitBreaker;
//! use intel_core::error::IntelError;
//!
//! # async fn example() -> Result<(), IntelError> {
//! let breaker = CircuitBreaker::new(Default::default());
//! let result = breaker.call("exa", || async { Ok::<_, IntelError>(42) }).await?;
//! assert_eq!(result, 42);
//! # Ok(())
//! # }
//! ```

mod circuit;
mod config;
mod events;

pub use circuit::CircuitState;
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use events::CircuitBreakerEvent;

use std::future::Future;
use std::sync::{Arc, Mutex};

use intel_core::error::IntelError;

use crate::circuit::Circuit;

/// A breaker instance, cheap to clone (the underlying state is shared).
#[derive(Clone)]
pub struct CircuitBreaker {
    config: Arc<CircuitBreakerConfig>,
    circuit: Arc<Mutex<Circuit>>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config: Arc::new(config),
            circuit: Arc::new(Mutex::new(Circuit::new())),
        }
    }

    /// Current state, applying the lazy Open → HalfOpen transition per §4.2.
    pub fn state(&self) -> CircuitState {
        let mut circuit = self.circuit.lock().expect("circuit breaker mutex poisoned");
        circuit.refreshed_state(&self.config)
    }

    /// Runs `f` if the breaker permits it, otherwise returns
    /// [`IntelError::CircuitOpen`] without invoking `f` at all.
    ///
    /// `source_module` is the caller's module name for error attribution;
    /// the breaker's own `name` (set via the builder) identifies the
    /// protected service in events and error messages.
    pub async fn call<F, Fut, T>(&self, source_module: &str, f: F) -> Result<T, IntelError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, IntelError>>,
    {
        {
            let mut circuit = self.circuit.lock().expect("circuit breaker mutex poisoned");
            if let Err(rejected) = circuit.try_acquire(&self.config) {
                return Err(IntelError::circuit_open(
                    source_module,
                    self.config.name.clone(),
                    rejected.reopens_in_seconds,
                ));
            }
        }

        let result = f().await;

        let mut circuit = self.circuit.lock().expect("circuit breaker mutex poisoned");
        match &result {
            Ok(_) => circuit.record_success(&self.config),
            Err(_) => circuit.record_failure(&self.config),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn closed_breaker_passes_calls_through() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig::default());
        let result = breaker.call("exa", || async { Ok::<_, IntelError>(1) }).await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn open_breaker_rejects_without_invoking_callback() {
        let config = CircuitBreakerConfig::builder().failure_threshold(1).build();
        let breaker = CircuitBreaker::new(config);

        let _ = breaker
            .call("exa", || async { Err::<(), _>(IntelError::api("exa", "exa", "/s", Some(500), 1)) })
            .await;
        assert_eq!(breaker.state(), CircuitState::Open);

        let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let calls_clone = calls.clone();
        let result = breaker
            .call("exa", move || {
                calls_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                async { Ok::<_, IntelError>(()) }
            })
            .await;
        assert!(matches!(result, Err(IntelError::CircuitOpen { .. })));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn half_open_probe_recovers_to_closed() {
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(1)
            .timeout(Duration::from_millis(10))
            .build();
        let breaker = CircuitBreaker::new(config);

        let _ = breaker
            .call("exa", || async { Err::<(), _>(IntelError::api("exa", "exa", "/s", Some(500), 1)) })
            .await;
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(15)).await;

        let result = breaker.call("exa", || async { Ok::<_, IntelError>(()) }).await;
        assert!(result.is_ok());
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
