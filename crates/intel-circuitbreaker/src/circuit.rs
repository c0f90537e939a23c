use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;

/// The three states a breaker can be in (§3 `CircuitState`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// A rejected call, carrying the hint §4.2 specifies for each state.
#[derive(Debug, Clone, Copy)]
pub struct Rejected {
    pub reopens_in_seconds: u64,
}

/// The mutable state machine underlying a breaker. Not thread-safe on its
/// own — `intel-circuitbreaker::CircuitBreaker` wraps it in a mutex, the way
/// the teacher wraps `Circuit` behind an atomic-backed snapshot.
pub(crate) struct Circuit {
    state: CircuitState,
    failures: VecDeque<Instant>,
    opened_at: Option<Instant>,
    half_open_inflight: u32,
}

impl Circuit {
    pub(crate) fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failures: VecDeque::new(),
            opened_at: None,
            half_open_inflight: 0,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    fn prune(&mut self, window: Duration) {
        let now = Instant::now();
        while let Some(&oldest) = self.failures.front() {
            if now.duration_since(oldest) > window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
    }

    /// Lazily applies the Open → HalfOpen transition on every touch, per §4.2
    /// ("When a caller reads `state` (or attempts a call)").
    fn refresh(&mut self, config: &CircuitBreakerConfig) {
        if self.state == CircuitState::Open {
            if let Some(opened_at) = self.opened_at {
                if opened_at.elapsed() >= config.timeout {
                    self.transition_to(CircuitState::HalfOpen, config, None);
                    self.half_open_inflight = 0;
                }
            }
        }
    }

    /// Returns `Ok(())` if the call may proceed, `Err(Rejected)` otherwise.
    /// On success the caller must eventually call [`Circuit::record_success`]
    /// or [`Circuit::record_failure`].
    /// Applies the lazy Open → HalfOpen transition and returns the resulting
    /// state, without consuming a half-open in-flight slot.
    pub fn refreshed_state(&mut self, config: &CircuitBreakerConfig) -> CircuitState {
        self.refresh(config);
        self.state
    }

    pub fn try_acquire(&mut self, config: &CircuitBreakerConfig) -> Result<(), Rejected> {
        self.refresh(config);

        match self.state {
            CircuitState::Closed => {
                config
                    .event_listeners
                    .emit(&CircuitBreakerEvent::CallPermitted {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                        state: self.state,
                    });
                Ok(())
            }
            CircuitState::Open => {
                let reopens_in_seconds = self.reopens_in_seconds(config);
                config
                    .event_listeners
                    .emit(&CircuitBreakerEvent::CallRejected {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                        state: self.state,
                    });
                Err(Rejected {
                    reopens_in_seconds,
                })
            }
            CircuitState::HalfOpen => {
                if self.half_open_inflight < config.half_open_max_calls {
                    self.half_open_inflight += 1;
                    config
                        .event_listeners
                        .emit(&CircuitBreakerEvent::CallPermitted {
                            pattern_name: config.name.clone(),
                            timestamp: Instant::now(),
                            state: self.state,
                        });
                    Ok(())
                } else {
                    config
                        .event_listeners
                        .emit(&CircuitBreakerEvent::CallRejected {
                            pattern_name: config.name.clone(),
                            timestamp: Instant::now(),
                            state: self.state,
                        });
                    Err(Rejected {
                        reopens_in_seconds: 1,
                    })
                }
            }
        }
    }

    fn reopens_in_seconds(&self, config: &CircuitBreakerConfig) -> u64 {
        let elapsed = self
            .opened_at
            .map(|t| t.elapsed())
            .unwrap_or(Duration::ZERO);
        config.timeout.saturating_sub(elapsed).as_secs()
    }

    pub fn record_success(&mut self, config: &CircuitBreakerConfig) {
        match self.state {
            CircuitState::HalfOpen => {
                self.half_open_inflight = self.half_open_inflight.saturating_sub(1);
                self.transition_to(CircuitState::Closed, config, None);
            }
            CircuitState::Closed => {
                self.prune(config.failure_window);
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&mut self, config: &CircuitBreakerConfig) {
        match self.state {
            CircuitState::HalfOpen => {
                self.half_open_inflight = self.half_open_inflight.saturating_sub(1);
                self.opened_at = Some(Instant::now());
                self.transition_to(CircuitState::Open, config, Some(config.timeout.as_secs()));
            }
            CircuitState::Closed => {
                self.prune(config.failure_window);
                self.failures.push_back(Instant::now());
                if self.failures.len() as u32 >= config.failure_threshold {
                    self.opened_at = Some(Instant::now());
                    self.transition_to(
                        CircuitState::Open,
                        config,
                        Some(config.timeout.as_secs()),
                    );
                }
            }
            CircuitState::Open => {}
        }
    }

    fn transition_to(
        &mut self,
        to_state: CircuitState,
        config: &CircuitBreakerConfig,
        reopens_in_seconds: Option<u64>,
    ) {
        if self.state == to_state {
            return;
        }
        let from_state = self.state;
        self.state = to_state;

        if to_state == CircuitState::Closed {
            self.failures.clear();
            self.opened_at = None;
        }

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::StateTransition {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                from_state,
                to_state,
                reopens_in_seconds,
            });

        #[cfg(feature = "tracing")]
        tracing::info!(
            breaker = %config.name,
            from = ?from_state,
            to = ?to_state,
            "circuit breaker state transition"
        );

        #[cfg(feature = "metrics")]
        metrics::counter!(
            "circuitbreaker_transitions_total",
            "circuitbreaker" => config.name.clone(),
            "to" => match to_state {
                CircuitState::Closed => "Closed",
                CircuitState::Open => "Open",
                CircuitState::HalfOpen => "HalfOpen",
            }
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_opens_after_threshold_failures() {
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(3)
            .build();
        let mut circuit = Circuit::new();

        for _ in 0..2 {
            circuit.try_acquire(&config).unwrap();
            circuit.record_failure(&config);
            assert_eq!(circuit.state(), CircuitState::Closed);
        }

        circuit.try_acquire(&config).unwrap();
        circuit.record_failure(&config);
        assert_eq!(circuit.state(), CircuitState::Open);
    }

    #[test]
    fn open_rejects_with_reopens_hint() {
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(1)
            .timeout(Duration::from_secs(60))
            .build();
        let mut circuit = Circuit::new();
        circuit.try_acquire(&config).unwrap();
        circuit.record_failure(&config);
        assert_eq!(circuit.state(), CircuitState::Open);

        let rejection = circuit.try_acquire(&config).unwrap_err();
        assert!(rejection.reopens_in_seconds <= 60);
    }

    #[test]
    fn open_transitions_to_half_open_after_timeout() {
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(1)
            .timeout(Duration::from_millis(10))
            .build();
        let mut circuit = Circuit::new();
        circuit.try_acquire(&config).unwrap();
        circuit.record_failure(&config);
        assert_eq!(circuit.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(15));
        circuit.try_acquire(&config).unwrap();
        assert_eq!(circuit.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn half_open_probe_success_closes_circuit() {
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(1)
            .timeout(Duration::from_millis(10))
            .build();
        let mut circuit = Circuit::new();
        circuit.try_acquire(&config).unwrap();
        circuit.record_failure(&config);
        std::thread::sleep(Duration::from_millis(15));
        circuit.try_acquire(&config).unwrap();
        assert_eq!(circuit.state(), CircuitState::HalfOpen);

        circuit.record_success(&config);
        assert_eq!(circuit.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_probe_failure_reopens_circuit() {
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(1)
            .timeout(Duration::from_millis(10))
            .build();
        let mut circuit = Circuit::new();
        circuit.try_acquire(&config).unwrap();
        circuit.record_failure(&config);
        std::thread::sleep(Duration::from_millis(15));
        circuit.try_acquire(&config).unwrap();
        assert_eq!(circuit.state(), CircuitState::HalfOpen);

        circuit.record_failure(&config);
        assert_eq!(circuit.state(), CircuitState::Open);
    }

    #[test]
    fn half_open_rejects_calls_beyond_max_in_flight() {
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(1)
            .timeout(Duration::from_millis(10))
            .half_open_max_calls(1)
            .build();
        let mut circuit = Circuit::new();
        circuit.try_acquire(&config).unwrap();
        circuit.record_failure(&config);
        std::thread::sleep(Duration::from_millis(15));

        circuit.try_acquire(&config).unwrap();
        let rejection = circuit.try_acquire(&config).unwrap_err();
        assert_eq!(rejection.reopens_in_seconds, 1);
    }

    #[test]
    fn failures_outside_window_are_pruned() {
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(2)
            .failure_window(Duration::from_millis(10))
            .build();
        let mut circuit = Circuit::new();

        circuit.try_acquire(&config).unwrap();
        circuit.record_failure(&config);
        assert_eq!(circuit.state(), CircuitState::Closed);

        std::thread::sleep(Duration::from_millis(15));

        circuit.try_acquire(&config).unwrap();
        circuit.record_failure(&config);
        // the first failure aged out of the window, so this is only the
        // first failure within the window — shouldn't trip yet.
        assert_eq!(circuit.state(), CircuitState::Closed);
    }
}
