use std::time::Duration;

use intel_core::events::{EventListeners, FnListener};

use crate::circuit::CircuitState;
use crate::events::CircuitBreakerEvent;

/// Configuration for a per-service breaker (§4.2).
pub struct CircuitBreakerConfig {
    pub(crate) failure_threshold: u32,
    pub(crate) timeout: Duration,
    pub(crate) half_open_max_calls: u32,
    pub(crate) failure_window: Duration,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CircuitBreakerConfig {
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }
}

/// Builder for [`CircuitBreakerConfig`].
pub struct CircuitBreakerConfigBuilder {
    failure_threshold: u32,
    timeout: Duration,
    half_open_max_calls: u32,
    failure_window: Duration,
    name: String,
    event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreakerConfigBuilder {
    /// Defaults per §4.2: `failure_threshold=3`, `timeout=60s`,
    /// `half_open_max_calls=1`, `failure_window=60s`.
    pub fn new() -> Self {
        Self {
            failure_threshold: 3,
            timeout: Duration::from_secs(60),
            half_open_max_calls: 1,
            failure_window: Duration::from_secs(60),
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn half_open_max_calls(mut self, n: u32) -> Self {
        self.half_open_max_calls = n;
        self
    }

    pub fn failure_window(mut self, window: Duration) -> Self {
        self.failure_window = window;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Register a callback for state transitions, mirroring the teacher's
    /// `on_state_transition` builder hook.
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState, Option<u64>) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CircuitBreakerEvent::StateTransition {
                from_state,
                to_state,
                reopens_in_seconds,
                ..
            } = event
            {
                f(*from_state, *to_state, *reopens_in_seconds);
            }
        }));
        self
    }

    pub fn build(self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            timeout: self.timeout,
            half_open_max_calls: self.half_open_max_calls,
            failure_window: self.failure_window,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = CircuitBreakerConfig::default();
        assert_eq!(cfg.failure_threshold, 3);
        assert_eq!(cfg.timeout, Duration::from_secs(60));
        assert_eq!(cfg.half_open_max_calls, 1);
        assert_eq!(cfg.failure_window, Duration::from_secs(60));
    }
}
