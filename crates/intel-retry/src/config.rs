use intel_core::events::{EventListeners, FnListener};
use std::time::Duration;

use crate::events::RetryEvent;

/// Configuration for the dual-budget retry engine (§4.1).
///
/// Two independent counters are tracked per call to [`crate::run`]: attempts
/// consumed by rate-limit failures and attempts consumed by everything else
/// retryable. Each has its own budget so a single transient 5xx can't starve
/// the retries a subsequent 429 would need, and vice versa.
pub struct RetryConfig {
    pub(crate) api_budget: u32,
    pub(crate) rate_limit_budget: u32,
    pub(crate) rl_base: Duration,
    pub(crate) rl_max: Duration,
    pub(crate) base: Duration,
    pub(crate) max: Duration,
    pub(crate) jitter: bool,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryConfig {
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder {
    api_budget: u32,
    rate_limit_budget: u32,
    rl_base: Duration,
    rl_max: Duration,
    base: Duration,
    max: Duration,
    jitter: bool,
    name: String,
    event_listeners: EventListeners<RetryEvent>,
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfigBuilder {
    /// Defaults per §4.1: `api_budget=3`, `rate_limit_budget=5`,
    /// `rl_base=2s`, `rl_max=32s`, `base=1s`, `max=30s`, jitter enabled.
    pub fn new() -> Self {
        Self {
            api_budget: 3,
            rate_limit_budget: 5,
            rl_base: Duration::from_secs(2),
            rl_max: Duration::from_secs(32),
            base: Duration::from_secs(1),
            max: Duration::from_secs(30),
            jitter: true,
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    pub fn api_budget(mut self, budget: u32) -> Self {
        self.api_budget = budget;
        self
    }

    pub fn rate_limit_budget(mut self, budget: u32) -> Self {
        self.rate_limit_budget = budget;
        self
    }

    pub fn rl_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.rl_base = base;
        self.rl_max = max;
        self
    }

    pub fn backoff(mut self, base: Duration, max: Duration) -> Self {
        self.base = base;
        self.max = max;
        self
    }

    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, Duration, bool) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Retry {
                attempt,
                delay,
                is_rate_limit,
                ..
            } = event
            {
                f(*attempt, *delay, *is_rate_limit);
            }
        }));
        self
    }

    pub fn build(self) -> RetryConfig {
        RetryConfig {
            api_budget: self.api_budget,
            rate_limit_budget: self.rate_limit_budget,
            rl_base: self.rl_base,
            rl_max: self.rl_max,
            base: self.base,
            max: self.max,
            jitter: self.jitter,
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
        let cfg = RetryConfig::default();
        assert_eq!(cfg.api_budget, 3);
        assert_eq!(cfg.rate_limit_budget, 5);
        assert_eq!(cfg.rl_base, Duration::from_secs(2));
        assert_eq!(cfg.rl_max, Duration::from_secs(32));
        assert_eq!(cfg.base, Duration::from_secs(1));
        assert_eq!(cfg.max, Duration::from_secs(30));
        assert!(cfg.jitter);
    }
}
