use intel_core::events::ResilienceEvent;
use std::time::{Duration, Instant};

/// Events emitted by the retry engine (C3), independent of the process-wide
/// bus — these are synchronous callbacks for anyone embedding the engine
/// directly, analogous to `tower_resilience_retry::RetryEvent`.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// A retry attempt is about to be made.
    Retry {
        pattern_name: String,
        timestamp: Instant,
        attempt: u32,
        delay: Duration,
        is_rate_limit: bool,
    },
    /// The operation succeeded (either on first try or after retries).
    Success {
        pattern_name: String,
        timestamp: Instant,
        attempts: u32,
    },
    /// The operation failed after exhausting the relevant budget.
    Error {
        pattern_name: String,
        timestamp: Instant,
        attempts: u32,
    },
    /// An error occurred but was not retryable per §7 classification.
    IgnoredError {
        pattern_name: String,
        timestamp: Instant,
    },
    /// A retry was skipped because its budget (api or rate-limit) was exhausted.
    BudgetExhausted {
        pattern_name: String,
        timestamp: Instant,
        attempt: u32,
        is_rate_limit: bool,
    },
}

impl ResilienceEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "Retry",
            RetryEvent::Success { .. } => "Success",
            RetryEvent::Error { .. } => "Error",
            RetryEvent::IgnoredError { .. } => "IgnoredError",
            RetryEvent::BudgetExhausted { .. } => "BudgetExhausted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retry { timestamp, .. }
            | RetryEvent::Success { timestamp, .. }
            | RetryEvent::Error { timestamp, .. }
            | RetryEvent::IgnoredError { timestamp, .. }
            | RetryEvent::BudgetExhausted { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            RetryEvent::Retry { pattern_name, .. }
            | RetryEvent::Success { pattern_name, .. }
            | RetryEvent::Error { pattern_name, .. }
            | RetryEvent::IgnoredError { pattern_name, .. }
            | RetryEvent::BudgetExhausted { pattern_name, .. } => pattern_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_types() {
        let now = Instant::now();
        let retry = RetryEvent::Retry {
            pattern_name: "exa".to_string(),
            timestamp: now,
            attempt: 1,
            delay: Duration::from_secs(1),
            is_rate_limit: false,
        };
        assert_eq!(retry.event_type(), "Retry");
        assert_eq!(retry.pattern_name(), "exa");

        let success = RetryEvent::Success {
            pattern_name: "exa".to_string(),
            timestamp: now,
            attempts: 2,
        };
        assert_eq!(success.event_type(), "Success");
    }
}
