use intel_core::events::ResilienceEvent;
use std::time::Instant;

use crate::circuit::CircuitState;

/// Events emitted by a breaker (C4), independent of the process-wide bus —
/// these are synchronous callbacks for anyone embedding the breaker
/// directly, analogous to `tower_resilience_circuitbreaker::CircuitBreakerEvent`.
/// The process-wide `CircuitBreakerStateChanged` envelope (§4.2, §4.3) is
/// built from [`CircuitBreakerEvent::StateTransition`] by whoever wires a
/// breaker to the bus (`intel-orchestrator`), not by this crate directly —
/// keeping the breaker itself free of a dependency on `intel-events`.
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// The breaker moved from one state to another.
    StateTransition {
        pattern_name: String,
        timestamp: Instant,
        from_state: CircuitState,
        to_state: CircuitState,
        reopens_in_seconds: Option<u64>,
    },
    /// A call was allowed through.
    CallPermitted {
        pattern_name: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// A call was rejected because the breaker is open (or half-open and full).
    CallRejected {
        pattern_name: String,
        timestamp: Instant,
        state: CircuitState,
    },
}

impl ResilienceEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::StateTransition { .. } => "StateTransition",
            CircuitBreakerEvent::CallPermitted { .. } => "CallPermitted",
            CircuitBreakerEvent::CallRejected { .. } => "CallRejected",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::StateTransition { timestamp, .. }
            | CircuitBreakerEvent::CallPermitted { timestamp, .. }
            | CircuitBreakerEvent::CallRejected { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            CircuitBreakerEvent::StateTransition { pattern_name, .. }
            | CircuitBreakerEvent::CallPermitted { pattern_name, .. }
            | CircuitBreakerEvent::CallRejected { pattern_name, .. } => pattern_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_types() {
        let now = Instant::now();
        let transition = CircuitBreakerEvent::StateTransition {
            pattern_name: "exa".to_string(),
            timestamp: now,
            from_state: CircuitState::Closed,
            to_state: CircuitState::Open,
            reopens_in_seconds: Some(60),
        };
        assert_eq!(transition.event_type(), "StateTransition");
        assert_eq!(transition.pattern_name(), "exa");
    }
}
