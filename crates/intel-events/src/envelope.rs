use intel_core::{clock::Clock, ids::new_id};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The cross-module lifecycle event (§3 `EventEnvelope`).
///
/// Every module that wants to announce something process-wide (a breaker
/// transition, a cache hit, an orchestrator stage completing) builds one of
/// these through [`crate::EventBus::emit`] rather than constructing it
/// directly, so `event_id`/`timestamp` stay consistent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: String,
    pub event_type: String,
    pub timestamp: String,
    pub source_module: String,
    pub correlation_id: Option<String>,
    pub payload: Value,
}

impl EventEnvelope {
    pub(crate) fn new(
        event_type: impl Into<String>,
        payload: Value,
        source_module: impl Into<String>,
        correlation_id: Option<String>,
    ) -> Self {
        Self {
            event_id: new_id(),
            event_type: event_type.into(),
            timestamp: Clock::now_iso(),
            source_module: source_module.into(),
            correlation_id,
            payload,
        }
    }
}
