use std::time::Duration;

use intel_circuitbreaker::CircuitBreakerConfig;
use intel_events::EventBus;
use serde_json::json;

/// Per-model breaker config (§4.10 "configured with a shorter failure
/// window, default 30s"); every other default matches §4.2.
pub(crate) fn breaker_config(model_id: &str) -> CircuitBreakerConfig {
    let service = model_id.to_string();
    CircuitBreakerConfig::builder()
        .name(model_id)
        .failure_window(Duration::from_secs(30))
        .on_state_transition(move |from_state, to_state, reopens_in_seconds| {
            EventBus::global().emit(
                "CircuitBreakerStateChanged",
                json!({
                    "service": service,
                    "previous_state": format!("{from_state:?}"),
                    "state": format!("{to_state:?}"),
                    "reopens_in_seconds": reopens_in_seconds,
                }),
                "intel.completion",
                None,
            );
        })
        .build()
}
