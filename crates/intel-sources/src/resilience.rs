use std::future::Future;

use intel_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig};
use intel_core::error::IntelError;
use intel_events::EventBus;
use intel_retry::RetryConfig;
use reqwest::header::HeaderMap;
use serde_json::json;

/// Parses a `Retry-After` header as whole seconds, defaulting to 2s (§4.5
/// step 3) when absent or unparseable.
pub(crate) fn retry_after_seconds(headers: &HeaderMap) -> u64 {
    headers
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(2.0)
        .round() as u64
}

/// Builds the breaker every source client uses: defaults already match
/// §4.2 exactly, so only the name and the bus wiring vary per source. The
/// breaker crate stays free of an `intel-events` dependency (see its
/// `events` module doc), so the `CircuitBreakerStateChanged` envelope is
/// built here, at the one place that owns both the breaker and the bus.
pub(crate) fn breaker_config(service_name: &str) -> CircuitBreakerConfig {
    let service = service_name.to_string();
    CircuitBreakerConfig::builder()
        .name(service_name)
        .on_state_transition(move |from_state, to_state, reopens_in_seconds| {
            EventBus::global().emit(
                "CircuitBreakerStateChanged",
                json!({
                    "service": service,
                    "previous_state": format!("{from_state:?}"),
                    "state": format!("{to_state:?}"),
                    "reopens_in_seconds": reopens_in_seconds,
                }),
                format!("intel.{service}"),
                None,
            );
        })
        .build()
}

/// Retry defaults already match §4.1 exactly; only the name varies.
pub(crate) fn retry_config(service_name: &str) -> RetryConfig {
    RetryConfig::builder().name(service_name).build()
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub(crate) fn round6(v: f64) -> f64 {
    (v * 1_000_000.0).round() / 1_000_000.0
}

pub(crate) fn truncate_err(err: &IntelError) -> String {
    err.to_string().chars().take(200).collect()
}

/// Runs `attempt_fn` under the retry engine, the whole retrying operation in
/// turn gated by the circuit breaker (§4.5 step 2: "under the circuit
/// breaker, which wraps a retry around the HTTP post").
pub(crate) async fn call<F, Fut, T>(
    breaker: &CircuitBreaker,
    retry_config: &RetryConfig,
    source_module: &str,
    mut attempt_fn: F,
) -> Result<T, IntelError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, IntelError>>,
{
    breaker
        .call(source_module, || intel_retry::run(retry_config, &mut attempt_fn))
        .await
}
