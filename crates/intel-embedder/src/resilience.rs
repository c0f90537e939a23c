use std::future::Future;

use intel_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig};
use intel_core::error::IntelError;
use intel_events::EventBus;
use intel_retry::RetryConfig;
use reqwest::header::HeaderMap;
use serde_json::json;

/// Parses a `Retry-After` header as whole seconds, defaulting to 2s when
/// absent or unparseable (mirrors the source clients' rule, §4.5 step 3).
pub(crate) fn retry_after_seconds(headers: &HeaderMap) -> u64 {
    headers
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(2.0)
        .round() as u64
}

/// Breaker defaults already match §4.2 exactly; only the name and bus wiring
/// vary. Kept local to this crate rather than depending on `intel-sources`,
/// since the breaker crate itself stays free of an `intel-events` dependency.
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

pub(crate) fn retry_config(service_name: &str) -> RetryConfig {
    RetryConfig::builder().name(service_name).build()
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub(crate) fn truncate_err(err: &IntelError) -> String {
    err.to_string().chars().take(200).collect()
}

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
