//! The completion client (C13, §4.10): rotates across `Rotator`-selected
//! models, each behind its own circuit breaker.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use intel_circuitbreaker::CircuitBreaker;
use intel_core::error::IntelError;
use intel_events::EventBus;
use serde_json::json;

use crate::resilience::breaker_config;
use crate::rotator::Rotator;
use crate::types::{CompletionResult, CompletionUsage};

const OPENROUTER_BASE: &str = "https://openrouter.ai/api/v1";
const MAX_ATTEMPTS: u32 = 10;
const INNER_BACKOFFS: [Duration; 3] = [Duration::from_millis(500), Duration::from_secs(1), Duration::from_secs(2)];

/// Generates completions across a rotating model fleet, isolating each
/// model behind its own breaker so one model's outage doesn't starve the
/// others (§4.10 "Client").
pub struct CompletionClient {
    api_key: String,
    http: reqwest::Client,
    rotator: Arc<Rotator>,
    breakers: Mutex<HashMap<String, CircuitBreaker>>,
    max_tokens: u32,
}

impl CompletionClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_rotator(api_key, Arc::new(Rotator::new()))
    }

    pub fn with_rotator(api_key: impl Into<String>, rotator: Arc<Rotator>) -> Self {
        Self {
            api_key: api_key.into(),
            http: reqwest::Client::new(),
            rotator,
            breakers: Mutex::new(HashMap::new()),
            max_tokens: 4096,
        }
    }

    fn breaker_for(&self, model_id: &str) -> CircuitBreaker {
        let mut breakers = self.breakers.lock().expect("breakers mutex poisoned");
        breakers
            .entry(model_id.to_string())
            .or_insert_with(|| CircuitBreaker::new(breaker_config(model_id)))
            .clone()
    }

    /// Generates a completion for `prompt`, rotating across up to
    /// [`MAX_ATTEMPTS`] model picks (§4.10 `complete`).
    pub async fn complete(&self, prompt: &str, task_type: &str) -> Result<CompletionResult, IntelError> {
        let bus = EventBus::global();

        for _ in 0..MAX_ATTEMPTS {
            let model_id = self.rotator.next(task_type).await;
            let breaker = self.breaker_for(&model_id);

            let result = breaker
                .call("intel.completion", || self.execute_with_backoff(prompt, &model_id))
                .await;

            match result {
                Ok(completion) => {
                    bus.emit(
                        "CompletionGenerated",
                        json!({"model": completion.model, "usage": completion.usage}),
                        "intel.completion",
                        None,
                    );
                    return Ok(completion);
                }
                Err(err @ IntelError::RateLimit { .. }) | Err(err @ IntelError::CircuitOpen { .. }) => {
                    self.rotator.mark_rate_limited(&model_id);
                    bus.emit(
                        "RateLimitHit",
                        json!({"model": model_id, "error": err.to_string()}),
                        "intel.completion",
                        None,
                    );
                    bus.emit(
                        "ModelRotated",
                        json!({"previous_model": model_id}),
                        "intel.completion",
                        None,
                    );
                }
                Err(err @ IntelError::Configuration { .. }) | Err(err @ IntelError::Validation { .. }) => {
                    return Err(err);
                }
                Err(err) => {
                    bus.emit(
                        "ModelError",
                        json!({"model": model_id, "error": err.to_string()}),
                        "intel.completion",
                        None,
                    );
                }
            }
        }

        Err(IntelError::api(
            "intel.completion",
            "openrouter",
            "/chat/completions",
            None,
            0,
        ))
    }

    /// Retries `model_id` up to 3 times with fixed exponential-ish delays
    /// over non-rate-limit API errors (§4.10 "inner 3-step exponential
    /// backoff"); a rate-limit error always escapes immediately so the
    /// outer loop can rotate away from the model instead of waiting on it.
    async fn execute_with_backoff(&self, prompt: &str, model_id: &str) -> Result<CompletionResult, IntelError> {
        let mut delays = INNER_BACKOFFS.iter().copied().map(Some).chain(std::iter::once(None));
        loop {
            let delay = delays.next().expect("iterator never exhausts before a branch returns");
            match self.make_request(prompt, model_id).await {
                Ok(result) => return Ok(result),
                Err(err @ IntelError::RateLimit { .. })
                | Err(err @ IntelError::Configuration { .. })
                | Err(err @ IntelError::Validation { .. }) => return Err(err),
                Err(err) => match delay {
                    Some(d) => tokio::time::sleep(d).await,
                    None => return Err(err),
                },
            }
        }
    }

    async fn make_request(&self, prompt: &str, model_id: &str) -> Result<CompletionResult, IntelError> {
        if self.api_key.is_empty() {
            return Err(IntelError::configuration("intel.completion", "OPENROUTER_API_KEY not found"));
        }

        let start = Instant::now();
        let response = self
            .http
            .post(format!("{OPENROUTER_BASE}/chat/completions"))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", "https://intel.platform")
            .header("X-Title", "Intel Gathering Core")
            .header("Content-Type", "application/json")
            .timeout(Duration::from_secs(30))
            .json(&json!({
                "model": model_id,
                "messages": [{"role": "user", "content": prompt}],
                "max_tokens": self.max_tokens,
            }))
            .send()
            .await
            .map_err(|_e| {
                IntelError::api(
                    "intel.completion",
                    "openrouter",
                    "/chat/completions",
                    None,
                    start.elapsed().as_millis() as u64,
                )
            })?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(5.0)
                .round() as u64;
            return Err(IntelError::rate_limit("intel.completion", "openrouter", retry_after));
        }

        if !status.is_success() {
            return Err(IntelError::api(
                "intel.completion",
                "openrouter",
                "/chat/completions",
                Some(status.as_u16()),
                elapsed_ms,
            ));
        }

        let data: serde_json::Value = response.json().await.map_err(|_e| {
            IntelError::api(
                "intel.completion",
                "openrouter",
                "/chat/completions",
                Some(status.as_u16()),
                elapsed_ms,
            )
        })?;

        parse_response(&data, model_id)
    }
}

fn parse_response(data: &serde_json::Value, model_id: &str) -> Result<CompletionResult, IntelError> {
    let content = data
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|v| v.as_str());

    let Some(content) = content else {
        return Err(IntelError::validation(
            "intel.completion",
            "choices",
            "at least one choice with message.content",
            "none",
            "OpenRouter response missing choices",
        ));
    };

    let usage_data = data.get("usage").cloned().unwrap_or_else(|| json!({}));
    let usage = CompletionUsage {
        prompt_tokens: usage_data.get("prompt_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        completion_tokens: usage_data.get("completion_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        total_tokens: usage_data.get("total_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        cost: 0.0,
    };

    Ok(CompletionResult {
        content: content.to_string(),
        model: model_id.to_string(),
        usage,
        metadata: data.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_content_and_usage() {
        let data = json!({
            "choices": [{"message": {"content": "hello there"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15},
        });
        let result = parse_response(&data, "test-model").unwrap();
        assert_eq!(result.content, "hello there");
        assert_eq!(result.model, "test-model");
        assert_eq!(result.usage.total_tokens, 15);
    }

    #[test]
    fn missing_choices_is_validation_error() {
        let err = parse_response(&json!({}), "test-model").unwrap_err();
        assert!(matches!(err, IntelError::Validation { .. }));
    }

    #[tokio::test]
    async fn empty_api_key_is_a_configuration_error_not_retried() {
        let client = CompletionClient::new("");
        let err = client.make_request("hello", "test-model").await.unwrap_err();
        assert!(matches!(err, IntelError::Configuration { .. }));
    }
}
