//! Exa.ai neural search (§4.5 "Neural search").

use std::sync::Mutex;
use std::time::{Duration, Instant};

use intel_circuitbreaker::CircuitBreaker;
use intel_core::error::IntelError;
use intel_events::EventBus;
use intel_retry::RetryConfig;
use serde_json::json;

use crate::resilience::{breaker_config, call, retry_after_seconds, retry_config, round2, round6, truncate_err};
use crate::types::SearchHit;

const EXA_API_BASE: &str = "https://api.exa.ai";

/// Cost attributed to each returned hit (§4.5 "Neural search").
pub const COST_PER_RESULT: f64 = 0.0005;

/// Neural/semantic web search via the Exa API (§4.5).
pub struct ExaSource {
    api_key: String,
    timeout: Duration,
    http: reqwest::Client,
    circuit_breaker: CircuitBreaker,
    retry_config: RetryConfig,
    rate_limited_until: Mutex<Instant>,
}

impl ExaSource {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_timeout(api_key, Duration::from_secs(15))
    }

    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_key: api_key.into(),
            timeout,
            http: reqwest::Client::new(),
            circuit_breaker: CircuitBreaker::new(breaker_config("exa")),
            retry_config: retry_config("exa"),
            rate_limited_until: Mutex::new(Instant::now()),
        }
    }

    /// True while a prior 429 hasn't yet cleared its retry window (§4.5 step 6).
    pub fn is_rate_limited(&self) -> bool {
        Instant::now() < *self.rate_limited_until.lock().expect("rate_limited_until poisoned")
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    /// Semantically searches Exa for `query`, requesting `num_results` hits.
    pub async fn search(
        &self,
        query: &str,
        num_results: u32,
        correlation_id: Option<String>,
    ) -> Result<Vec<SearchHit>, IntelError> {
        let bus = EventBus::global();
        let truncated: String = query.chars().take(100).collect();
        bus.emit(
            "source_querying",
            json!({
                "source_name": "exa",
                "status": "started",
                "query": truncated,
                "num_results": num_results,
            }),
            "intel.exa",
            correlation_id.clone(),
        );

        let start = Instant::now();
        let result = call(
            &self.circuit_breaker,
            &self.retry_config,
            "intel.exa",
            |_attempt| self.execute_search(query, num_results),
        )
        .await;

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        match &result {
            Ok(hits) => {
                bus.emit(
                    "SourceQueried",
                    json!({
                        "source": "exa",
                        "status": "completed",
                        "latency_ms": round2(latency_ms),
                        "result_count": hits.len(),
                        "cost_usd": round6(hits.len() as f64 * COST_PER_RESULT),
                    }),
                    "intel.exa",
                    correlation_id.clone(),
                );
            }
            Err(err) => {
                if let IntelError::RateLimit {
                    retry_after_seconds,
                    ..
                } = err
                {
                    let window = Duration::from_secs((*retry_after_seconds).max(60));
                    *self.rate_limited_until.lock().expect("rate_limited_until poisoned") =
                        Instant::now() + window;
                }
                bus.emit(
                    "SourceQueried",
                    json!({
                        "source": "exa",
                        "status": "failed",
                        "latency_ms": round2(latency_ms),
                        "error": truncate_err(err),
                    }),
                    "intel.exa",
                    correlation_id,
                );
            }
        }

        result
    }

    async fn execute_search(&self, query: &str, num_results: u32) -> Result<Vec<SearchHit>, IntelError> {
        let start = Instant::now();
        let response = self
            .http
            .post(format!("{EXA_API_BASE}/search"))
            .header("x-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .timeout(self.timeout)
            .json(&json!({
                "query": query,
                "numResults": num_results,
                "useAutoprompt": true,
                "type": "neural",
                "contents": {
                    "text": {"maxCharacters": 1000},
                    "highlights": true,
                },
            }))
            .send()
            .await
            .map_err(|_e| IntelError::api("intel.exa", "exa", "/search", None, start.elapsed().as_millis() as u64))?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let status = response.status();

        if status.as_u16() == 429 {
            return Err(IntelError::rate_limit(
                "intel.exa",
                "exa",
                retry_after_seconds(response.headers()),
            ));
        }

        if !status.is_success() {
            return Err(IntelError::api(
                "intel.exa",
                "exa",
                "/search",
                Some(status.as_u16()),
                elapsed_ms,
            ));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|_e| IntelError::api("intel.exa", "exa", "/search", Some(status.as_u16()), elapsed_ms))?;

        Ok(parse_results(&data))
    }
}

fn parse_results(data: &serde_json::Value) -> Vec<SearchHit> {
    data.get("results")
        .and_then(|v| v.as_array())
        .into_iter()
        .flatten()
        .map(|item| {
            let text = item
                .get("text")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .or_else(|| {
                    item.get("highlights")
                        .and_then(|v| v.as_array())
                        .map(|highlights| {
                            highlights
                                .iter()
                                .filter_map(|h| h.as_str())
                                .collect::<Vec<_>>()
                                .join(" ")
                        })
                        .filter(|joined| !joined.is_empty())
                })
                .unwrap_or_default();

            let title = item
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();

            let snippet: String = if text.is_empty() {
                title.clone()
            } else {
                text.chars().take(500).collect()
            };

            SearchHit {
                url: item.get("url").and_then(|v| v.as_str()).map(str::to_string),
                title,
                snippet,
                relevance_score: item.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0),
                source_name: "exa".to_string(),
                raw_data: item.clone(),
            }
        })
        .collect()
}
