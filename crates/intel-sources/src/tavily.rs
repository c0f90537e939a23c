//! Tavily news/general search (§4.5 "News search").

use std::sync::Mutex;
use std::time::{Duration, Instant};

use intel_circuitbreaker::CircuitBreaker;
use intel_core::error::IntelError;
use intel_events::EventBus;
use intel_retry::RetryConfig;
use serde_json::json;

use crate::resilience::{breaker_config, call, retry_after_seconds, retry_config, round2, truncate_err};
use crate::types::SearchHit;

const TAVILY_API_BASE: &str = "https://api.tavily.com";
const COST_PER_SEARCH: f64 = 0.01;

/// News/general web search via the Tavily API (§4.5).
pub struct TavilySource {
    api_key: String,
    timeout: Duration,
    http: reqwest::Client,
    circuit_breaker: CircuitBreaker,
    retry_config: RetryConfig,
    rate_limited_until: Mutex<Instant>,
}

impl TavilySource {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_timeout(api_key, Duration::from_secs(15))
    }

    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_key: api_key.into(),
            timeout,
            http: reqwest::Client::new(),
            circuit_breaker: CircuitBreaker::new(breaker_config("tavily")),
            retry_config: retry_config("tavily"),
            rate_limited_until: Mutex::new(Instant::now()),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        Instant::now() < *self.rate_limited_until.lock().expect("rate_limited_until poisoned")
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    /// Searches Tavily for news/general results. The flat `$0.01` per-search
    /// fee is distributed evenly across the returned `SearchHit`s (each
    /// getting `COST_PER_SEARCH / max(count, 1)` attached via
    /// [`per_result_cost`]) so that summing every `Source.cost_usd` derived
    /// from one call reconstructs the flat fee (§4.5, §3 `Result` invariant).
    pub async fn search(
        &self,
        query: &str,
        max_results: u32,
        correlation_id: Option<String>,
    ) -> Result<Vec<SearchHit>, IntelError> {
        let bus = EventBus::global();
        let truncated: String = query.chars().take(100).collect();
        bus.emit(
            "source_querying",
            json!({
                "source_name": "tavily",
                "status": "started",
                "query": truncated,
                "max_results": max_results,
            }),
            "intel.tavily",
            correlation_id.clone(),
        );

        let start = Instant::now();
        let result = call(
            &self.circuit_breaker,
            &self.retry_config,
            "intel.tavily",
            |_attempt| self.execute_search(query, max_results),
        )
        .await;

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        match &result {
            Ok(hits) => {
                bus.emit(
                    "SourceQueried",
                    json!({
                        "source": "tavily",
                        "status": "completed",
                        "latency_ms": round2(latency_ms),
                        "result_count": hits.len(),
                        "cost_usd": COST_PER_SEARCH,
                    }),
                    "intel.tavily",
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
                        "source": "tavily",
                        "status": "failed",
                        "latency_ms": round2(latency_ms),
                        "error": truncate_err(err),
                    }),
                    "intel.tavily",
                    correlation_id,
                );
            }
        }

        result
    }

    async fn execute_search(&self, query: &str, max_results: u32) -> Result<Vec<SearchHit>, IntelError> {
        let start = Instant::now();
        let response = self
            .http
            .post(format!("{TAVILY_API_BASE}/search"))
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .timeout(self.timeout)
            .json(&json!({
                "api_key": self.api_key,
                "query": query,
                "max_results": max_results,
                "search_depth": "advanced",
                "include_answer": true,
                "include_raw_content": false,
            }))
            .send()
            .await
            .map_err(|_e| IntelError::api("intel.tavily", "tavily", "/search", None, start.elapsed().as_millis() as u64))?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let status = response.status();

        if status.as_u16() == 429 {
            return Err(IntelError::rate_limit(
                "intel.tavily",
                "tavily",
                retry_after_seconds(response.headers()),
            ));
        }

        if !status.is_success() {
            return Err(IntelError::api(
                "intel.tavily",
                "tavily",
                "/search",
                Some(status.as_u16()),
                elapsed_ms,
            ));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|_e| IntelError::api("intel.tavily", "tavily", "/search", Some(status.as_u16()), elapsed_ms))?;

        Ok(parse_results(&data))
    }
}

/// Evenly splits the flat `$0.01` search fee across `result_count` hits
/// (§4.5: "distributed evenly across returned results, divide by
/// max(count,1)").
pub fn per_result_cost(result_count: usize) -> f64 {
    COST_PER_SEARCH / result_count.max(1) as f64
}

fn parse_results(data: &serde_json::Value) -> Vec<SearchHit> {
    data.get("results")
        .and_then(|v| v.as_array())
        .into_iter()
        .flatten()
        .map(|item| {
            let content = item.get("content").and_then(|v| v.as_str()).unwrap_or_default();
            SearchHit {
                url: item.get("url").and_then(|v| v.as_str()).map(str::to_string),
                title: item.get("title").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                snippet: content.chars().take(500).collect(),
                relevance_score: item.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0),
                source_name: "tavily".to_string(),
                raw_data: item.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_content_as_snippet() {
        let data = json!({
            "results": [
                {"url": "https://a.example", "title": "A", "content": "news body", "score": 0.7},
            ]
        });
        let hits = parse_results(&data);
        assert_eq!(hits[0].snippet, "news body");
    }

    #[test]
    fn per_result_cost_sums_to_flat_fee() {
        let count = 4;
        let total: f64 = (0..count).map(|_| per_result_cost(count)).sum();
        assert!((total - COST_PER_SEARCH).abs() < 1e-9);
    }

    #[test]
    fn per_result_cost_handles_zero_results() {
        assert_eq!(per_result_cost(0), COST_PER_SEARCH);
    }

    #[tokio::test]
    async fn fresh_source_is_not_rate_limited() {
        let source = TavilySource::new("test-key");
        assert!(!source.is_rate_limited());
    }
}
