//! Text embedding client (C10, §4.8): produces fixed-width float vectors
//! for the knowledge store's HNSW index, under the same retry-inside-breaker
//! shape as the C7 source clients.
//!
//! ```no_run
//! use intel_embedder::Embedder;
//!
//! # async fn example() -> Result<(), intel_core::error::IntelError> {
//! let embedder = Embedder::new("jina-key");
//! let vector = embedder.embed("some text to embed").await?;
//! assert_eq!(vector.len(), intel_embedder::EMBEDDING_DIM);
//! # Ok(())
//! # }
//! ```

mod resilience;

use std::sync::Mutex;
use std::time::{Duration, Instant};

use intel_circuitbreaker::CircuitBreaker;
use intel_core::error::IntelError;
use intel_events::EventBus;
use intel_retry::RetryConfig;
use serde_json::json;

use resilience::{breaker_config, call, retry_after_seconds, retry_config, round2, truncate_err};

const EMBEDDING_API_BASE: &str = "https://api.jina.ai/v1";
const EMBEDDING_MODEL: &str = "jina-embeddings-v2-base-en";

/// Fixed output width every embedding must have (§4.8).
pub const EMBEDDING_DIM: usize = 768;

/// Cost attributed to each `embed` call (§4.8, mirrors source-client costing).
pub const COST_PER_EMBEDDING: f64 = 0.00002;

/// Produces `EMBEDDING_DIM`-float vectors, wrapping retry (C3) in a
/// circuit breaker (C4) keyed to the embedding service (§4.8).
pub struct Embedder {
    api_key: String,
    timeout: Duration,
    http: reqwest::Client,
    circuit_breaker: CircuitBreaker,
    retry_config: RetryConfig,
    rate_limited_until: Mutex<Instant>,
}

impl Embedder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_timeout(api_key, Duration::from_secs(15))
    }

    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_key: api_key.into(),
            timeout,
            http: reqwest::Client::new(),
            circuit_breaker: CircuitBreaker::new(breaker_config("jina")),
            retry_config: retry_config("jina"),
            rate_limited_until: Mutex::new(Instant::now()),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        Instant::now() < *self.rate_limited_until.lock().expect("rate_limited_until poisoned")
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    /// Embeds a single text string, returning an `EMBEDDING_DIM`-float
    /// vector. Fails with `Validation` if the service returns no embeddings
    /// or one of the wrong width.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, IntelError> {
        let bus = EventBus::global();
        let start = Instant::now();

        let result = call(
            &self.circuit_breaker,
            &self.retry_config,
            "intel.embedder",
            |_attempt| self.execute_embed(text),
        )
        .await;

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        match &result {
            Ok(vector) => {
                bus.emit(
                    "SourceQueried",
                    json!({
                        "source": "jina",
                        "status": "completed",
                        "latency_ms": round2(latency_ms),
                        "dimensions": vector.len(),
                        "cost_usd": COST_PER_EMBEDDING,
                    }),
                    "intel.embedder",
                    None,
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
                        "source": "jina",
                        "status": "failed",
                        "latency_ms": round2(latency_ms),
                        "error": truncate_err(err),
                    }),
                    "intel.embedder",
                    None,
                );
            }
        }

        result
    }

    async fn execute_embed(&self, text: &str) -> Result<Vec<f32>, IntelError> {
        let start = Instant::now();
        let response = self
            .http
            .post(format!("{EMBEDDING_API_BASE}/embeddings"))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .timeout(self.timeout)
            .json(&json!({
                "model": EMBEDDING_MODEL,
                "input": [text],
            }))
            .send()
            .await
            .map_err(|_e| {
                IntelError::api("intel.embedder", "jina", "/embeddings", None, start.elapsed().as_millis() as u64)
            })?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let status = response.status();

        if status.as_u16() == 429 {
            return Err(IntelError::rate_limit(
                "intel.embedder",
                "jina",
                retry_after_seconds(response.headers()),
            ));
        }

        if !status.is_success() {
            return Err(IntelError::api(
                "intel.embedder",
                "jina",
                "/embeddings",
                Some(status.as_u16()),
                elapsed_ms,
            ));
        }

        let data: serde_json::Value = response.json().await.map_err(|_e| {
            IntelError::api("intel.embedder", "jina", "/embeddings", Some(status.as_u16()), elapsed_ms)
        })?;

        parse_embedding(&data)
    }
}

fn parse_embedding(data: &serde_json::Value) -> Result<Vec<f32>, IntelError> {
    let embeddings = data
        .get("data")
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let Some(first) = embeddings.first() else {
        return Err(IntelError::validation(
            "intel.embedder",
            "data",
            "at least one embedding",
            "none",
            "Jina response contained no embeddings",
        ));
    };

    let vector: Vec<f32> = first
        .get("embedding")
        .and_then(|v| v.as_array())
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_f64())
        .map(|v| v as f32)
        .collect();

    if vector.len() != EMBEDDING_DIM {
        return Err(IntelError::validation(
            "intel.embedder",
            "embedding",
            format!("{EMBEDDING_DIM}-dim vector"),
            format!("{}-dim vector", vector.len()),
            "embedding dimension mismatch",
        ));
    }

    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector_of(len: usize) -> serde_json::Value {
        json!({
            "data": [{"embedding": vec![0.1_f64; len]}],
        })
    }

    #[test]
    fn parses_correctly_sized_embedding() {
        let vector = parse_embedding(&vector_of(EMBEDDING_DIM)).unwrap();
        assert_eq!(vector.len(), EMBEDDING_DIM);
    }

    #[test]
    fn rejects_wrong_dimension() {
        let err = parse_embedding(&vector_of(10)).unwrap_err();
        assert!(matches!(err, IntelError::Validation { .. }));
    }

    #[test]
    fn rejects_empty_data() {
        let err = parse_embedding(&json!({"data": []})).unwrap_err();
        assert!(matches!(err, IntelError::Validation { .. }));
    }

    #[tokio::test]
    async fn fresh_embedder_is_not_rate_limited() {
        let embedder = Embedder::new("test-key");
        assert!(!embedder.is_rate_limited());
    }
}
