use serde::{Deserialize, Serialize};

use intel_core::clock::Clock;
use intel_core::error::IntelError;
use intel_core::ids::{correlation_id, new_id};

/// Tier of intelligence gathering (§3, GLOSSARY "Depth").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    Shallow,
    Standard,
    Deep,
}

impl Depth {
    /// String form used in the cache key (§4.6 "text + depth_as_string").
    pub fn as_str(&self) -> &'static str {
        match self {
            Depth::Shallow => "shallow",
            Depth::Standard => "standard",
            Depth::Deep => "deep",
        }
    }
}

/// An intelligence-gathering request (§3 `Query`). Immutable once built.
#[derive(Debug, Clone)]
pub struct Query {
    pub query_id: String,
    pub text: String,
    pub depth: Depth,
    pub max_sources: u32,
    pub cache_ttl_seconds: Option<u64>,
    pub correlation_id: String,
    pub timestamp: String,
}

impl Query {
    /// Builds a query with `depth` and every other field defaulted
    /// (`max_sources=10`, a generated `query_id`/`correlation_id`).
    /// Fails validation if `text` is empty after trimming.
    pub fn new(text: impl Into<String>, depth: Depth) -> Result<Self, IntelError> {
        QueryBuilder::new(text, depth).build()
    }

    pub fn builder(text: impl Into<String>, depth: Depth) -> QueryBuilder {
        QueryBuilder::new(text, depth)
    }
}

pub struct QueryBuilder {
    text: String,
    depth: Depth,
    max_sources: u32,
    cache_ttl_seconds: Option<u64>,
    correlation_id: Option<String>,
    query_id: Option<String>,
}

impl QueryBuilder {
    pub fn new(text: impl Into<String>, depth: Depth) -> Self {
        Self {
            text: text.into(),
            depth,
            max_sources: 10,
            cache_ttl_seconds: None,
            correlation_id: None,
            query_id: None,
        }
    }

    pub fn max_sources(mut self, max_sources: u32) -> Self {
        self.max_sources = max_sources;
        self
    }

    pub fn cache_ttl_seconds(mut self, ttl: u64) -> Self {
        self.cache_ttl_seconds = Some(ttl);
        self
    }

    pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn query_id(mut self, query_id: impl Into<String>) -> Self {
        self.query_id = Some(query_id.into());
        self
    }

    pub fn build(self) -> Result<Query, IntelError> {
        if self.text.trim().is_empty() {
            return Err(IntelError::validation(
                "intel.orchestrator",
                "text",
                "non-empty string",
                "empty",
                "Query.text must be non-empty",
            ));
        }
        if self.max_sources == 0 {
            return Err(IntelError::validation(
                "intel.orchestrator",
                "max_sources",
                "positive integer",
                "0",
                "Query.max_sources must be positive",
            ));
        }
        Ok(Query {
            query_id: self.query_id.unwrap_or_else(new_id),
            text: self.text,
            depth: self.depth,
            max_sources: self.max_sources,
            cache_ttl_seconds: self.cache_ttl_seconds,
            correlation_id: self.correlation_id.unwrap_or_else(correlation_id),
            timestamp: Clock::now_iso(),
        })
    }
}

/// A single source's contribution to a [`GatherResult`] (§3 `Source`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub source_name: String,
    pub url: Option<String>,
    pub title: String,
    pub snippet: String,
    pub relevance_score: f64,
    pub cost_usd: f64,
    pub latency_ms: f64,
}

/// The outcome of a `gather_intel` call (§3 `Result`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatherResult {
    pub query_id: String,
    pub correlation_id: String,
    pub sources: Vec<Source>,
    pub merged_text: String,
    pub depth_used: Depth,
    pub total_cost_usd: f64,
    pub latency_ms: f64,
    pub timestamp: String,
    pub cached: bool,
    pub embeddings: Option<Vec<f32>>,
}

/// Accepted inputs to `gather_intel` — a bare string becomes a fresh
/// [`Query`] at the caller-supplied depth, a [`Query`] is taken as-is (§4.7
/// step 1).
pub enum QueryInput {
    Text(String),
    Query(Query),
}

impl From<&str> for QueryInput {
    fn from(text: &str) -> Self {
        QueryInput::Text(text.to_string())
    }
}

impl From<String> for QueryInput {
    fn from(text: String) -> Self {
        QueryInput::Text(text)
    }
}

impl From<Query> for QueryInput {
    fn from(query: Query) -> Self {
        QueryInput::Query(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_spec() {
        let query = Query::new("bitcoin etf", Depth::Standard).unwrap();
        assert_eq!(query.max_sources, 10);
        assert!(query.correlation_id.starts_with("req-"));
    }

    #[test]
    fn empty_text_is_rejected() {
        let err = Query::new("   ", Depth::Standard).unwrap_err();
        assert!(matches!(err, IntelError::Validation { .. }));
    }

    #[test]
    fn depth_as_str_matches_cache_key_namespace() {
        assert_eq!(Depth::Shallow.as_str(), "shallow");
        assert_eq!(Depth::Standard.as_str(), "standard");
        assert_eq!(Depth::Deep.as_str(), "deep");
    }
}
