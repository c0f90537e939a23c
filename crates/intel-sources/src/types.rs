use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single per-source search result, before it's folded into a `Source`
/// contribution by the orchestrator (§3 `SearchHit`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: Option<String>,
    pub title: String,
    pub snippet: String,
    pub relevance_score: f64,
    pub source_name: String,
    pub raw_data: Value,
}

/// The result of scraping a single page (§3 `ScrapedPage`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub url: String,
    pub title: String,
    pub content: String,
    pub markdown: String,
    pub metadata: HashMap<String, Value>,
    pub cost_usd: f64,
    pub latency_ms: f64,
}
