use serde::{Deserialize, Serialize};

use intel_core::clock::Clock;
use intel_core::ids::new_id;

/// A persisted, embedded view of a gathered result (§3 `KnowledgeRecord`).
///
/// `embedding_vector` is empty on records returned from [`crate::KnowledgeStore::search_keyword`]
/// and [`crate::KnowledgeStore::search_semantic`] (§4.9 "embedding omitted to save bandwidth").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub id: String,
    pub query_id: String,
    pub correlation_id: String,
    pub merged_text: String,
    pub embedding_vector: Vec<f32>,
    pub source_names: Vec<String>,
    pub depth_used: String,
    pub total_cost_usd: f64,
    pub tags: Vec<String>,
    pub metadata: serde_json::Value,
    pub created_at: String,
}

impl KnowledgeRecord {
    /// Builds a fresh record with a generated id and current timestamp; the
    /// caller supplies everything §4.9 step 1-2 already determined.
    pub fn new(
        query_id: impl Into<String>,
        correlation_id: impl Into<String>,
        merged_text: impl Into<String>,
        embedding_vector: Vec<f32>,
        source_names: Vec<String>,
        depth_used: impl Into<String>,
        total_cost_usd: f64,
        tags: Vec<String>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: new_id(),
            query_id: query_id.into(),
            correlation_id: correlation_id.into(),
            merged_text: merged_text.into(),
            embedding_vector,
            source_names,
            depth_used: depth_used.into(),
            total_cost_usd,
            tags,
            metadata,
            created_at: Clock::now_iso(),
        }
    }
}
