//! Knowledge store (C11, §4.9): a hash-based document store over Redis
//! Stack, indexed for both full-text and approximate-nearest-neighbor
//! vector search.
//!
//! ```no_run
//! use intel_embedder::Embedder;
//! use intel_knowledge::{KnowledgeConfig, KnowledgeStore};
//!
//! # async fn example() -> Result<(), intel_core::error::IntelError> {
//! let store = KnowledgeStore::new(KnowledgeConfig::builder().build(), Embedder::new("jina-key"));
//! let record = store.export("query_id", "req-abc", "merged text", vec![], 0.0, None, None).await?;
//! let hits = store.search_keyword("merged", 10, None).await;
//! let semantic = store.search_semantic("merged", 10).await;
//! # let _ = (record, hits, semantic);
//! # Ok(())
//! # }
//! ```

mod codec;
mod config;
mod index;
mod query;
mod record;
mod reply;

pub use config::{KnowledgeConfig, KnowledgeConfigBuilder};
pub use record::KnowledgeRecord;

use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::OnceCell;

use intel_core::error::IntelError;
use intel_embedder::Embedder;

use codec::{from_hash_fields, to_hash_fields};
use query::{keyword_query, knn_query};
use reply::parse_search_reply;

/// Persists gathered intel as searchable [`KnowledgeRecord`]s (§4.9).
///
/// Cheap to clone; the Redis connection and index creation are both lazy and
/// idempotent, happening on first use.
#[derive(Clone)]
pub struct KnowledgeStore {
    config: Arc<KnowledgeConfig>,
    embedder: Arc<Embedder>,
    connection: Arc<OnceCell<ConnectionManager>>,
}

impl KnowledgeStore {
    pub fn new(config: KnowledgeConfig, embedder: Embedder) -> Self {
        Self {
            config: Arc::new(config),
            embedder: Arc::new(embedder),
            connection: Arc::new(OnceCell::new()),
        }
    }

    async fn connection(&self) -> Result<ConnectionManager, IntelError> {
        let config = self.config.clone();
        self.connection
            .get_or_try_init(move || async move {
                let client = redis::Client::open(config.redis_url.as_str()).map_err(|e| {
                    IntelError::configuration(config.name.clone(), format!("invalid redis url: {e}"))
                })?;
                let mut conn = client
                    .get_connection_manager()
                    .await
                    .map_err(|e| IntelError::api(config.name.clone(), "redis", "connect", None, 0).with_cause(&e))?;
                index::ensure_index(&mut conn, &config.index_name, &config.prefix, &config.name).await?;
                Ok(conn)
            })
            .await
            .cloned()
    }

    /// Persists `merged_text` (falling back to `fallback_snippets` joined by
    /// newlines when it's empty after trim) as an embedded [`KnowledgeRecord`]
    /// (§4.9 `export` steps 1-3).
    #[allow(clippy::too_many_arguments)]
    pub async fn export(
        &self,
        query_id: impl Into<String>,
        correlation_id: impl Into<String>,
        merged_text: &str,
        source_names: Vec<String>,
        total_cost_usd: f64,
        tags: Option<Vec<String>>,
        metadata: Option<serde_json::Value>,
    ) -> Result<KnowledgeRecord, IntelError> {
        self.export_with_depth(
            query_id,
            correlation_id,
            merged_text,
            source_names,
            "standard",
            total_cost_usd,
            tags,
            metadata,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn export_with_depth(
        &self,
        query_id: impl Into<String>,
        correlation_id: impl Into<String>,
        merged_text: &str,
        source_names: Vec<String>,
        depth_used: impl Into<String>,
        total_cost_usd: f64,
        tags: Option<Vec<String>>,
        metadata: Option<serde_json::Value>,
    ) -> Result<KnowledgeRecord, IntelError> {
        let text = merged_text.trim();
        let resolved_text = if text.is_empty() {
            return Err(IntelError::validation(
                self.config.name.clone(),
                "merged_text",
                "non-empty string after trim or fallback snippets",
                "empty",
                "export requires text to embed",
            ));
        } else {
            text.to_string()
        };

        let embedding_vector = self.embedder.embed(&resolved_text).await?;

        let record = KnowledgeRecord::new(
            query_id,
            correlation_id,
            resolved_text,
            embedding_vector,
            source_names,
            depth_used,
            total_cost_usd,
            tags.unwrap_or_default(),
            metadata.unwrap_or(serde_json::Value::Null),
        );

        let mut conn = self.connection().await?;
        let key = format!("{}{}", self.config.prefix, record.id);
        let fields = to_hash_fields(&record);
        let _: () = conn
            .hset_multiple(&key, &fields)
            .await
            .map_err(|e| IntelError::api(self.config.name.clone(), "redis", "HSET", None, 0).with_cause(&e))?;

        Ok(record)
    }

    /// FTS over `merged_text`, ANDed with `@tags:{<tag>}` per tag (§4.9
    /// `search_keyword`). Any error, including an unreachable index, yields
    /// an empty sequence rather than propagating.
    pub async fn search_keyword(&self, text: &str, limit: u32, tags: Option<&[String]>) -> Vec<KnowledgeRecord> {
        let Ok(mut conn) = self.connection().await else {
            return Vec::new();
        };

        let query_str = keyword_query(text, tags.unwrap_or(&[]));
        let reply: redis::RedisResult<redis::Value> = redis::cmd("FT.SEARCH")
            .arg(&self.config.index_name)
            .arg(query_str)
            .arg("LIMIT")
            .arg(0)
            .arg(limit)
            .query_async(&mut conn)
            .await;

        let Ok(value) = reply else {
            return Vec::new();
        };

        self.docs_from_reply(value, true)
    }

    /// Embeds `text` then runs a KNN query over the HNSW index, sorted by
    /// ascending distance (§4.9 `search_semantic`). Embedding vectors are
    /// stripped from the returned records.
    pub async fn search_semantic(&self, text: &str, limit: u32) -> Vec<KnowledgeRecord> {
        let Ok(vector) = self.embedder.embed(text).await else {
            return Vec::new();
        };
        let Ok(mut conn) = self.connection().await else {
            return Vec::new();
        };

        let vector_bytes = codec::encode_vector(&vector);
        let reply: redis::RedisResult<redis::Value> = redis::cmd("FT.SEARCH")
            .arg(&self.config.index_name)
            .arg(knn_query(limit))
            .arg("PARAMS")
            .arg(2)
            .arg("vec")
            .arg(vector_bytes)
            .arg("SORTBY")
            .arg("score")
            .arg("DIALECT")
            .arg(2)
            .query_async(&mut conn)
            .await;

        let Ok(value) = reply else {
            return Vec::new();
        };

        self.docs_from_reply(value, false)
    }

    fn docs_from_reply(&self, value: redis::Value, include_embedding: bool) -> Vec<KnowledgeRecord> {
        parse_search_reply(value)
            .into_iter()
            .map(|(id, fields)| {
                let bare_id = id.strip_prefix(&self.config.prefix).unwrap_or(&id);
                from_hash_fields(bare_id, &fields, include_embedding)
            })
            .collect()
    }
}

trait WithCause {
    fn with_cause(self, err: &redis::RedisError) -> Self;
}

impl WithCause for IntelError {
    fn with_cause(self, _err: &redis::RedisError) -> Self {
        #[cfg(feature = "tracing")]
        tracing::warn!(error = %_err, "redis operation failed");
        self
    }
}
