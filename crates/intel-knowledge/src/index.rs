//! Idempotent `FT.CREATE` for the knowledge store's combined FTS + HNSW
//! index (§4.9).

use redis::aio::ConnectionManager;

use intel_core::error::IntelError;

const EMBEDDING_DIM: usize = intel_embedder::EMBEDDING_DIM;
const HNSW_M: u32 = 16;
const HNSW_EF_CONSTRUCTION: u32 = 200;

/// Creates `index_name` over hashes under `prefix` if it doesn't already
/// exist. An "Index already exists" response is treated as success (§4.9
/// "Index creation is idempotent"); any other error propagates.
pub(crate) async fn ensure_index(
    conn: &mut ConnectionManager,
    index_name: &str,
    prefix: &str,
    source_module: &str,
) -> Result<(), IntelError> {
    let result: redis::RedisResult<redis::Value> = redis::cmd("FT.CREATE")
        .arg(index_name)
        .arg("ON")
        .arg("HASH")
        .arg("PREFIX")
        .arg(1)
        .arg(prefix)
        .arg("SCHEMA")
        .arg("merged_text")
        .arg("TEXT")
        .arg("source_names")
        .arg("TAG")
        .arg("tags")
        .arg("TAG")
        .arg("depth_used")
        .arg("TAG")
        .arg("embedding_vector")
        .arg("VECTOR")
        .arg("HNSW")
        .arg(10)
        .arg("TYPE")
        .arg("FLOAT32")
        .arg("DIM")
        .arg(EMBEDDING_DIM)
        .arg("DISTANCE_METRIC")
        .arg("COSINE")
        .arg("M")
        .arg(HNSW_M)
        .arg("EF_CONSTRUCTION")
        .arg(HNSW_EF_CONSTRUCTION)
        .query_async(conn)
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(e) if e.to_string().contains("Index already exists") => Ok(()),
        Err(e) => Err(IntelError::api(source_module, "redis", "FT.CREATE", None, 0).also_with(&e)),
    }
}

trait AlsoWith {
    fn also_with(self, err: &redis::RedisError) -> Self;
}

impl AlsoWith for IntelError {
    fn also_with(self, _err: &redis::RedisError) -> Self {
        #[cfg(feature = "tracing")]
        tracing::warn!(error = %_err, "FT.CREATE failed");
        self
    }
}
