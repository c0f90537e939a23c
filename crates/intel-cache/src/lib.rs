//! Redis-backed result cache (C8, §4.6).
//!
//! Unlike the teacher crate this started from — an in-process LRU with
//! pluggable eviction policies — the result cache here is a thin wrapper
//! over Redis: TTL and capacity are Redis's problem, this crate only owns
//! key derivation and serialization. What's preserved is the shape: a
//! builder-configured config object and lazy, idempotent connection setup.
//!
//! ```no_run
//! use intel_cache::{CacheConfig, ResultCache, cache_key};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let cache = ResultCache::new(CacheConfig::builder().build());
//! let key = cache_key("rust async runtimes", "standard");
//! if let Some(hit) = cache.get::<serde_json::Value>(&key).await {
//!     println!("cache hit: {hit}");
//! }
//! # }
//! ```

mod config;
mod key;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use key::{cache_key, scan_pattern};

use std::sync::Arc;
use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::OnceCell;

use intel_core::error::IntelError;

/// A Redis-backed cache keyed by [`cache_key`].
///
/// Cheap to clone; the underlying connection is shared and established
/// lazily on first use (§4.6 "Connection is lazy and idempotent").
#[derive(Clone)]
pub struct ResultCache {
    config: Arc<CacheConfig>,
    connection: Arc<OnceCell<ConnectionManager>>,
}

impl ResultCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config: Arc::new(config),
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
                client.get_connection_manager().await.map_err(|e| {
                    IntelError::api(config.name.clone(), "redis", "connect", None, 0)
                        .also_log_connect_failure(&e)
                })
            })
            .await
            .cloned()
    }

    /// Returns the deserialized value for `key`, or `None` on a miss *or* any
    /// error (§4.6: "errors return miss, logged warning").
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = match self.connection().await {
            Ok(conn) => conn,
            Err(_e) => {
                log_miss(key, "connection unavailable");
                return None;
            }
        };

        let raw: Option<String> = match conn.get(key).await {
            Ok(raw) => raw,
            Err(e) => {
                log_miss(key, &e.to_string());
                return None;
            }
        };

        match raw {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    log_miss(key, &e.to_string());
                    None
                }
            },
            None => None,
        }
    }

    /// Serializes and stores `value` under `key` with `ttl`. Failures are
    /// logged and otherwise swallowed (§4.6: "errors are non-fatal").
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let Ok(raw) = serde_json::to_string(value) else {
            log_set_failure(key, "serialization failed");
            return;
        };

        let mut conn = match self.connection().await {
            Ok(conn) => conn,
            Err(_e) => {
                log_set_failure(key, "connection unavailable");
                return;
            }
        };

        let ttl_secs = ttl.as_secs().max(1);
        if let Err(e) = conn
            .set_ex::<_, _, ()>(key, raw, ttl_secs)
            .await
        {
            log_set_failure(key, &e.to_string());
        }
    }

    /// Removes `key`; failures are logged and swallowed.
    pub async fn delete(&self, key: &str) {
        let mut conn = match self.connection().await {
            Ok(conn) => conn,
            Err(_e) => return,
        };
        let _: redis::RedisResult<()> = conn.del(key).await;
    }

    /// Removes every key under [`scan_pattern`], cursor-scanning so a large
    /// keyspace doesn't block Redis with a single `KEYS *` call.
    pub async fn clear_all(&self) {
        let Ok(mut conn) = self.connection().await else {
            return;
        };

        let mut cursor: u64 = 0;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = match redis::cmd("SCAN")
                .cursor_arg(cursor)
                .arg("MATCH")
                .arg(scan_pattern())
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn)
                .await
            {
                Ok(result) => result,
                Err(_e) => return,
            };

            if !keys.is_empty() {
                let _: redis::RedisResult<()> = conn.del(&keys).await;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
    }

    /// `PING`s Redis; used by readiness/health endpoints.
    pub async fn health_check(&self) -> Result<(), IntelError> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| {
                IntelError::api(self.config.name.clone(), "redis", "ping", None, 0)
                    .also_log_connect_failure(&e)
            })
    }
}

fn log_miss(key: &str, reason: &str) {
    #[cfg(feature = "tracing")]
    tracing::warn!(key, reason, "cache get treated as miss");
    #[cfg(not(feature = "tracing"))]
    {
        let _ = (key, reason);
    }
}

fn log_set_failure(key: &str, reason: &str) {
    #[cfg(feature = "tracing")]
    tracing::warn!(key, reason, "cache set failed, continuing without caching");
    #[cfg(not(feature = "tracing"))]
    {
        let _ = (key, reason);
    }
}

/// Small helper so a redis error can be logged once at the point it's
/// converted into an `IntelError`, without every call site repeating the
/// `#[cfg(feature = "tracing")]` dance.
trait LogConnectFailure {
    fn also_log_connect_failure(self, err: &redis::RedisError) -> Self;
}

impl LogConnectFailure for IntelError {
    fn also_log_connect_failure(self, _err: &redis::RedisError) -> Self {
        #[cfg(feature = "tracing")]
        tracing::warn!(error = %_err, "redis connection failed");
        self
    }
}
