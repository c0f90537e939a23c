/// Configuration for [`crate::ResultCache`] (§4.6, §6 "Configuration").
///
/// `redis_url` must address a logical namespace distinct from the knowledge
/// store's (§4.6 "Cache isolation") — typically a different Redis `db`
/// index or a separate instance entirely.
pub struct CacheConfig {
    pub(crate) redis_url: String,
    pub(crate) default_ttl_seconds: u64,
    pub(crate) name: String,
}

impl CacheConfig {
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::new()
    }
}

pub struct CacheConfigBuilder {
    redis_url: String,
    default_ttl_seconds: u64,
    name: String,
}

impl Default for CacheConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheConfigBuilder {
    /// Default `default_ttl_seconds=3600` per §4.7's orchestrator default.
    pub fn new() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
            default_ttl_seconds: 3600,
            name: "result-cache".to_string(),
        }
    }

    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = url.into();
        self
    }

    pub fn default_ttl_seconds(mut self, ttl: u64) -> Self {
        self.default_ttl_seconds = ttl;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn build(self) -> CacheConfig {
        CacheConfig {
            redis_url: self.redis_url,
            default_ttl_seconds: self.default_ttl_seconds,
            name: self.name,
        }
    }
}
