/// Configuration for [`crate::KnowledgeStore`] (§4.9, §6 "Configuration").
///
/// `redis_url` addresses a logical namespace distinct from the result
/// cache's (§4.6 "Cache isolation") — a separate Redis `db` index or
/// instance, so record keys and cache keys never collide even though both
/// share the `intel:` root.
pub struct KnowledgeConfig {
    pub(crate) redis_url: String,
    pub(crate) prefix: String,
    pub(crate) index_name: String,
    pub(crate) name: String,
}

impl KnowledgeConfig {
    pub fn builder() -> KnowledgeConfigBuilder {
        KnowledgeConfigBuilder::new()
    }
}

pub struct KnowledgeConfigBuilder {
    redis_url: String,
    prefix: String,
    index_name: String,
    name: String,
}

impl Default for KnowledgeConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeConfigBuilder {
    pub fn new() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379/1".to_string(),
            prefix: "intel:knowledge:".to_string(),
            index_name: "idx:knowledge".to_string(),
            name: "knowledge-store".to_string(),
        }
    }

    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = url.into();
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn index_name(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = index_name.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn build(self) -> KnowledgeConfig {
        KnowledgeConfig {
            redis_url: self.redis_url,
            prefix: self.prefix,
            index_name: self.index_name,
            name: self.name,
        }
    }
}
