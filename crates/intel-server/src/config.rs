//! Process configuration, loaded once from the environment (§6 "Configuration").
//!
//! Mirrors the original `Settings`/`SettingsManager` split: a plain data
//! struct plus a thin loader, except there's no runtime `update_settings`
//! here — this workspace treats configuration as fixed for the life of the
//! process, reloaded only by a restart.

use intel_core::error::IntelError;

/// Everything `main` needs to wire up the server (§6).
pub struct ServerConfig {
    pub app_env: String,
    pub log_level: String,
    pub host: String,
    pub port: u16,

    pub exa_api_key: String,
    pub tavily_api_key: String,
    pub firecrawl_api_key: String,
    pub jina_api_key: String,
    pub openrouter_api_key: String,

    pub cache_redis_url: String,
    pub knowledge_redis_url: String,
}

impl ServerConfig {
    /// Reads every field from the environment, applying the same defaults as
    /// the original `Settings` model where one existed. Missing API keys are
    /// tolerated here so a partially-configured deployment can still serve
    /// the routes that don't need them; a client that actually needs one
    /// (e.g. [`intel_completion::CompletionClient`]) rejects an empty key
    /// with `IntelError::Configuration` at call time instead.
    pub fn from_env() -> Result<Self, IntelError> {
        Ok(Self {
            app_env: env_or("APP_ENV", "development"),
            log_level: env_or("LOG_LEVEL", "info"),
            host: env_or("HOST", "0.0.0.0"),
            port: env_or("PORT", "8000")
                .parse()
                .map_err(|_| IntelError::configuration("intel.server", "PORT must be a valid port number"))?,

            exa_api_key: env_or("EXA_API_KEY", ""),
            tavily_api_key: env_or("TAVILY_API_KEY", ""),
            firecrawl_api_key: env_or("FIRECRAWL_API_KEY", ""),
            jina_api_key: env_or("JINA_API_KEY", ""),
            openrouter_api_key: env_or("OPENROUTER_API_KEY", ""),

            cache_redis_url: env_or("REDIS_URL", "redis://127.0.0.1:6379/0"),
            knowledge_redis_url: env_or("KNOWLEDGE_REDIS_URL", "redis://127.0.0.1:6379/1"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
