//! Shared application state (§6), built once in `main` and cloned cheaply
//! into every handler the way an axum service is expected to.

use std::sync::Arc;

use intel_completion::CompletionClient;
use intel_knowledge::{KnowledgeConfig, KnowledgeStore};
use intel_orchestrator::Orchestrator;

use crate::config::ServerConfig;
use crate::depth::DepthRecommender;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub completion: Arc<CompletionClient>,
    pub knowledge: Arc<KnowledgeStore>,
    pub depth_recommender: Arc<DepthRecommender>,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> Self {
        let orchestrator = Orchestrator::with_api_keys(
            config.exa_api_key.clone(),
            config.tavily_api_key.clone(),
            config.firecrawl_api_key.clone(),
            config.cache_redis_url.clone(),
        );

        let completion = CompletionClient::new(config.openrouter_api_key.clone());

        let knowledge = KnowledgeStore::new(
            KnowledgeConfig::builder().redis_url(config.knowledge_redis_url.clone()).build(),
            intel_embedder::Embedder::new(config.jina_api_key.clone()),
        );

        Self {
            orchestrator: Arc::new(orchestrator),
            completion: Arc::new(completion),
            knowledge: Arc::new(knowledge),
            depth_recommender: Arc::new(DepthRecommender::new()),
        }
    }
}
