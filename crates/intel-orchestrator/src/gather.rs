//! `gather_intel`, the orchestrator's entry point (C9, §4.7).

use std::time::Instant;

use intel_cache::{cache_key, CacheConfig, ResultCache};
use intel_core::clock::Clock;
use intel_core::error::IntelError;
use intel_events::EventBus;
use intel_sources::{ExaSource, FirecrawlSource, SearchHit, TavilySource};
use serde_json::json;

use crate::merge::{build_merged_text, dedup_and_sort};
use crate::types::{Depth, GatherResult, Query, QueryInput, Source};

const DEFAULT_CACHE_TTL_SECONDS: u64 = 3600;

/// URL substrings a Deep-depth scrape never follows (§4.7 step 4).
const SCRAPE_BLOCKLIST: &[&str] = &[
    "twitter.com",
    "x.com",
    "reddit.com",
    "facebook.com",
    "youtube.com",
    "google.com",
];

/// Ties C7 source clients, C8's cache, and C5's event bus into the single
/// depth-aware fan-out described in §4.7.
pub struct Orchestrator {
    exa: ExaSource,
    tavily: TavilySource,
    firecrawl: FirecrawlSource,
    cache: ResultCache,
}

impl Orchestrator {
    pub fn new(exa: ExaSource, tavily: TavilySource, firecrawl: FirecrawlSource, cache: ResultCache) -> Self {
        Self {
            exa,
            tavily,
            firecrawl,
            cache,
        }
    }

    /// Builds an orchestrator whose cache points at `redis_url` with the
    /// spec's default TTL, and whose source clients read API keys the
    /// caller already resolved (environment, secrets manager, ...).
    pub fn with_api_keys(exa_key: impl Into<String>, tavily_key: impl Into<String>, firecrawl_key: impl Into<String>, redis_url: impl Into<String>) -> Self {
        Self::new(
            ExaSource::new(exa_key),
            TavilySource::new(tavily_key),
            FirecrawlSource::new(firecrawl_key),
            ResultCache::new(
                CacheConfig::builder()
                    .redis_url(redis_url)
                    .default_ttl_seconds(DEFAULT_CACHE_TTL_SECONDS)
                    .name("result-cache")
                    .build(),
            ),
        )
    }

    /// Runs a query through cache probe, depth-dispatched fan-out, merge,
    /// and cost aggregation (§4.7). `depth` only governs a bare-text input;
    /// a `Query` already carries its own depth.
    pub async fn gather_intel(&self, input: impl Into<QueryInput>, depth: Depth) -> Result<GatherResult, IntelError> {
        let query = match input.into() {
            QueryInput::Query(query) => query,
            QueryInput::Text(text) => Query::new(text, depth)?,
        };

        match self.run(&query).await {
            Ok(result) => Ok(result),
            Err(err) => {
                EventBus::global().emit(
                    "error_occurred",
                    json!({
                        "query_id": query.query_id,
                        "error_msg": err.to_string(),
                        "source_module": err.base().source_module,
                    }),
                    "intel.orchestrator",
                    Some(query.correlation_id.clone()),
                );
                Err(err)
            }
        }
    }

    async fn run(&self, query: &Query) -> Result<GatherResult, IntelError> {
        let start = Instant::now();
        let bus = EventBus::global();

        bus.emit(
            "query_started",
            json!({
                "query_id": query.query_id,
                "depth": query.depth.as_str(),
                "correlation_id": query.correlation_id,
            }),
            "intel.orchestrator",
            Some(query.correlation_id.clone()),
        );

        let key = cache_key(&query.text, query.depth.as_str());
        if let Some(mut cached) = self.cache.get::<GatherResult>(&key).await {
            cached.cached = true;
            cached.latency_ms = start.elapsed().as_secs_f64() * 1000.0;
            self.emit_completion(query, &cached);
            return Ok(cached);
        }

        let sources = self.dispatch(query).await;
        let merged = dedup_and_sort(sources);
        let total_cost_usd: f64 = merged.iter().map(|s| s.cost_usd).sum();
        let merged_text = build_merged_text(&merged);

        let result = GatherResult {
            query_id: query.query_id.clone(),
            correlation_id: query.correlation_id.clone(),
            sources: merged,
            merged_text,
            depth_used: query.depth,
            total_cost_usd,
            latency_ms: start.elapsed().as_secs_f64() * 1000.0,
            timestamp: Clock::now_iso(),
            cached: false,
            embeddings: None,
        };

        let ttl = std::time::Duration::from_secs(query.cache_ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECONDS));
        self.cache.set(&key, &result, ttl).await;

        self.emit_completion(query, &result);
        Ok(result)
    }

    fn emit_completion(&self, query: &Query, result: &GatherResult) {
        let bus = EventBus::global();
        let summary: String = result.merged_text.chars().take(200).collect();
        bus.emit(
            "IntelGathered",
            json!({
                "query_id": query.query_id,
                "depth_used": result.depth_used.as_str(),
                "source_count": result.sources.len(),
                "total_cost_usd": result.total_cost_usd,
                "latency_ms": result.latency_ms,
                "cached": result.cached,
                "result_summary": summary,
                "has_embeddings": result.embeddings.is_some(),
            }),
            "intel.orchestrator",
            Some(query.correlation_id.clone()),
        );
        bus.emit(
            "query_completed",
            json!({
                "query_id": query.query_id,
                "status": "success",
                "cost": result.total_cost_usd,
                "latency": result.latency_ms,
                "cached": result.cached,
            }),
            "intel.orchestrator",
            Some(query.correlation_id.clone()),
        );
    }

    async fn dispatch(&self, query: &Query) -> Vec<Source> {
        match query.depth {
            Depth::Shallow => self.dispatch_shallow(query, 5).await,
            Depth::Standard => self.dispatch_standard(query).await,
            Depth::Deep => self.dispatch_deep(query).await,
        }
    }

    async fn dispatch_shallow(&self, query: &Query, num_results: u32) -> Vec<Source> {
        match self
            .exa
            .search(&query.text, num_results, Some(query.correlation_id.clone()))
            .await
        {
            Ok(hits) => hits.into_iter().map(exa_source).collect(),
            Err(_err) => Vec::new(),
        }
    }

    async fn dispatch_standard(&self, query: &Query) -> Vec<Source> {
        let want_neural = !self.exa.is_rate_limited();
        let want_news = !self.tavily.is_rate_limited();

        let (neural, news) = futures::future::join(
            async {
                if want_neural {
                    self.exa.search(&query.text, 10, Some(query.correlation_id.clone())).await.ok()
                } else {
                    None
                }
            },
            async {
                if want_news {
                    self.tavily.search(&query.text, 5, Some(query.correlation_id.clone())).await.ok()
                } else {
                    None
                }
            },
        )
        .await;

        let mut sources = Vec::new();
        if let Some(hits) = neural {
            sources.extend(hits.into_iter().map(exa_source));
        }
        if let Some(hits) = news {
            let count = hits.len();
            sources.extend(hits.into_iter().map(|hit| tavily_source(hit, count)));
        }
        sources
    }

    async fn dispatch_deep(&self, query: &Query) -> Vec<Source> {
        let hits = match self.exa.search(&query.text, 10, Some(query.correlation_id.clone())).await {
            Ok(hits) => hits,
            Err(_err) => return Vec::new(),
        };

        let scrape_urls: Vec<String> = hits
            .iter()
            .filter_map(|hit| hit.url.clone())
            .filter(|url| !SCRAPE_BLOCKLIST.iter().any(|blocked| url.contains(blocked)))
            .take(5)
            .collect();

        let mut sources: Vec<Source> = hits.into_iter().map(exa_source).collect();

        if !scrape_urls.is_empty() {
            let pages = self
                .firecrawl
                .batch_scrape(&scrape_urls, Some(query.correlation_id.clone()))
                .await;
            sources.extend(pages.into_iter().map(firecrawl_source));
        }

        sources
    }
}

fn exa_source(hit: SearchHit) -> Source {
    Source {
        source_name: hit.source_name,
        url: hit.url,
        title: hit.title,
        snippet: hit.snippet,
        relevance_score: hit.relevance_score,
        cost_usd: intel_sources::COST_PER_RESULT,
        latency_ms: 0.0,
    }
}

fn tavily_source(hit: SearchHit, result_count: usize) -> Source {
    Source {
        source_name: hit.source_name,
        url: hit.url,
        title: hit.title,
        snippet: hit.snippet,
        relevance_score: hit.relevance_score,
        cost_usd: intel_sources::per_result_cost(result_count),
        latency_ms: 0.0,
    }
}

fn firecrawl_source(page: intel_sources::ScrapedPage) -> Source {
    let snippet: String = if page.markdown.is_empty() {
        page.content.chars().take(500).collect()
    } else {
        page.markdown.chars().take(500).collect()
    };
    Source {
        source_name: "firecrawl".to_string(),
        url: Some(page.url),
        title: page.title,
        snippet,
        relevance_score: 0.8,
        cost_usd: page.cost_usd,
        latency_ms: page.latency_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrape_blocklist_filters_social_domains() {
        let urls = vec![
            "https://ok.example/1".to_string(),
            "https://twitter.com/x".to_string(),
            "https://ok.example/2".to_string(),
        ];
        let filtered: Vec<&String> = urls
            .iter()
            .filter(|url| !SCRAPE_BLOCKLIST.iter().any(|blocked| url.contains(blocked)))
            .collect();
        assert_eq!(filtered, vec!["https://ok.example/1", "https://ok.example/2"]);
    }
}
