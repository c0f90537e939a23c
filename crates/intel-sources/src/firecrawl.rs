//! Firecrawl deep web scraping (§4.5 "Scraper").

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use intel_circuitbreaker::CircuitBreaker;
use intel_core::error::IntelError;
use intel_events::EventBus;
use intel_retry::RetryConfig;
use serde_json::json;
use tokio::sync::Semaphore;

use crate::resilience::{breaker_config, call, retry_after_seconds, retry_config, round2, truncate_err};
use crate::types::ScrapedPage;

const FIRECRAWL_API_BASE: &str = "https://api.firecrawl.dev/v1";

/// Cost attributed to each scraped page (§4.5 "Scraper").
pub const COST_PER_PAGE: f64 = 0.001;
const MAX_CONCURRENT_SCRAPES: usize = 5;

/// Full-page scraping via the Firecrawl API, including bounded-concurrency
/// batch scraping (§4.5).
pub struct FirecrawlSource {
    api_key: String,
    timeout: Duration,
    http: reqwest::Client,
    circuit_breaker: CircuitBreaker,
    retry_config: RetryConfig,
    rate_limited_until: Mutex<Instant>,
    semaphore: Arc<Semaphore>,
}

impl FirecrawlSource {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_options(api_key, Duration::from_secs(30), MAX_CONCURRENT_SCRAPES)
    }

    pub fn with_options(api_key: impl Into<String>, timeout: Duration, max_concurrent: usize) -> Self {
        Self {
            api_key: api_key.into(),
            timeout,
            http: reqwest::Client::new(),
            circuit_breaker: CircuitBreaker::new(breaker_config("firecrawl")),
            retry_config: retry_config("firecrawl"),
            rate_limited_until: Mutex::new(Instant::now()),
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        Instant::now() < *self.rate_limited_until.lock().expect("rate_limited_until poisoned")
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    /// Scrapes a single URL for full-page content.
    pub async fn scrape(&self, url: &str, correlation_id: Option<String>) -> Result<ScrapedPage, IntelError> {
        let bus = EventBus::global();
        let truncated_url: String = url.chars().take(200).collect();
        bus.emit(
            "source_querying",
            json!({
                "source_name": "firecrawl",
                "status": "started",
                "url": truncated_url,
            }),
            "intel.firecrawl",
            correlation_id.clone(),
        );

        let start = Instant::now();
        let result = call(
            &self.circuit_breaker,
            &self.retry_config,
            "intel.firecrawl",
            |_attempt| self.execute_scrape(url),
        )
        .await;

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        match result {
            Ok(mut page) => {
                page.latency_ms = latency_ms;
                page.cost_usd = COST_PER_PAGE;
                bus.emit(
                    "SourceQueried",
                    json!({
                        "source": "firecrawl",
                        "status": "completed",
                        "url": truncated_url,
                        "latency_ms": round2(latency_ms),
                        "content_length": page.content.len(),
                        "cost_usd": COST_PER_PAGE,
                    }),
                    "intel.firecrawl",
                    correlation_id,
                );
                Ok(page)
            }
            Err(err) => {
                if let IntelError::RateLimit {
                    retry_after_seconds,
                    ..
                } = &err
                {
                    let window = Duration::from_secs((*retry_after_seconds).max(60));
                    *self.rate_limited_until.lock().expect("rate_limited_until poisoned") =
                        Instant::now() + window;
                }
                bus.emit(
                    "SourceQueried",
                    json!({
                        "source": "firecrawl",
                        "status": "failed",
                        "url": truncated_url,
                        "latency_ms": round2(latency_ms),
                        "error": truncate_err(&err),
                    }),
                    "intel.firecrawl",
                    correlation_id,
                );
                Err(err)
            }
        }
    }

    async fn execute_scrape(&self, url: &str) -> Result<ScrapedPage, IntelError> {
        let start = Instant::now();
        let response = self
            .http
            .post(format!("{FIRECRAWL_API_BASE}/scrape"))
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .timeout(self.timeout)
            .json(&json!({
                "url": url,
                "formats": ["markdown", "rawHtml"],
                "onlyMainContent": true,
            }))
            .send()
            .await
            .map_err(|_e| IntelError::api("intel.firecrawl", "firecrawl", "/scrape", None, start.elapsed().as_millis() as u64))?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let status = response.status();

        if status.as_u16() == 429 {
            return Err(IntelError::rate_limit(
                "intel.firecrawl",
                "firecrawl",
                retry_after_seconds(response.headers()),
            ));
        }

        if !status.is_success() {
            return Err(IntelError::api(
                "intel.firecrawl",
                "firecrawl",
                "/scrape",
                Some(status.as_u16()),
                elapsed_ms,
            ));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|_e| IntelError::api("intel.firecrawl", "firecrawl", "/scrape", Some(status.as_u16()), elapsed_ms))?;

        Ok(parse_scrape_result(url, &data))
    }

    /// Scrapes every URL in `urls`, at most [`MAX_CONCURRENT_SCRAPES`] (or
    /// the value given to [`FirecrawlSource::with_options`]) in flight at
    /// once. Individual failures are logged and dropped, never fatal to the
    /// batch (§4.5: "batch_scrape... individual failures are logged and
    /// dropped").
    pub async fn batch_scrape(&self, urls: &[String], correlation_id: Option<String>) -> Vec<ScrapedPage> {
        if urls.is_empty() {
            return Vec::new();
        }

        let results = futures::future::join_all(urls.iter().map(|url| {
            let correlation_id = correlation_id.clone();
            async move {
                let _permit = self
                    .semaphore
                    .acquire()
                    .await
                    .expect("firecrawl semaphore closed");
                self.scrape(url, correlation_id).await.ok()
            }
        }))
        .await;

        results.into_iter().flatten().collect()
    }
}

fn parse_scrape_result(url: &str, data: &serde_json::Value) -> ScrapedPage {
    let page_data = data.get("data").unwrap_or(data);
    let metadata = page_data
        .get("metadata")
        .and_then(|v| v.as_object())
        .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_else(HashMap::new);

    ScrapedPage {
        url: url.to_string(),
        title: page_data
            .get("metadata")
            .and_then(|m| m.get("title"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        content: page_data.get("rawHtml").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        markdown: page_data.get("markdown").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        metadata,
        cost_usd: 0.0,
        latency_ms: 0.0,
    }
}
