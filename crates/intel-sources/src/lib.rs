//! Source clients (C7, §4.5): neural search, news search, and a page
//! scraper, each wrapping a circuit breaker around a retrying HTTP call and
//! announcing its lifecycle on the process-wide event bus.
//!
//! ```no_run
//! use intel_sources::ExaSource;
//!
//! # async fn example() -> Result<(), intel_core::error::IntelError> {
//! let exa = ExaSource::new("api-key");
//! let hits = exa.search("rust async runtimes", 10, None).await?;
//! # let _ = hits;
//! # Ok(())
//! # }
//! ```

mod firecrawl;
mod exa;
mod resilience;
mod tavily;
mod types;

pub use firecrawl::{FirecrawlSource, COST_PER_PAGE};
pub use exa::{ExaSource, COST_PER_RESULT};
pub use tavily::{per_result_cost, TavilySource};
pub use types::{ScrapedPage, SearchHit};
