//! The intelligence-gathering orchestrator (C9, §4.7): depth-aware fan-out
//! over C7 source clients, cache-first via C8, merged and cost-aggregated
//! into a single [`GatherResult`].
//!
//! ```no_run
//! use intel_orchestrator::{Depth, Orchestrator};
//!
//! # async fn example() -> Result<(), intel_core::error::IntelError> {
//! let orchestrator = Orchestrator::with_api_keys("exa-key", "tavily-key", "firecrawl-key", "redis://127.0.0.1:6379/0");
//! let result = orchestrator.gather_intel("rust async runtimes", Depth::Standard).await?;
//! println!("{} sources, ${:.4}", result.sources.len(), result.total_cost_usd);
//! # Ok(())
//! # }
//! ```

mod gather;
mod merge;
mod types;

pub use gather::Orchestrator;
pub use merge::{build_merged_text, dedup_and_sort};
pub use types::{Depth, GatherResult, Query, QueryBuilder, QueryInput, Source};
