//! Completion rotator and client (C12/C13, §4.10): round-robins across a
//! free-tier model fleet, isolating each model behind its own breaker so a
//! rate limit or outage on one model just rotates to the next.
//!
//! ```no_run
//! use intel_completion::CompletionClient;
//!
//! # async fn example() -> Result<(), intel_core::error::IntelError> {
//! let client = CompletionClient::new("openrouter-key");
//! let result = client.complete("summarize this", "general").await?;
//! println!("{}", result.content);
//! # Ok(())
//! # }
//! ```

mod client;
mod models;
mod resilience;
mod rotator;
mod types;

pub use client::CompletionClient;
pub use models::{default_candidates, CandidateModel};
pub use rotator::Rotator;
pub use types::{CompletionResult, CompletionUsage};
