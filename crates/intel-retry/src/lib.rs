//! Dual-budget retry engine (C3, §4.1).
//!
//! Unlike the teacher crate this started from — a Tower `Layer`/`Service`
//! wrapping arbitrary requests — the callers here are always "make one HTTP
//! call", so the engine is a plain async function, [`run`], rather than a
//! generic middleware. What's preserved is the *shape*: a builder-configured
//! policy object, an event-listener hook for observability, and exponential
//! backoff with jitter.
//!
//! ```
//! use intel_retry::{run, RetryConfig};
//! use intel_core::error::IntelError;
//!
//! # async fn example() -> Result<(), IntelError> {
//! let config = RetryConfig::builder().name("exa").build();
//! let result = run(&config, |_attempt| async { Ok::<_, IntelError>(42) }).await?;
//! assert_eq!(result, 42);
//! # Ok(())
//! # }
//! ```

mod config;
mod engine;
mod events;

pub use config::{RetryConfig, RetryConfigBuilder};
pub use engine::run;
pub use events::RetryEvent;
