//! Shared infrastructure for the intel-gathering workspace.
//!
//! Every other crate in the workspace (`intel-retry`, `intel-circuitbreaker`,
//! `intel-events`, the source clients, the orchestrator, ...) builds on top
//! of what's here:
//! - [`ids`] / [`clock`] — correlation ids, query ids, nanosecond/ISO timestamps
//! - [`error`] — the §7 error taxonomy, `IntelError`
//! - [`events`] — the generic event-listener plumbing the event bus is built from

pub mod clock;
pub mod error;
pub mod events;
pub mod ids;

pub use clock::Clock;
pub use error::{ErrorBase, IntelError};
pub use events::{EventListener, ResilienceEvent};
pub use ids::{correlation_id, new_id};
