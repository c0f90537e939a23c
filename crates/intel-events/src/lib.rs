//! Process-wide event bus (C5, §4.3).
//!
//! ```
//! use intel_events::EventBus;
//! use serde_json::json;
//!
//! let bus = EventBus::default();
//! bus.subscribe("CacheHit", |envelope| {
//!     println!("{} fired {}", envelope.source_module, envelope.event_type);
//! });
//! bus.emit("CacheHit", json!({"key": "abc"}), "cache", None);
//! ```

mod bus;
mod envelope;

pub use bus::{EventBus, SubscriptionId, DEFAULT_STREAM_CAPACITY};
pub use envelope::EventEnvelope;
