//! The process-wide event bus (C5, §4.3).
//!
//! Grounded on the broadcast-channel bus in `omni-events` (one `publish`,
//! fan out to many subscribers) but split into two delivery paths because
//! §4.3 asks for two different consumer shapes:
//! - named handlers, dispatched synchronously and in isolation from each
//!   other (a panicking/erroring handler doesn't stop the rest, mirroring
//!   `intel_core::events::EventListeners::emit`'s `catch_unwind`);
//! - streaming subscribers (`intel-streaming`'s SSE sessions), each a
//!   bounded queue fed by a non-blocking offer that drops on backpressure
//!   rather than blocking `emit`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::envelope::EventEnvelope;

/// Default capacity of each streaming subscriber's queue (§4.3).
pub const DEFAULT_STREAM_CAPACITY: usize = 256;

type Handler = Arc<dyn Fn(&EventEnvelope) + Send + Sync>;

/// Opaque handle returned by [`EventBus::subscribe`], needed to
/// [`EventBus::unsubscribe`] later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct StreamSender {
    tx: mpsc::Sender<EventEnvelope>,
    drop_logged: AtomicBool,
}

/// The bus itself. Constructed fresh in tests via [`EventBus::new`]; production
/// code reaches it through [`EventBus::global`].
pub struct EventBus {
    handlers: RwLock<HashMap<String, Vec<(u64, Handler)>>>,
    next_handler_id: AtomicU64,
    streams: RwLock<HashMap<u64, StreamSender>>,
    next_stream_id: AtomicU64,
    stream_capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_STREAM_CAPACITY)
    }
}

impl EventBus {
    pub fn new(stream_capacity: usize) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            next_handler_id: AtomicU64::new(0),
            streams: RwLock::new(HashMap::new()),
            next_stream_id: AtomicU64::new(0),
            stream_capacity,
        }
    }

    /// Registers `handler` to be called for every `emit` of `event_type`.
    /// Returns a [`SubscriptionId`] for [`EventBus::unsubscribe`].
    pub fn subscribe<F>(&self, event_type: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: Fn(&EventEnvelope) + Send + Sync + 'static,
    {
        let id = self.next_handler_id.fetch_add(1, Ordering::SeqCst);
        let mut handlers = self.handlers.write().expect("event bus handlers poisoned");
        handlers
            .entry(event_type.into())
            .or_default()
            .push((id, Arc::new(handler)));
        SubscriptionId(id)
    }

    /// Removes a previously registered handler for `event_type`. A mismatched
    /// `event_type`/id pair is a no-op.
    pub fn unsubscribe(&self, event_type: &str, id: SubscriptionId) {
        let mut handlers = self.handlers.write().expect("event bus handlers poisoned");
        if let Some(bucket) = handlers.get_mut(event_type) {
            bucket.retain(|(handler_id, _)| *handler_id != id.0);
        }
    }

    /// Builds an [`EventEnvelope`], dispatches it to every handler registered
    /// for `event_type`, then offers it to every live streaming subscriber.
    /// Handler dispatch is over a snapshot of the subscriber list taken at
    /// the start of this call, so concurrent `subscribe`/`unsubscribe` calls
    /// never observe or affect an in-flight `emit`.
    pub fn emit(
        &self,
        event_type: impl Into<String>,
        payload: Value,
        source_module: impl Into<String>,
        correlation_id: Option<String>,
    ) -> EventEnvelope {
        let envelope = EventEnvelope::new(event_type, payload, source_module, correlation_id);

        let snapshot: Vec<Handler> = {
            let handlers = self.handlers.read().expect("event bus handlers poisoned");
            handlers
                .get(&envelope.event_type)
                .map(|bucket| bucket.iter().map(|(_, h)| h.clone()).collect())
                .unwrap_or_default()
        };

        for handler in &snapshot {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                handler(&envelope);
            }));
            if result.is_err() {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    event_type = %envelope.event_type,
                    event_id = %envelope.event_id,
                    "event bus handler panicked"
                );
                #[cfg(not(feature = "tracing"))]
                eprintln!(
                    "event bus handler for {} panicked (event {})",
                    envelope.event_type, envelope.event_id
                );
            }
        }

        let streams = self.streams.read().expect("event bus streams poisoned");
        for sender in streams.values() {
            match sender.tx.try_send(envelope.clone()) {
                Ok(()) => sender.drop_logged.store(false, Ordering::Relaxed),
                Err(_) => {
                    if !sender.drop_logged.swap(true, Ordering::Relaxed) {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(
                            event_type = %envelope.event_type,
                            "streaming subscriber queue full, dropping envelope"
                        );
                        #[cfg(not(feature = "tracing"))]
                        eprintln!(
                            "streaming subscriber queue full, dropping envelope of type {}",
                            envelope.event_type
                        );
                    }
                }
            }
        }

        envelope
    }

    /// Registers a new streaming subscriber and returns a lazy sequence of
    /// every envelope emitted from this point on. Dropping the returned
    /// stream stops further deliveries but, since the receiver side alone
    /// can't signal the bus, does not reclaim the entry — callers that need
    /// guaranteed cleanup (§4.4's streaming emitter) should use
    /// [`EventBus::stream_subscribe_with_id`] and call
    /// [`EventBus::remove_stream`] explicitly.
    pub fn stream_subscribe(&self) -> ReceiverStream<EventEnvelope> {
        self.stream_subscribe_with_id().1
    }

    /// Like [`EventBus::stream_subscribe`], but also returns the id needed to
    /// [`EventBus::remove_stream`] this subscription deterministically.
    pub fn stream_subscribe_with_id(&self) -> (u64, ReceiverStream<EventEnvelope>) {
        let (tx, rx) = mpsc::channel(self.stream_capacity);
        let id = self.next_stream_id.fetch_add(1, Ordering::SeqCst);
        let mut streams = self.streams.write().expect("event bus streams poisoned");
        streams.insert(
            id,
            StreamSender {
                tx,
                drop_logged: AtomicBool::new(false),
            },
        );
        (id, ReceiverStream::new(rx))
    }

    /// Removes a streaming subscription by id, freeing its queue. A missing
    /// id is a no-op (the subscriber may have already been removed).
    pub fn remove_stream(&self, id: u64) {
        let mut streams = self.streams.write().expect("event bus streams poisoned");
        streams.remove(&id);
    }

    /// Number of currently registered streaming subscribers.
    pub fn stream_subscriber_count(&self) -> usize {
        self.streams.read().expect("event bus streams poisoned").len()
    }
}

static GLOBAL: OnceLock<RwLock<Arc<EventBus>>> = OnceLock::new();

impl EventBus {
    /// The process-wide singleton, lazily constructed on first access. No
    /// module reaches for a bare `static`/`lazy_static!` directly — this is
    /// the one explicit accessor, per §4.3.
    pub fn global() -> Arc<EventBus> {
        GLOBAL
            .get_or_init(|| RwLock::new(Arc::new(EventBus::default())))
            .read()
            .expect("event bus global lock poisoned")
            .clone()
    }

    /// Replaces the global bus with a fresh, empty one. Exists so tests don't
    /// leak subscribers into each other.
    pub fn reset_global() {
        let lock = GLOBAL.get_or_init(|| RwLock::new(Arc::new(EventBus::default())));
        *lock.write().expect("event bus global lock poisoned") = Arc::new(EventBus::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use tokio_stream::StreamExt;

    #[test]
    fn emit_dispatches_to_matching_handlers_only() {
        let bus = EventBus::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        bus.subscribe("CacheHit", move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit("CacheHit", json!({}), "cache", None);
        bus.emit("CacheMiss", json!({}), "cache", None);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = EventBus::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let id = bus.subscribe("X", move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit("X", json!({}), "m", None);
        bus.unsubscribe("X", id);
        bus.emit("X", json!({}), "m", None);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_handler_does_not_block_others() {
        let bus = EventBus::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        bus.subscribe("X", |_| panic!("boom"));
        bus.subscribe("X", move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit("X", json!({}), "m", None);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stream_subscriber_receives_emitted_envelopes() {
        let bus = EventBus::default();
        let mut stream = bus.stream_subscribe();

        bus.emit("CircuitBreakerStateChanged", json!({"service": "exa"}), "breaker", None);

        let envelope = stream.next().await.unwrap();
        assert_eq!(envelope.event_type, "CircuitBreakerStateChanged");
    }

    #[tokio::test]
    async fn full_stream_queue_drops_without_blocking_emit() {
        let bus = EventBus::new(1);
        let _stream = bus.stream_subscribe();

        // Queue capacity is 1; the second emit must not block.
        bus.emit("A", json!({}), "m", None);
        bus.emit("B", json!({}), "m", None);
    }

    #[test]
    fn global_reset_clears_subscribers() {
        EventBus::reset_global();
        let bus = EventBus::global();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        bus.subscribe("Y", move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        EventBus::reset_global();
        let bus = EventBus::global();
        bus.emit("Y", json!({}), "m", None);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
