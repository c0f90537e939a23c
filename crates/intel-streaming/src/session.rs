//! Per-session SSE streams (§4.4).

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use intel_events::EventBus;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};

use crate::frame::{connected_frame, frame_envelope, is_for_other_session, HEARTBEAT_FRAME};

/// Bounded queue capacity for a session's framed-message channel (§4.4).
const SESSION_QUEUE_CAPACITY: usize = 100;

/// Heartbeat interval (§4.4).
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Owns the background forwarder/heartbeat tasks and the bus subscription
/// for one session. Dropping this (which happens when [`SessionStream`] is
/// dropped, i.e. the HTTP consumer disconnects) aborts both tasks and frees
/// the bus-side queue — cleanup is guaranteed on every exit path because it
/// lives in `Drop`, not in a cooperative shutdown signal the consumer could
/// skip.
struct SessionGuard {
    forwarder: JoinHandle<()>,
    heartbeat: JoinHandle<()>,
    bus: Arc<EventBus>,
    stream_id: u64,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.forwarder.abort();
        self.heartbeat.abort();
        self.bus.remove_stream(self.stream_id);
    }
}

/// A live SSE session: a lazy sequence of already-framed message strings.
pub struct SessionStream {
    inner: ReceiverStream<String>,
    _guard: SessionGuard,
}

impl Stream for SessionStream {
    type Item = String;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Pin::new(&mut this.inner).poll_next(cx)
    }
}

/// Opens a new SSE session against `bus`, per §4.4.
pub fn subscribe(bus: Arc<EventBus>, session_id: impl Into<String>) -> SessionStream {
    let session_id = session_id.into();
    let (frame_tx, frame_rx) = mpsc::channel(SESSION_QUEUE_CAPACITY);

    let _ = frame_tx.try_send(connected_frame(&session_id));

    let (stream_id, mut envelopes) = bus.stream_subscribe_with_id();
    let forward_tx = frame_tx.clone();
    let forward_session_id = session_id.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(envelope) = envelopes.next().await {
            if is_for_other_session(&envelope, &forward_session_id) {
                continue;
            }
            if forward_tx.send(frame_envelope(&envelope)).await.is_err() {
                break;
            }
        }
    });

    let heartbeat_tx = frame_tx;
    let heartbeat = tokio::spawn(async move {
        loop {
            tokio::time::sleep(HEARTBEAT_INTERVAL).await;
            if heartbeat_tx.send(HEARTBEAT_FRAME.to_string()).await.is_err() {
                break;
            }
        }
    });

    SessionStream {
        inner: ReceiverStream::new(frame_rx),
        _guard: SessionGuard {
            forwarder,
            heartbeat,
            bus,
            stream_id,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn first_message_is_connected_frame() {
        let bus = Arc::new(EventBus::default());
        let mut stream = subscribe(bus, "sess-1");
        let first = stream.next().await.unwrap();
        assert!(first.contains("\"type\":\"connected\""));
        assert!(first.contains("\"session_id\":\"sess-1\""));
    }

    #[tokio::test]
    async fn forwards_broadcast_and_matching_session_envelopes() {
        let bus = Arc::new(EventBus::default());
        let mut stream = subscribe(bus.clone(), "sess-1");
        let _ = stream.next().await; // connected frame

        bus.emit("SourceQueried", json!({"status": "completed"}), "exa", None);
        let frame = stream.next().await.unwrap();
        assert!(frame.starts_with("event: SourceQueried\n"));
    }

    #[tokio::test]
    async fn filters_out_other_sessions_envelopes() {
        let bus = Arc::new(EventBus::default());
        let mut stream = subscribe(bus.clone(), "sess-1");
        let _ = stream.next().await; // connected frame

        bus.emit("X", json!({"session_id": "sess-2"}), "m", None);
        bus.emit("Y", json!({"session_id": "sess-1"}), "m", None);

        let frame = stream.next().await.unwrap();
        assert!(frame.starts_with("event: Y\n"));
    }

    #[tokio::test]
    async fn dropping_stream_removes_bus_subscription() {
        let bus = Arc::new(EventBus::default());
        let stream = subscribe(bus.clone(), "sess-1");
        assert_eq!(bus.stream_subscriber_count(), 1);

        drop(stream);
        // abort() is asynchronous; give the runtime a tick to process it.
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(bus.stream_subscriber_count(), 0);
    }
}
