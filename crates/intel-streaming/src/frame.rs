//! SSE wire framing (§4.4), confirmed against the original `sse.py` framing.

use intel_events::EventEnvelope;
use serde_json::json;

/// A bare comment line — SSE consumers ignore lines starting with `:`, so
/// this keeps the connection alive without surfacing as a message.
pub const HEARTBEAT_FRAME: &str = ": heartbeat\n\n";

/// Frames an envelope as `event: <event_type>\ndata: <json>\n\n`.
pub fn frame_envelope(envelope: &EventEnvelope) -> String {
    format!(
        "event: {}\ndata: {}\n\n",
        envelope.event_type,
        serde_json::to_string(&envelope.payload).unwrap_or_else(|_| "{}".to_string())
    )
}

/// The synthetic frame sent to a new consumer before anything else.
pub fn connected_frame(session_id: &str) -> String {
    let payload = json!({"type": "connected", "session_id": session_id});
    format!(
        "event: system\ndata: {}\n\n",
        serde_json::to_string(&payload).unwrap_or_else(|_| "{}".to_string())
    )
}

/// True if `envelope`'s payload names a `session_id` that differs from
/// `session_id` — such envelopes are targeted at a different session and
/// must not be forwarded. A payload with no `session_id` field is broadcast
/// to every session.
pub fn is_for_other_session(envelope: &EventEnvelope, session_id: &str) -> bool {
    match envelope.payload.get("session_id").and_then(|v| v.as_str()) {
        Some(target) => target != session_id,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intel_events::EventBus;
    use serde_json::json;

    #[test]
    fn frames_targeted_envelope_correctly() {
        let bus = EventBus::default();
        let envelope = bus.emit("SourceQueried", json!({"status": "completed"}), "exa", None);
        let frame = frame_envelope(&envelope);
        assert!(frame.starts_with("event: SourceQueried\ndata: "));
        assert!(frame.ends_with("\n\n"));
    }

    #[test]
    fn connected_frame_carries_session_id() {
        let frame = connected_frame("sess-1");
        assert!(frame.contains("\"session_id\":\"sess-1\""));
        assert!(frame.starts_with("event: system\n"));
    }

    #[test]
    fn session_id_filtering() {
        let bus = EventBus::default();
        let targeted = bus.emit("X", json!({"session_id": "a"}), "m", None);
        let broadcast = bus.emit("Y", json!({}), "m", None);

        assert!(!is_for_other_session(&targeted, "a"));
        assert!(is_for_other_session(&targeted, "b"));
        assert!(!is_for_other_session(&broadcast, "anything"));
    }
}
