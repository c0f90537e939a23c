//! SSE streaming emitter (C6, §4.4).
//!
//! Bridges a per-session SSE consumer to the process-wide bus in
//! `intel-events`: a forwarder task relays matching envelopes, a heartbeat
//! task keeps the chunked HTTP response alive, and both are torn down
//! deterministically when the consumer disconnects.

mod frame;
mod session;

pub use frame::{connected_frame, frame_envelope, HEARTBEAT_FRAME};
pub use session::{subscribe, SessionStream};
