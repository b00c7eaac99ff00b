//! Event records, sinks, and the clock capability
//!
//! The core emits one typed [`EventRecord`] per observable operation;
//! collaborators persist or route them through an [`EventSink`]. Timestamps
//! come from a caller-supplied [`Clock`] so tests freeze time, and they
//! never feed the finalized snapshot, which stays a pure function of the
//! session inputs.
//!
//! Sequence numbers and timestamps are monotonic per engine (the engine
//! clamps a clock that runs backwards).

#![forbid(unsafe_code)]

use serde::Serialize;
use std::sync::Mutex;

use crate::ids::{FamilyName, Qid, SessionId};
use crate::session::AbortReason;

/// Time capability, injected at engine construction.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;
}

/// Wall-clock via `chrono`.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Frozen clock for tests and replays.
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.0
    }
}

/// Operation-specific payloads. Variant names serialize as the event-type
/// tags of the external contract (`SESSION_STARTED`, `PICKS_SET`, …).
#[allow(missing_docs)]
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    SessionStarted {
        constants_profile: String,
    },
    PicksSet {
        picks: Vec<FamilyName>,
        schedule_len: usize,
    },
    QuestionPresented {
        qid: Qid,
        index: usize,
        total: usize,
    },
    AnswerSubmitted {
        qid: Qid,
        key: String,
        answers_count: usize,
        remaining: usize,
    },
    AnswerChanged {
        qid: Qid,
        prior_key: String,
        key: String,
    },
    SessionPaused,
    SessionResumed,
    SessionAborted {
        reason: AbortReason,
    },
    Finalized {
        snapshot_hash: String,
    },
}

/// One emitted event.
#[derive(Clone, Debug, Serialize)]
pub struct EventRecord {
    /// Monotonic per-engine sequence number.
    pub seq: u64,
    /// Monotonic timestamp (ms since epoch).
    pub at_ms: i64,
    /// Session the event belongs to.
    pub session_id: SessionId,
    /// Bank the session is bound to.
    pub bank_hash: String,
    /// Payload.
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Consumer of emitted events.
pub trait EventSink: Send + Sync {
    /// Receive one event. Must not block; the core calls this inline.
    fn emit(&self, event: &EventRecord);
}

/// Default sink: structured log line per event via `tracing`.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &EventRecord) {
        match serde_json::to_string(&event.kind) {
            Ok(payload) => tracing::info!(
                target: "facekit::events",
                seq = event.seq,
                at_ms = event.at_ms,
                session = %event.session_id,
                bank = %event.bank_hash,
                %payload,
            ),
            Err(e) => tracing::warn!(target: "facekit::events", "unserializable event: {e}"),
        }
    }
}

/// Buffering sink for tests and batch exporters.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<EventRecord>>,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything buffered so far.
    pub fn drain(&self) -> Vec<EventRecord> {
        self.events.lock().map(|mut v| std::mem::take(&mut *v)).unwrap_or_default()
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.events.lock().map(|v| v.len()).unwrap_or(0)
    }

    /// True when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &EventRecord) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_with_type_tag() {
        let event = EventRecord {
            seq: 3,
            at_ms: 1_700_000_000_000,
            session_id: SessionId("0123456789abcdef".into()),
            bank_hash: "ab".repeat(32),
            kind: EventKind::QuestionPresented {
                qid: Qid("CTRL_Q1".into()),
                index: 0,
                total: 21,
            },
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "QUESTION_PRESENTED");
        assert_eq!(value["qid"], "CTRL_Q1");
        assert_eq!(value["seq"], 3);
    }

    #[test]
    fn memory_sink_buffers_and_drains() {
        let sink = MemorySink::new();
        let event = EventRecord {
            seq: 0,
            at_ms: 0,
            session_id: SessionId("0123456789abcdef".into()),
            bank_hash: "cd".repeat(32),
            kind: EventKind::SessionPaused,
        };
        sink.emit(&event);
        sink.emit(&event);
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.drain().len(), 2);
        assert!(sink.is_empty());
    }
}
