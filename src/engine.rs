//! The engine: injected configuration, core operations, event emission
//!
//! One [`Engine`] value owns the bank registry, the session store, and the
//! ambient capabilities (clock, event sink). Nothing here is a global:
//! configuration (signing key, hash whitelist, constants-profile overrides)
//! arrives in an [`EngineConfig`] at construction, and operations are plain
//! methods returning `Result`.
//!
//! Per-session operations lock that session's mutex for their whole
//! duration, so calls on one session are totally ordered while independent
//! sessions proceed in parallel. No method does I/O or suspends.

#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use crate::bank::{self, BankPackage, Constants};
use crate::error::{EngineError, Result};
use crate::events::{Clock, EventKind, EventRecord, EventSink, SystemClock, TracingSink};
use crate::finalize::FinalSnapshot;
use crate::ids::{self, Qid, SessionId};
use crate::registry::BankRegistry;
use crate::replay::{self, ReplayDescriptor, ReplayReport};
use crate::session::{AbortReason, QuestionView, SessionRecord, SessionState, SubmitOutcome};
use crate::store::SessionStore;

/// Longest accepted session seed.
const MAX_SEED_LEN: usize = 128;

/// Injected engine configuration.
pub struct EngineConfig {
    /// Per-environment HMAC key for bank signatures.
    pub signing_key: Vec<u8>,
    /// When set, only these bank hashes may back new sessions.
    pub allowed_hashes: Option<BTreeSet<String>>,
    /// Named constants-profile overrides selectable at init (A/B gating).
    pub profiles: BTreeMap<String, Constants>,
}

impl EngineConfig {
    /// Config with a signing key and no whitelist or overrides.
    pub fn new(signing_key: impl Into<Vec<u8>>) -> Self {
        Self {
            signing_key: signing_key.into(),
            allowed_hashes: None,
            profiles: BTreeMap::new(),
        }
    }
}

/// Result of `init_session`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitOutcome {
    /// Derived session id (deterministic per identity triple).
    pub session_id: SessionId,
    /// Current state: INIT on creation, the live state when the same
    /// triple was already initialized.
    pub state: SessionState,
    /// Whether this call created the session.
    pub created: bool,
}

/// Result of `set_picks`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PicksOutcome {
    /// Always PICKED on success.
    pub state: SessionState,
    /// Schedule length for this pick set.
    pub schedule_len: usize,
}

/// The assessment engine.
pub struct Engine {
    config: EngineConfig,
    registry: BankRegistry,
    store: SessionStore,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    seq: AtomicU64,
    last_ms: AtomicI64,
}

impl Engine {
    /// Engine with the system clock and the tracing sink.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            registry: BankRegistry::new(),
            store: SessionStore::new(),
            clock: Arc::new(SystemClock),
            sink: Arc::new(TracingSink),
            seq: AtomicU64::new(0),
            last_ms: AtomicI64::new(0),
        }
    }

    /// Replace the clock (tests freeze time with `FixedClock`).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the event sink.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The bank registry (read surface for collaborators).
    pub fn registry(&self) -> &BankRegistry {
        &self.registry
    }

    /// The session store (snapshot/restore surface for collaborators).
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    // ------------------------------ Banks -----------------------------------

    /// Load, verify, and register a bank artifact.
    pub fn register_bank(&self, artifact: &[u8]) -> Result<Arc<BankPackage>> {
        let loaded = bank::load(artifact, &self.config.signing_key)?;
        self.registry.register(loaded.clone())?;
        tracing::info!(
            target: "facekit::bank",
            bank_id = %loaded.meta().bank_id,
            version = %loaded.meta().version,
            hash = %loaded.hash(),
            "bank registered"
        );
        Ok(loaded)
    }

    /// [`Engine::register_bank`] over an already-parsed JSON tree.
    pub fn register_bank_value(&self, artifact: &serde_json::Value) -> Result<Arc<BankPackage>> {
        let loaded = bank::load_value(artifact, &self.config.signing_key)?;
        self.registry.register(loaded.clone())?;
        Ok(loaded)
    }

    fn bank_for_init(&self, bank_hash: &str) -> Result<Arc<BankPackage>> {
        if !ids::is_bank_hash(bank_hash) {
            return Err(EngineError::BankNotFound(bank_hash.to_string()));
        }
        if let Some(allowed) = &self.config.allowed_hashes {
            if !allowed.contains(bank_hash) {
                return Err(EngineError::BankNotFound(bank_hash.to_string()));
            }
        }
        self.registry.get(bank_hash)
    }

    fn bank_for_session(&self, record: &SessionRecord) -> Result<Arc<BankPackage>> {
        // No whitelist check here: the binding was vetted at init and must
        // survive later whitelist changes for the session's lifetime.
        self.registry.get(&record.bank_hash)
    }

    // ------------------------------ Time & events ---------------------------

    /// Monotonic timestamp: never earlier than the previous one handed out.
    fn timestamp(&self) -> i64 {
        let now = self.clock.now_ms();
        let mut prev = self.last_ms.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev);
            match self.last_ms.compare_exchange_weak(
                prev,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(p) => prev = p,
            }
        }
    }

    fn emit(&self, session_id: &SessionId, bank_hash: &str, kind: EventKind) {
        let event = EventRecord {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            at_ms: self.timestamp(),
            session_id: session_id.clone(),
            bank_hash: bank_hash.to_string(),
            kind,
        };
        self.sink.emit(&event);
    }

    // ------------------------------ Operations ------------------------------

    /// Initialize a session against a registered bank, using the bank's
    /// authored constants profile.
    pub fn init_session(&self, session_seed: &str, bank_hash: &str) -> Result<InitOutcome> {
        self.init_session_with_profile(session_seed, bank_hash, None)
    }

    /// Initialize with an explicit constants profile (A/B gating happens
    /// here and only here; the profile is fixed for the session's lifetime).
    pub fn init_session_with_profile(
        &self,
        session_seed: &str,
        bank_hash: &str,
        profile: Option<&str>,
    ) -> Result<InitOutcome> {
        if session_seed.is_empty() || session_seed.len() > MAX_SEED_LEN {
            return Err(EngineError::InvalidSessionSeed(format!(
                "seed must be 1..={MAX_SEED_LEN} bytes"
            )));
        }
        if session_seed.chars().any(|c| c.is_control()) {
            return Err(EngineError::InvalidSessionSeed("seed contains control characters".into()));
        }
        let bank = self.bank_for_init(bank_hash)?;

        let profile_name = profile.unwrap_or(&bank.meta().constants_profile);
        let constants = if profile_name == bank.meta().constants_profile {
            bank.constants().clone()
        } else {
            self.config
                .profiles
                .get(profile_name)
                .cloned()
                .ok_or_else(|| EngineError::ProfileNotFound(profile_name.to_string()))?
        };

        let record =
            SessionRecord::new(&bank, session_seed, profile_name, constants, self.timestamp());
        let session_id = record.session_id.clone();
        let (handle, created) = self.store.insert(record)?;
        let state = handle
            .lock()
            .map_err(|_| EngineError::Internal("session mutex poisoned".into()))?
            .state;
        if created {
            self.emit(
                &session_id,
                bank_hash,
                EventKind::SessionStarted { constants_profile: profile_name.to_string() },
            );
        }
        Ok(InitOutcome { session_id, state, created })
    }

    /// Record the picked families and fix the schedule (INIT → PICKED).
    pub fn set_picks(&self, session_id: &SessionId, picks: &[String]) -> Result<PicksOutcome> {
        let handle = self.store.get(session_id)?;
        let mut record = handle
            .lock()
            .map_err(|_| EngineError::Internal("session mutex poisoned".into()))?;
        let bank = self.bank_for_session(&record)?;
        record.set_picks(&bank, picks)?;
        self.emit(
            session_id,
            &record.bank_hash,
            EventKind::PicksSet {
                picks: record.picks.iter().cloned().collect(),
                schedule_len: record.schedule.len(),
            },
        );
        Ok(PicksOutcome { state: record.state, schedule_len: record.schedule.len() })
    }

    /// Serve the next unanswered question.
    pub fn next_question(&self, session_id: &SessionId) -> Result<QuestionView> {
        let handle = self.store.get(session_id)?;
        let record = handle
            .lock()
            .map_err(|_| EngineError::Internal("session mutex poisoned".into()))?;
        let bank = self.bank_for_session(&record)?;
        let view = record.next_question(&bank)?;
        self.emit(
            session_id,
            &record.bank_hash,
            EventKind::QuestionPresented {
                qid: view.qid.clone(),
                index: view.index,
                total: view.total,
            },
        );
        Ok(view)
    }

    /// Submit (or idempotently re-submit / replace) an answer.
    pub fn submit_answer(
        &self,
        session_id: &SessionId,
        qid: &Qid,
        option_key: &str,
    ) -> Result<SubmitOutcome> {
        self.submit_answer_timed(session_id, qid, option_key, None)
    }

    /// [`Engine::submit_answer`] with a collaborator-measured latency.
    pub fn submit_answer_timed(
        &self,
        session_id: &SessionId,
        qid: &Qid,
        option_key: &str,
        latency_ms: Option<u64>,
    ) -> Result<SubmitOutcome> {
        let handle = self.store.get(session_id)?;
        let mut record = handle
            .lock()
            .map_err(|_| EngineError::Internal("session mutex poisoned".into()))?;
        let bank = self.bank_for_session(&record)?;
        let now = self.timestamp();
        let outcome = record.submit_answer(&bank, qid, option_key, now, latency_ms)?;
        if !outcome.idempotent {
            let kind = match &outcome.replaced {
                Some(prior) => EventKind::AnswerChanged {
                    qid: qid.clone(),
                    prior_key: prior.clone(),
                    key: option_key.to_string(),
                },
                None => EventKind::AnswerSubmitted {
                    qid: qid.clone(),
                    key: option_key.to_string(),
                    answers_count: outcome.answers_count,
                    remaining: outcome.remaining,
                },
            };
            self.emit(session_id, &record.bank_hash, kind);
        }
        Ok(outcome)
    }

    /// IN_PROGRESS → PAUSED (idempotent).
    pub fn pause_session(&self, session_id: &SessionId) -> Result<SessionState> {
        let handle = self.store.get(session_id)?;
        let mut record = handle
            .lock()
            .map_err(|_| EngineError::Internal("session mutex poisoned".into()))?;
        let was_paused = record.state == SessionState::Paused;
        record.pause()?;
        if !was_paused {
            self.emit(session_id, &record.bank_hash, EventKind::SessionPaused);
        }
        Ok(record.state)
    }

    /// PAUSED → IN_PROGRESS (idempotent).
    pub fn resume_session(&self, session_id: &SessionId) -> Result<SessionState> {
        let handle = self.store.get(session_id)?;
        let mut record = handle
            .lock()
            .map_err(|_| EngineError::Internal("session mutex poisoned".into()))?;
        let was_running = record.state == SessionState::InProgress;
        record.resume()?;
        if !was_running {
            self.emit(session_id, &record.bank_hash, EventKind::SessionResumed);
        }
        Ok(record.state)
    }

    /// Abort the session (terminal, any state).
    pub fn abort_session(&self, session_id: &SessionId, reason: AbortReason) -> Result<SessionState> {
        let handle = self.store.get(session_id)?;
        let mut record = handle
            .lock()
            .map_err(|_| EngineError::Internal("session mutex poisoned".into()))?;
        let was_aborted = record.state == SessionState::Aborted;
        record.abort(reason.clone())?;
        if !was_aborted {
            self.emit(
                session_id,
                &record.bank_hash,
                EventKind::SessionAborted { reason },
            );
        }
        Ok(record.state)
    }

    /// Finalize a complete session and return the write-once snapshot.
    pub fn finalize_session(&self, session_id: &SessionId) -> Result<FinalSnapshot> {
        let handle = self.store.get(session_id)?;
        let mut record = handle
            .lock()
            .map_err(|_| EngineError::Internal("session mutex poisoned".into()))?;
        let bank = self.bank_for_session(&record)?;
        let snapshot = record.finalize(&bank)?.clone();
        let snapshot_hash = snapshot.hash_hex()?;
        self.emit(
            session_id,
            &record.bank_hash,
            EventKind::Finalized { snapshot_hash },
        );
        Ok(snapshot)
    }

    // ------------------------------ Replay ----------------------------------

    /// Run a replay descriptor against this engine's registry and profiles.
    ///
    /// The replay executes on a detached record (the live store is never
    /// touched), so replaying a session that is still resident is safe.
    pub fn replay(
        &self,
        descriptor: &ReplayDescriptor,
        expected_snapshot: Option<&FinalSnapshot>,
    ) -> Result<ReplayReport> {
        let bank = self.registry.get(&descriptor.bank_hash_sha256)?;
        let constants = if descriptor.constants_profile == bank.meta().constants_profile {
            bank.constants().clone()
        } else {
            self.config
                .profiles
                .get(&descriptor.constants_profile)
                .cloned()
                .ok_or_else(|| {
                    EngineError::ProfileNotFound(descriptor.constants_profile.clone())
                })?
        };
        replay::run(&bank, constants, descriptor, expected_snapshot)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authoring;
    use crate::events::{FixedClock, MemorySink};

    const KEY: &[u8] = b"facekit-test-signing-key";

    fn engine_with_sink() -> (Engine, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let engine = Engine::new(EngineConfig::new(KEY))
            .with_clock(Arc::new(FixedClock(1_700_000_000_000)))
            .with_sink(sink.clone());
        (engine, sink)
    }

    fn registered_hash(engine: &Engine) -> String {
        let mut artifact = authoring::demo_bank();
        authoring::seal(&mut artifact, KEY, "test-signer").unwrap();
        engine.register_bank_value(&artifact).unwrap().hash().to_string()
    }

    #[test]
    fn init_is_idempotent_per_identity_triple() {
        let (engine, _) = engine_with_sink();
        let hash = registered_hash(&engine);
        let first = engine.init_session("seed", &hash).unwrap();
        assert!(first.created);
        assert_eq!(first.state, SessionState::Init);
        let again = engine.init_session("seed", &hash).unwrap();
        assert!(!again.created);
        assert_eq!(again.session_id, first.session_id);
    }

    #[test]
    fn seed_validation() {
        let (engine, _) = engine_with_sink();
        let hash = registered_hash(&engine);
        assert_eq!(
            engine.init_session("", &hash).unwrap_err().code(),
            "E_INVALID_SESSION_SEED"
        );
        assert_eq!(
            engine.init_session(&"x".repeat(200), &hash).unwrap_err().code(),
            "E_INVALID_SESSION_SEED"
        );
        assert_eq!(
            engine.init_session("ok", "nothex").unwrap_err().code(),
            "E_BANK_NOT_FOUND"
        );
    }

    #[test]
    fn whitelist_gates_session_init() {
        let sink = Arc::new(MemorySink::new());
        let mut config = EngineConfig::new(KEY);
        config.allowed_hashes = Some(BTreeSet::new()); // nothing allowed
        let engine = Engine::new(config).with_sink(sink);
        let hash = registered_hash(&engine);
        assert_eq!(
            engine.init_session("seed", &hash).unwrap_err().code(),
            "E_BANK_NOT_FOUND"
        );
    }

    #[test]
    fn unknown_profile_is_rejected() {
        let (engine, _) = engine_with_sink();
        let hash = registered_hash(&engine);
        assert_eq!(
            engine
                .init_session_with_profile("seed", &hash, Some("nope"))
                .unwrap_err()
                .code(),
            "E_PROFILE_NOT_FOUND"
        );
    }

    #[test]
    fn full_run_emits_the_event_trail() {
        let (engine, sink) = engine_with_sink();
        let hash = registered_hash(&engine);
        let init = engine.init_session("events", &hash).unwrap();
        let id = init.session_id;
        engine.set_picks(&id, &["Control".to_string()]).unwrap();
        loop {
            let view = match engine.next_question(&id) {
                Ok(v) => v,
                Err(e) => {
                    assert_eq!(e.code(), "E_QUIZ_COMPLETE");
                    break;
                }
            };
            engine.submit_answer(&id, &view.qid, "A").unwrap();
        }
        engine.finalize_session(&id).unwrap();

        let events = sink.drain();
        let types: Vec<String> = events
            .iter()
            .map(|e| serde_json::to_value(&e.kind).unwrap()["type"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(types[0], "SESSION_STARTED");
        assert_eq!(types[1], "PICKS_SET");
        assert!(types.contains(&"QUESTION_PRESENTED".to_string()));
        assert!(types.contains(&"ANSWER_SUBMITTED".to_string()));
        assert_eq!(types.last().unwrap(), "FINALIZED");

        // Sequence numbers and timestamps are monotonic.
        for pair in events.windows(2) {
            assert!(pair[0].seq < pair[1].seq);
            assert!(pair[0].at_ms <= pair[1].at_ms);
        }
    }

    #[test]
    fn replace_emits_answer_changed() {
        let (engine, sink) = engine_with_sink();
        let hash = registered_hash(&engine);
        let id = engine.init_session("change", &hash).unwrap().session_id;
        engine.set_picks(&id, &[]).unwrap();
        let view = engine.next_question(&id).unwrap();
        engine.submit_answer(&id, &view.qid, "A").unwrap();
        engine.submit_answer(&id, &view.qid, "A").unwrap(); // idempotent: no event
        engine.submit_answer(&id, &view.qid, "B").unwrap();

        let types: Vec<String> = sink
            .drain()
            .iter()
            .map(|e| serde_json::to_value(&e.kind).unwrap()["type"].as_str().unwrap().to_string())
            .collect();
        let changed: Vec<&String> = types.iter().filter(|t| *t == "ANSWER_CHANGED").collect();
        let submitted: Vec<&String> = types.iter().filter(|t| *t == "ANSWER_SUBMITTED").collect();
        assert_eq!(changed.len(), 1);
        assert_eq!(submitted.len(), 1);
    }
}
