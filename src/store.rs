//! In-memory session store
//!
//! Maps session id → session record. Each record sits behind its own mutex,
//! so operations on one session serialize while different sessions proceed
//! independently; the outer map lock is held only for lookup and insert.
//!
//! The core persists nothing itself: `snapshot` / `restore` give
//! collaborators a serialized form of the full record (ledgers and RNG
//! state included) that restores to a session continuing identically.

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::error::{EngineError, Result};
use crate::ids::SessionId;
use crate::session::SessionRecord;

/// Shared handle to one session's record.
pub type SessionHandle = Arc<Mutex<SessionRecord>>;

/// Store of live sessions.
#[derive(Default)]
pub struct SessionStore {
    inner: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl SessionStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh record; returns the existing handle instead when the
    /// id is already present (init is idempotent per identity triple).
    pub fn insert(&self, record: SessionRecord) -> Result<(SessionHandle, bool)> {
        let id = record.session_id.clone();
        let mut map = self
            .inner
            .write()
            .map_err(|_| EngineError::Internal("store lock poisoned".into()))?;
        if let Some(existing) = map.get(&id) {
            return Ok((existing.clone(), false));
        }
        let handle: SessionHandle = Arc::new(Mutex::new(record));
        map.insert(id, handle.clone());
        Ok((handle, true))
    }

    /// Look up a session.
    pub fn get(&self, id: &SessionId) -> Result<SessionHandle> {
        let map = self
            .inner
            .read()
            .map_err(|_| EngineError::Internal("store lock poisoned".into()))?;
        map.get(id)
            .cloned()
            .ok_or_else(|| EngineError::SessionNotFound(id.clone()))
    }

    /// Drop a session (retention is the collaborator's policy).
    pub fn remove(&self, id: &SessionId) -> bool {
        self.inner
            .write()
            .map(|mut m| m.remove(id).is_some())
            .unwrap_or(false)
    }

    /// Serialize the full record for external persistence.
    pub fn snapshot(&self, id: &SessionId) -> Result<serde_json::Value> {
        let handle = self.get(id)?;
        let record = handle
            .lock()
            .map_err(|_| EngineError::Internal("session mutex poisoned".into()))?;
        serde_json::to_value(&*record)
            .map_err(|e| EngineError::Internal(format!("session serialize: {e}")))
    }

    /// Restore a previously-snapshotted record. Replaces any resident
    /// session with the same id.
    pub fn restore(&self, snapshot: serde_json::Value) -> Result<SessionId> {
        let record: SessionRecord = serde_json::from_value(snapshot)
            .map_err(|e| EngineError::Internal(format!("session restore: {e}")))?;
        let id = record.session_id.clone();
        let mut map = self
            .inner
            .write()
            .map_err(|_| EngineError::Internal("store lock poisoned".into()))?;
        map.insert(id.clone(), Arc::new(Mutex::new(record)));
        Ok(id)
    }

    /// Number of resident sessions.
    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    /// True when no session is resident.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authoring;
    use crate::bank;

    const KEY: &[u8] = b"facekit-test-signing-key";

    fn record(seed: &str) -> SessionRecord {
        let mut artifact = authoring::demo_bank();
        authoring::seal(&mut artifact, KEY, "test-signer").unwrap();
        let bank = bank::load_value(&artifact, KEY).unwrap();
        SessionRecord::new(&bank, seed, "default", bank.constants().clone(), 0)
    }

    #[test]
    fn insert_is_idempotent_per_id() {
        let store = SessionStore::new();
        let (_, created) = store.insert(record("a")).unwrap();
        assert!(created);
        let (_, created_again) = store.insert(record("a")).unwrap();
        assert!(!created_again);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn snapshot_restore_roundtrip() {
        let store = SessionStore::new();
        let rec = record("roundtrip");
        let id = rec.session_id.clone();
        store.insert(rec).unwrap();

        let snap = store.snapshot(&id).unwrap();
        assert!(store.remove(&id));
        assert_eq!(store.get(&id).unwrap_err().code(), "E_SESSION_NOT_FOUND");

        let restored_id = store.restore(snap).unwrap();
        assert_eq!(restored_id, id);
        store.get(&id).unwrap();
    }
}
