//! Crate root: public surface, core aliases, and engine-wide invariants
//!
//! This module is the **single canonical entry-point** for downstream users
//! of the library. It centralizes the identifier newtypes, the shared error
//! taxonomy, and re-exports the submodules that implement the deterministic
//! assessment engine.
//!
//! ## Invariants (contract-level)
//!
//! - **Determinism.** Equal (session-seed, bank-hash, constants-profile,
//!   pick set, accepted answer set) always produce byte-identical finalized
//!   snapshots and identical snapshot hashes. Nothing in the core reads
//!   wall-clock, thread identity, or iteration order of an unordered map on
//!   any path that feeds the snapshot.
//!
//! - **Immutable trust root.** A bank artifact is canonicalized, hashed
//!   (SHA-256), and HMAC-verified before use; the loaded [`BankPackage`]
//!   is frozen behind `Arc` and sessions bind to its hash for life.
//!
//! - **Ledger = fold.** Answer ingestion is idempotent and replacement
//!   reverts the prior answer's recorded delta exactly, so the session
//!   ledgers always equal the independent fold of the accepted answer set
//!   over the bank, never a function of submission history.
//!
//! - **Stream discipline.** Every random-looking choice (family shuffle,
//!   terminal tie-break) draws from the session's SHA-256 counter stream
//!   with stable domain separation; there is no OS randomness anywhere.
//!
//! If any invariant is violated at runtime, the failure mode is a precise
//! [`EngineError`] (or, for post-condition audits, a poisoned session that
//! refuses further work), never silent corruption.

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms)]

/// Answer applicator: per-answer deltas, apply/revert as strict arithmetic.
pub mod apply;
/// Bank authoring: sealing (hash + HMAC) and the built-in demo bank.
pub mod authoring;
/// Bank package: typed model, validation, hash & signature verification.
pub mod bank;
/// Canonical value tree, byte form, and SHA-256 digests.
pub mod canonical;
/// The engine façade: configuration, core operations, event emission.
pub mod engine;
/// Engine error taxonomy with stable codes.
pub mod error;
/// Event records, sinks, and the clock capability.
pub mod events;
/// Finalization: face states, line verdicts, representatives, anchor.
pub mod finalize;
/// Identifier newtypes and format rules.
pub mod ids;
/// Line state and face ledger.
pub mod ledger;
/// Process-wide bank registry (forward-only deployments).
pub mod registry;
/// Replay harness: reconstruct, re-finalize, compare snapshot hashes.
pub mod replay;
/// Deterministic session RNG (SHA-256 counter stream).
pub mod rng;
/// Deterministic, pick-aware schedule builder.
pub mod schedule;
/// Session record and state machine.
pub mod session;
/// In-memory session store with snapshot/restore.
pub mod store;

// ============================================================================
// Canonical re-exports (centralization)
// ============================================================================

pub use crate::ids::{FaceId, FamilyName, Qid, SessionId, TellId};

pub use crate::error::{EngineError, Result, Severity};

pub use crate::bank::{BankPackage, Constants, LineCof};

pub use crate::engine::{Engine, EngineConfig, InitOutcome, PicksOutcome};

pub use crate::finalize::{FaceState, FinalSnapshot};

pub use crate::session::{AbortReason, QuestionView, SessionState, SubmitOutcome};

pub use crate::replay::{ReplayDescriptor, ReplayOutcome, ReplayReport};
