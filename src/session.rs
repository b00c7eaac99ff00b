//! Session record and state machine
//!
//! One [`SessionRecord`] per subject run. The machine is
//! INIT → PICKED → IN_PROGRESS (⇄ PAUSED) → FINALIZING → FINALIZED, with
//! ABORTED reachable from anywhere and terminal. Only the transitions named
//! here exist; anything else surfaces `E_STATE`.
//!
//! Answer ingestion is **idempotent**: re-submitting the same (qid, key) is
//! a no-op, submitting a different key for an answered qid reverts the prior
//! delta and applies the new one. The ledgers are therefore always the fold
//! of the currently-accepted answer set, never of the submission history.
//!
//! With feature `strict-fold-audit`, every accepted answer is post-checked
//! against an independent re-fold; a disagreement poisons the session (a
//! terminal internal-error state) instead of silently corrupting output.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

use crate::apply::{self, AnswerDelta};
use crate::bank::{BankPackage, Constants, LineCof};
use crate::error::{EngineError, Result};
use crate::finalize::{self, FinalSnapshot};
use crate::ids::{FamilyName, Qid, SessionId, TellId};
use crate::ledger::SessionLedgers;
use crate::rng::SessionRng;
use crate::schedule::{self, ScheduledQuestion};

/// Lifecycle state of a session.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Init,
    Picked,
    InProgress,
    Paused,
    Finalizing,
    Finalized,
    Aborted,
}

impl SessionState {
    /// Uppercase tag, as used in events and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Init => "INIT",
            SessionState::Picked => "PICKED",
            SessionState::InProgress => "IN_PROGRESS",
            SessionState::Paused => "PAUSED",
            SessionState::Finalizing => "FINALIZING",
            SessionState::Finalized => "FINALIZED",
            SessionState::Aborted => "ABORTED",
        }
    }
}

/// Why a session was aborted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortReason {
    /// Explicit caller abort, with a free-form detail string.
    Caller { detail: String },
    /// Idle/expiry abort surfaced by a collaborator.
    Expired,
    /// Internal invariant violation (poisoned session).
    Internal { detail: String },
}

/// An accepted answer, with the delta needed to revert it exactly.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerRecord {
    pub option_key: String,
    pub delta: AnswerDelta,
    pub submitted_at_ms: i64,
    pub latency_ms: Option<u64>,
}

/// Result of one `submit_answer` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Always true when the call returns Ok.
    pub accepted: bool,
    /// The (qid, key) pair was already accepted; nothing changed.
    pub idempotent: bool,
    /// Prior key, when this call replaced an existing answer.
    pub replaced: Option<String>,
    /// Accepted answers after this call.
    pub answers_count: usize,
    /// Scheduled questions still unanswered.
    pub remaining: usize,
}

/// One option as presented to the subject.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OptionView {
    pub key: String,
    pub line_cof: LineCof,
    pub tells: Vec<TellId>,
}

/// The next question to serve, with its position in the schedule.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionView {
    pub qid: Qid,
    pub family: FamilyName,
    pub slot: LineCof,
    pub options: Vec<OptionView>,
    /// Zero-based position in the schedule.
    pub index: usize,
    /// Schedule length.
    pub total: usize,
}

/// Derive the session id from the identity triple.
///
/// First 8 bytes of a domain-separated SHA-256, hex-rendered: 16 lowercase
/// hex chars, matching the `^[a-f0-9]{16}$` contract.
pub fn derive_session_id(session_seed: &str, bank_hash: &str, constants_profile: &str) -> SessionId {
    let mut hasher = Sha256::new();
    hasher.update(b"facekit.session.v1");
    hasher.update(b":");
    hasher.update(session_seed.as_bytes());
    hasher.update(b"|");
    hasher.update(bank_hash.as_bytes());
    hasher.update(b"|");
    hasher.update(constants_profile.as_bytes());
    let digest: [u8; 32] = hasher.finalize().into();
    SessionId(hex::encode(&digest[..8]))
}

/// The complete mutable state of one session.
///
/// Everything (including the RNG stream) is serde-serializable so a
/// collaborator can persist the record and restore it to a session that
/// continues identically.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub session_seed: String,
    pub bank_hash: String,
    pub constants_profile: String,
    pub state: SessionState,
    pub started_at_ms: i64,
    pub picks: BTreeSet<FamilyName>,
    pub schedule: Vec<ScheduledQuestion>,
    pub answers: BTreeMap<Qid, AnswerRecord>,
    pub ledgers: SessionLedgers,
    pub rng: SessionRng,
    /// Constants cloned at init (profile choice happens once, up front).
    pub constants: Constants,
    pub abort_reason: Option<AbortReason>,
    /// Set when a post-condition audit failed; terminal.
    pub poisoned: bool,
    pub final_snapshot: Option<FinalSnapshot>,
}

impl SessionRecord {
    /// Fresh record in INIT, bound to `bank` for its lifetime.
    pub fn new(
        bank: &BankPackage,
        session_seed: &str,
        constants_profile: &str,
        constants: Constants,
        now_ms: i64,
    ) -> Self {
        let session_id = derive_session_id(session_seed, bank.hash(), constants_profile);
        let rng = SessionRng::derive(session_seed, bank.hash(), constants_profile);
        Self {
            session_id,
            session_seed: session_seed.to_string(),
            bank_hash: bank.hash().to_string(),
            constants_profile: constants_profile.to_string(),
            state: SessionState::Init,
            started_at_ms: now_ms,
            picks: BTreeSet::new(),
            schedule: Vec::new(),
            answers: BTreeMap::new(),
            ledgers: SessionLedgers::for_bank(bank),
            rng,
            constants,
            abort_reason: None,
            poisoned: false,
            final_snapshot: None,
        }
    }

    /// Accepted answers so far.
    pub fn answers_count(&self) -> usize {
        self.answers.len()
    }

    /// Scheduled questions still unanswered.
    pub fn remaining(&self) -> usize {
        self.schedule.len() - self.answers.len()
    }

    fn guard(&self, op: &'static str) -> Result<()> {
        if self.poisoned {
            return Err(EngineError::Internal("session poisoned".into()));
        }
        if self.state == SessionState::Aborted {
            return match self.abort_reason {
                Some(AbortReason::Expired) => Err(EngineError::SessionExpired),
                _ => Err(EngineError::State { op, state: self.state.as_str() }),
            };
        }
        Ok(())
    }

    /// INIT → PICKED. Validates picks, builds the schedule (the one shuffle
    /// draw), and seeds +1 C for every picked family.
    pub fn set_picks(&mut self, bank: &BankPackage, picks: &[String]) -> Result<()> {
        self.guard("set_picks")?;
        match self.state {
            SessionState::Init => {}
            SessionState::Finalized => return Err(EngineError::SessionAlreadyFinalized),
            _ => return Err(EngineError::State { op: "set_picks", state: self.state.as_str() }),
        }
        let picks = schedule::validate_picks(bank, picks)?;
        self.schedule = schedule::build(bank, &picks, &mut self.rng);
        self.ledgers.seed_picks(&picks);
        self.picks = picks;
        self.state = SessionState::Picked;
        Ok(())
    }

    /// First unanswered question in schedule order, or `E_QUIZ_COMPLETE`.
    pub fn next_question(&self, bank: &BankPackage) -> Result<QuestionView> {
        self.guard("next_question")?;
        match self.state {
            SessionState::Picked | SessionState::InProgress => {}
            SessionState::Finalized => return Err(EngineError::SessionAlreadyFinalized),
            _ => {
                return Err(EngineError::State { op: "next_question", state: self.state.as_str() })
            }
        }
        for (index, sq) in self.schedule.iter().enumerate() {
            if self.answers.contains_key(&sq.qid) {
                continue;
            }
            let question = bank
                .question(&sq.qid)
                .ok_or_else(|| EngineError::QuestionNotFound(sq.qid.clone()))?;
            let options = question
                .options
                .iter()
                .map(|o| OptionView {
                    key: o.key.clone(),
                    line_cof: o.line_cof,
                    tells: o.tells.clone(),
                })
                .collect();
            return Ok(QuestionView {
                qid: sq.qid.clone(),
                family: sq.family.clone(),
                slot: sq.slot,
                options,
                index,
                total: self.schedule.len(),
            });
        }
        Err(EngineError::QuizComplete)
    }

    /// Idempotent answer ingestion (PICKED or IN_PROGRESS).
    pub fn submit_answer(
        &mut self,
        bank: &BankPackage,
        qid: &Qid,
        option_key: &str,
        now_ms: i64,
        latency_ms: Option<u64>,
    ) -> Result<SubmitOutcome> {
        self.guard("submit_answer")?;
        match self.state {
            SessionState::Picked | SessionState::InProgress => {}
            SessionState::Finalized => return Err(EngineError::SessionAlreadyFinalized),
            _ => {
                return Err(EngineError::State { op: "submit_answer", state: self.state.as_str() })
            }
        }
        if !self.schedule.iter().any(|sq| &sq.qid == qid) {
            return Err(EngineError::BadQid(qid.clone()));
        }

        if let Some(existing) = self.answers.get(qid) {
            if existing.option_key == option_key {
                return Ok(SubmitOutcome {
                    accepted: true,
                    idempotent: true,
                    replaced: None,
                    answers_count: self.answers.len(),
                    remaining: self.remaining(),
                });
            }
        }

        // Compile against the bank before touching anything, so an invalid
        // option leaves the session untouched.
        let delta = apply::compile(bank, qid, option_key)?;

        let replaced = if let Some(prior) = self.answers.remove(qid) {
            apply::revert(&mut self.ledgers, &prior.delta);
            Some(prior.option_key)
        } else {
            None
        };
        apply::apply(&mut self.ledgers, &delta);
        self.answers.insert(
            qid.clone(),
            AnswerRecord {
                option_key: option_key.to_string(),
                delta,
                submitted_at_ms: now_ms,
                latency_ms,
            },
        );
        if self.state == SessionState::Picked {
            self.state = SessionState::InProgress;
        }

        self.audit_fold(bank)?;

        Ok(SubmitOutcome {
            accepted: true,
            idempotent: false,
            replaced,
            answers_count: self.answers.len(),
            remaining: self.remaining(),
        })
    }

    /// IN_PROGRESS → PAUSED (idempotent).
    pub fn pause(&mut self) -> Result<()> {
        self.guard("pause")?;
        match self.state {
            SessionState::Paused => Ok(()),
            SessionState::InProgress => {
                self.state = SessionState::Paused;
                Ok(())
            }
            SessionState::Finalized => Err(EngineError::SessionAlreadyFinalized),
            _ => Err(EngineError::State { op: "pause", state: self.state.as_str() }),
        }
    }

    /// PAUSED → IN_PROGRESS (idempotent).
    pub fn resume(&mut self) -> Result<()> {
        self.guard("resume")?;
        match self.state {
            SessionState::InProgress => Ok(()),
            SessionState::Paused => {
                self.state = SessionState::InProgress;
                Ok(())
            }
            SessionState::Finalized => Err(EngineError::SessionAlreadyFinalized),
            _ => Err(EngineError::State { op: "resume", state: self.state.as_str() }),
        }
    }

    /// any → ABORTED; repeated aborts keep the first reason.
    pub fn abort(&mut self, reason: AbortReason) -> Result<()> {
        if self.poisoned {
            return Err(EngineError::Internal("session poisoned".into()));
        }
        if self.state == SessionState::Aborted {
            return Ok(());
        }
        self.state = SessionState::Aborted;
        self.abort_reason = Some(reason);
        Ok(())
    }

    /// IN_PROGRESS → FINALIZING → FINALIZED, all answers required.
    pub fn finalize(&mut self, bank: &BankPackage) -> Result<&FinalSnapshot> {
        self.guard("finalize")?;
        match self.state {
            SessionState::InProgress => {}
            SessionState::Finalized => return Err(EngineError::SessionAlreadyFinalized),
            _ => return Err(EngineError::State { op: "finalize", state: self.state.as_str() }),
        }
        if self.answers.len() != self.schedule.len() {
            return Err(EngineError::IncompleteQuiz {
                answered: self.answers.len(),
                total: self.schedule.len(),
            });
        }
        self.state = SessionState::Finalizing;
        let snapshot = finalize::compute(
            bank,
            &self.constants,
            &self.ledgers,
            &self.picks,
            &self.schedule,
            &self.session_id,
            &self.constants_profile,
            &mut self.rng,
        )?;
        self.final_snapshot = Some(snapshot);
        self.state = SessionState::Finalized;
        Ok(self.final_snapshot.as_ref().expect("just set"))
    }

    #[cfg(feature = "strict-fold-audit")]
    fn audit_fold(&mut self, bank: &BankPackage) -> Result<()> {
        let reference = apply::fold(bank, &self.picks, self.answers.values().map(|a| &a.delta));
        if reference != self.ledgers {
            self.poisoned = true;
            self.abort_reason =
                Some(AbortReason::Internal { detail: "ledger disagrees with answer fold".into() });
            return Err(EngineError::Internal("ledger disagrees with answer fold".into()));
        }
        Ok(())
    }

    #[cfg(not(feature = "strict-fold-audit"))]
    fn audit_fold(&mut self, _bank: &BankPackage) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
