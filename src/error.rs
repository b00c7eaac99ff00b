//! Engine error taxonomy (stable codes)
//!
//! Every core operation surfaces exactly one [`EngineError`]. The `E_*` codes
//! returned by [`EngineError::code`] are a stable contract with collaborators;
//! adding variants is backward-compatible, renaming codes is not.
//!
//! [`Severity`] groups the codes the way an ingress adapter maps them:
//! validation failures (4xx-equivalent), state conflicts (409-equivalent),
//! and bank/internal faults (5xx-equivalent).

#![forbid(unsafe_code)]

use crate::ids::{FaceId, Qid, SessionId};

/// Coarse error class, used by ingress adapters to pick a transport status.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Severity {
    /// Caller-side input problem.
    Validation,
    /// The operation is not legal in the session's current state.
    Conflict,
    /// Bank artifact or internal fault.
    Fault,
}

/// All errors surfaced by core operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Session seed failed validation (empty or over-long).
    #[error("invalid session seed: {0}")]
    InvalidSessionSeed(String),

    /// No session with this id is present in the store.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// The session is already finalized; its snapshot is write-once.
    #[error("session already finalized")]
    SessionAlreadyFinalized,

    /// The session was aborted for expiry; no further operations are allowed.
    #[error("session expired")]
    SessionExpired,

    /// The bank artifact violates a structural invariant.
    #[error("bank defect: {0}")]
    BankDefect(String),

    /// No bank with this hash is registered (or it is not whitelisted).
    #[error("bank not found: {0}")]
    BankNotFound(String),

    /// The artifact bytes could not be parsed at all.
    #[error("bank corrupted: {0}")]
    BankCorrupted(String),

    /// HMAC signature did not verify over the canonical bytes.
    #[error("bank signature invalid")]
    BankSignatureInvalid,

    /// Registration would move a bank id backwards (updates are forward-only).
    #[error("bank version mismatch for {bank_id}: registered {registered}, offered {offered}")]
    BankVersionMismatch {
        /// Logical bank id.
        bank_id: String,
        /// Version already registered.
        registered: String,
        /// Version offered by the new artifact.
        offered: String,
    },

    /// The operation is not legal in the current state.
    #[error("operation {op} not allowed in state {state}")]
    State {
        /// Name of the attempted operation.
        op: &'static str,
        /// Current session state, rendered.
        state: &'static str,
    },

    /// An explicit transition between two named states is not in the machine.
    #[error("invalid state transition {from} -> {to}")]
    StateTransitionInvalid {
        /// Origin state.
        from: &'static str,
        /// Requested target state.
        to: &'static str,
    },

    /// More than seven families picked.
    #[error("pick count {0} exceeds 7")]
    PickCount(usize),

    /// A pick names a family the bank does not define.
    #[error("unknown family: {0}")]
    InvalidFamily(String),

    /// The same family appears twice in the pick list.
    #[error("duplicate family in picks: {0}")]
    DuplicateFamily(String),

    /// The qid is not defined by the bank.
    #[error("question not found: {0}")]
    QuestionNotFound(Qid),

    /// The qid is not part of this session's schedule.
    #[error("qid not in schedule: {0}")]
    BadQid(Qid),

    /// Every scheduled question has an accepted answer already.
    #[error("quiz complete")]
    QuizComplete,

    /// Finalize called before every scheduled question was answered.
    #[error("incomplete quiz: {answered} of {total} answered")]
    IncompleteQuiz {
        /// Accepted answers so far.
        answered: usize,
        /// Schedule length.
        total: usize,
    },

    /// The option key is not one of the question's options.
    #[error("invalid option {key:?} for {qid}")]
    InvalidOption {
        /// Target question.
        qid: Qid,
        /// Offered option key.
        key: String,
    },

    /// Reserved: never raised by the core (ingestion is order-free).
    /// Collaborators that enforce presentation order may use it.
    #[error("answer out of order: {0}")]
    AnswerOutOfOrder(Qid),

    /// No constants profile with this name is authored or configured.
    #[error("constants profile not found: {0}")]
    ProfileNotFound(String),

    /// A post-condition audit failed; the session is poisoned.
    #[error("internal invariant violated: {0}")]
    Internal(String),

    /// Sibling-resolution found a face with no ledger entry (bank/ledger skew).
    #[error("face not found: {0}")]
    FaceNotFound(FaceId),
}

impl EngineError {
    /// Stable taxonomy code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidSessionSeed(_) => "E_INVALID_SESSION_SEED",
            EngineError::SessionNotFound(_) => "E_SESSION_NOT_FOUND",
            EngineError::SessionAlreadyFinalized => "E_SESSION_ALREADY_FINALIZED",
            EngineError::SessionExpired => "E_SESSION_EXPIRED",
            EngineError::BankDefect(_) => "E_BANK_DEFECT",
            EngineError::BankNotFound(_) => "E_BANK_NOT_FOUND",
            EngineError::BankCorrupted(_) => "E_BANK_CORRUPTED",
            EngineError::BankSignatureInvalid => "E_BANK_SIGNATURE_INVALID",
            EngineError::BankVersionMismatch { .. } => "E_BANK_VERSION_MISMATCH",
            EngineError::State { .. } => "E_STATE",
            EngineError::StateTransitionInvalid { .. } => "E_STATE_TRANSITION_INVALID",
            EngineError::PickCount(_) => "E_PICK_COUNT",
            EngineError::InvalidFamily(_) => "E_INVALID_FAMILY",
            EngineError::DuplicateFamily(_) => "E_DUPLICATE_FAMILY",
            EngineError::QuestionNotFound(_) => "E_QUESTION_NOT_FOUND",
            EngineError::BadQid(_) => "E_BAD_QID",
            EngineError::QuizComplete => "E_QUIZ_COMPLETE",
            EngineError::IncompleteQuiz { .. } => "E_INCOMPLETE_QUIZ",
            EngineError::InvalidOption { .. } => "E_INVALID_OPTION",
            EngineError::AnswerOutOfOrder(_) => "E_ANSWER_OUT_OF_ORDER",
            EngineError::ProfileNotFound(_) => "E_PROFILE_NOT_FOUND",
            EngineError::Internal(_) => "E_INTERNAL",
            EngineError::FaceNotFound(_) => "E_INTERNAL",
        }
    }

    /// Severity class for ingress mapping.
    pub fn severity(&self) -> Severity {
        match self {
            EngineError::InvalidSessionSeed(_)
            | EngineError::PickCount(_)
            | EngineError::InvalidFamily(_)
            | EngineError::DuplicateFamily(_)
            | EngineError::QuestionNotFound(_)
            | EngineError::BadQid(_)
            | EngineError::InvalidOption { .. }
            | EngineError::AnswerOutOfOrder(_)
            | EngineError::ProfileNotFound(_)
            | EngineError::SessionNotFound(_) => Severity::Validation,

            EngineError::SessionAlreadyFinalized
            | EngineError::SessionExpired
            | EngineError::State { .. }
            | EngineError::StateTransitionInvalid { .. }
            | EngineError::QuizComplete
            | EngineError::IncompleteQuiz { .. } => Severity::Conflict,

            EngineError::BankDefect(_)
            | EngineError::BankNotFound(_)
            | EngineError::BankCorrupted(_)
            | EngineError::BankSignatureInvalid
            | EngineError::BankVersionMismatch { .. }
            | EngineError::Internal(_)
            | EngineError::FaceNotFound(_) => Severity::Fault,
        }
    }
}

/// Convenience alias for core results.
pub type Result<T> = std::result::Result<T, EngineError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Qid;

    #[test]
    fn codes_are_stable() {
        assert_eq!(EngineError::QuizComplete.code(), "E_QUIZ_COMPLETE");
        assert_eq!(EngineError::BankSignatureInvalid.code(), "E_BANK_SIGNATURE_INVALID");
        assert_eq!(
            EngineError::BadQid(Qid("CTRL_Q1".into())).code(),
            "E_BAD_QID"
        );
    }

    #[test]
    fn severity_classes() {
        assert_eq!(
            EngineError::InvalidOption { qid: Qid("CTRL_Q1".into()), key: "Z".into() }.severity(),
            Severity::Validation
        );
        assert_eq!(EngineError::SessionAlreadyFinalized.severity(), Severity::Conflict);
        assert_eq!(EngineError::BankSignatureInvalid.severity(), Severity::Fault);
    }
}
