//! Replay harness
//!
//! Reconstructs a session from a `replay.v1` descriptor (same seed, bank,
//! profile, picks, and answer sequence), finalizes it, and compares snapshot
//! hashes. Determinism makes this exact: a MATCH proves the stored outcome
//! is the one the engine computes today, byte for byte.
//!
//! The run happens on a detached [`SessionRecord`]; no session store is
//! involved, so replays never collide with live sessions bound to the same
//! identity triple.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::bank::{BankPackage, Constants};
use crate::error::{EngineError, Result};
use crate::finalize::FinalSnapshot;
use crate::ids::{Qid, SessionId};
use crate::session::SessionRecord;

/// Schema tag of supported descriptors.
pub const REPLAY_SCHEMA: &str = "replay.v1";

/// One recorded answer, in submission order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplayAnswer {
    /// Question id.
    pub qid: Qid,
    /// Picked option key.
    pub key: String,
}

/// The replay descriptor, as persisted by collaborators.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplayDescriptor {
    /// Must be [`REPLAY_SCHEMA`].
    pub schema: String,
    /// Original session seed.
    pub session_seed: String,
    /// Logical bank id (cross-checked against the loaded bank).
    pub bank_id: String,
    /// Bank hash the session was bound to.
    pub bank_hash_sha256: String,
    /// Constants profile in effect.
    pub constants_profile: String,
    /// Picked families.
    #[serde(default)]
    pub picks: Vec<String>,
    /// Answers in original submission order (later entries may replace
    /// earlier ones for the same qid, exactly as the live session did).
    pub answers: Vec<ReplayAnswer>,
    /// Expected snapshot hash, when the caller has one to verify against.
    #[serde(default)]
    pub expected_snapshot_hash: Option<String>,
}

/// Verdict of a replay run.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplayOutcome {
    /// Computed hash equals the expected hash.
    Match,
    /// Computed hash differs from the expected hash.
    Mismatch,
    /// No expected hash was supplied; the computed hash stands alone.
    Unverified,
}

/// One diverging field between expected and computed snapshots.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldDiff {
    /// Dotted field locator (e.g. `line_verdicts.Control`).
    pub field: String,
    /// Expected rendering.
    pub expected: String,
    /// Computed rendering.
    pub got: String,
}

/// Full replay report.
#[derive(Clone, Debug, Serialize)]
pub struct ReplayReport {
    /// MATCH / MISMATCH / UNVERIFIED.
    pub outcome: ReplayOutcome,
    /// Session id the replay derived (equals the original's).
    pub session_id: SessionId,
    /// Hash of the recomputed snapshot.
    pub computed_hash: String,
    /// Expected hash, when supplied.
    pub expected_hash: Option<String>,
    /// The recomputed snapshot (verdicts, face states, reps, anchor).
    pub snapshot: FinalSnapshot,
    /// Field-level diff, when an expected snapshot was supplied and differs.
    pub diff: Vec<FieldDiff>,
}

/// Execute a descriptor against a loaded bank.
///
/// `constants` is the profile the original session ran under (resolved by
/// the caller; see `Engine::replay`). `expected_snapshot`, when available,
/// enables the field-level diff on mismatch.
pub fn run(
    bank: &BankPackage,
    constants: Constants,
    descriptor: &ReplayDescriptor,
    expected_snapshot: Option<&FinalSnapshot>,
) -> Result<ReplayReport> {
    if descriptor.schema != REPLAY_SCHEMA {
        return Err(EngineError::Internal(format!(
            "unsupported replay schema {:?}",
            descriptor.schema
        )));
    }
    if descriptor.bank_hash_sha256 != bank.hash() {
        return Err(EngineError::BankNotFound(descriptor.bank_hash_sha256.clone()));
    }
    if descriptor.bank_id != bank.meta().bank_id {
        return Err(EngineError::BankNotFound(format!(
            "descriptor bank_id {} does not match loaded bank {}",
            descriptor.bank_id,
            bank.meta().bank_id
        )));
    }

    let mut record = SessionRecord::new(
        bank,
        &descriptor.session_seed,
        &descriptor.constants_profile,
        constants,
        0,
    );
    record.set_picks(bank, &descriptor.picks)?;
    for answer in &descriptor.answers {
        record.submit_answer(bank, &answer.qid, &answer.key, 0, None)?;
    }
    let snapshot = record.finalize(bank)?.clone();
    let computed_hash = snapshot.hash_hex()?;

    let expected_hash = descriptor
        .expected_snapshot_hash
        .clone()
        .or_else(|| expected_snapshot.and_then(|s| s.hash_hex().ok()));
    let outcome = match &expected_hash {
        None => ReplayOutcome::Unverified,
        Some(expected) if *expected == computed_hash => ReplayOutcome::Match,
        Some(_) => ReplayOutcome::Mismatch,
    };
    let diff = match (outcome, expected_snapshot) {
        (ReplayOutcome::Mismatch, Some(expected)) => diff_snapshots(expected, &snapshot),
        _ => Vec::new(),
    };

    Ok(ReplayReport {
        outcome,
        session_id: record.session_id.clone(),
        computed_hash,
        expected_hash,
        snapshot,
        diff,
    })
}

/// Field-level comparison of two snapshots, in the order auditors read
/// them: line verdicts, face states, representatives, anchor.
pub fn diff_snapshots(expected: &FinalSnapshot, got: &FinalSnapshot) -> Vec<FieldDiff> {
    let mut diff = Vec::new();

    for (family, expected_verdict) in &expected.line_verdicts {
        let got_verdict = got.line_verdicts.get(family);
        if got_verdict != Some(expected_verdict) {
            diff.push(FieldDiff {
                field: format!("line_verdicts.{family}"),
                expected: expected_verdict.to_string(),
                got: got_verdict.map(|v| v.to_string()).unwrap_or_else(|| "<missing>".into()),
            });
        }
    }

    for (face, expected_summary) in &expected.face_states {
        let got_state = got.face_states.get(face).map(|s| s.state);
        if got_state != Some(expected_summary.state) {
            diff.push(FieldDiff {
                field: format!("face_states.{face}"),
                expected: expected_summary.state.to_string(),
                got: got_state.map(|s| s.to_string()).unwrap_or_else(|| "<missing>".into()),
            });
        }
    }

    for (family, expected_rep) in &expected.family_reps {
        let got_rep = got.family_reps.get(family);
        if got_rep.map(|r| (&r.face, r.co_present))
            != Some((&expected_rep.face, expected_rep.co_present))
        {
            diff.push(FieldDiff {
                field: format!("family_reps.{family}"),
                expected: format!("{} (co_present={})", expected_rep.face, expected_rep.co_present),
                got: got_rep
                    .map(|r| format!("{} (co_present={})", r.face, r.co_present))
                    .unwrap_or_else(|| "<missing>".into()),
            });
        }
    }

    if expected.anchor_family != got.anchor_family {
        let render = |a: &Option<crate::ids::FamilyName>| {
            a.as_ref().map(|f| f.to_string()).unwrap_or_else(|| "null".into())
        };
        diff.push(FieldDiff {
            field: "anchor_family".into(),
            expected: render(&expected.anchor_family),
            got: render(&got.anchor_family),
        });
    }

    diff
}

/// Build a descriptor from a finished session record.
///
/// Collaborators typically persist this next to the snapshot hash so any
/// stored result can be re-proven later.
pub fn descriptor_for(record: &SessionRecord) -> ReplayDescriptor {
    ReplayDescriptor {
        schema: REPLAY_SCHEMA.to_string(),
        session_seed: record.session_seed.clone(),
        bank_id: record
            .final_snapshot
            .as_ref()
            .map(|s| s.bank_id.clone())
            .unwrap_or_default(),
        bank_hash_sha256: record.bank_hash.clone(),
        constants_profile: record.constants_profile.clone(),
        picks: record.picks.iter().map(|f| f.0.clone()).collect(),
        answers: record
            .answers
            .iter()
            .map(|(qid, a)| ReplayAnswer { qid: qid.clone(), key: a.option_key.clone() })
            .collect(),
        expected_snapshot_hash: record
            .final_snapshot
            .as_ref()
            .and_then(|s| s.hash_hex().ok()),
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

    fn load_demo() -> std::sync::Arc<bank::BankPackage> {
        let mut artifact = authoring::demo_bank();
        authoring::seal(&mut artifact, KEY, "test-signer").unwrap();
        bank::load_value(&artifact, KEY).unwrap()
    }

    fn finished_record(bank: &bank::BankPackage, seed: &str) -> SessionRecord {
        let mut record =
            SessionRecord::new(bank, seed, "default", bank.constants().clone(), 0);
        record.set_picks(bank, &["Control".into(), "Truth".into()]).unwrap();
        while let Ok(view) = record.next_question(bank) {
            record.submit_answer(bank, &view.qid, "A", 0, None).unwrap();
        }
        record.finalize(bank).unwrap();
        record
    }

    #[test]
    fn replay_of_a_real_session_matches() {
        let bank = load_demo();
        let record = finished_record(&bank, "replay-match");
        let descriptor = descriptor_for(&record);

        let report = run(&bank, bank.constants().clone(), &descriptor, None).unwrap();
        assert_eq!(report.outcome, ReplayOutcome::Match);
        assert_eq!(report.session_id, record.session_id);
        assert!(report.diff.is_empty());
    }

    #[test]
    fn tampered_answer_mismatches_with_diff() {
        let bank = load_demo();
        let record = finished_record(&bank, "replay-diff");
        let expected = record.final_snapshot.clone().unwrap();
        let mut descriptor = descriptor_for(&record);
        // Flip one answer to the other option.
        descriptor.answers[0].key = "B".into();

        let report =
            run(&bank, bank.constants().clone(), &descriptor, Some(&expected)).unwrap();
        assert_eq!(report.outcome, ReplayOutcome::Mismatch);
        assert!(!report.diff.is_empty(), "a flipped answer must move some field");
    }

    #[test]
    fn descriptor_without_expectation_is_unverified() {
        let bank = load_demo();
        let record = finished_record(&bank, "replay-unverified");
        let mut descriptor = descriptor_for(&record);
        descriptor.expected_snapshot_hash = None;
        let report = run(&bank, bank.constants().clone(), &descriptor, None).unwrap();
        assert_eq!(report.outcome, ReplayOutcome::Unverified);
    }

    #[test]
    fn wrong_schema_is_rejected() {
        let bank = load_demo();
        let record = finished_record(&bank, "replay-schema");
        let mut descriptor = descriptor_for(&record);
        descriptor.schema = "replay.v0".into();
        assert!(run(&bank, bank.constants().clone(), &descriptor, None).is_err());
    }
}
