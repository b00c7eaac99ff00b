//! Answer applicator: per-answer deltas, applied and reverted exactly
//!
//! Every accepted answer is first compiled against the bank into an
//! [`AnswerDelta`]: the family line effect plus one [`TellMark`] per tell on
//! the picked option. Applying adds the delta to the ledgers; reverting
//! subtracts the very same delta. Replacement of an answer is therefore
//! revert(old) + apply(new), and the ledgers are always the fold of the
//! currently-accepted answer set regardless of history.
//!
//! The delta is stored inside the session's answer record, so reversion
//! never recomputes anything against the bank.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::bank::{BankPackage, LineCof};
use crate::error::EngineError;
use crate::ids::{FaceId, FamilyName, Qid, TellId};
use crate::ledger::SessionLedgers;

/// One tell instance produced by an answer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TellMark {
    /// Face the tell belongs to.
    pub face: FaceId,
    /// The tell itself.
    pub tell: TellId,
    /// Family screen the question sits on.
    pub screen: FamilyName,
    /// Question that produced the mark.
    pub qid: Qid,
    /// True when the screen is the face's own family.
    pub is_signature: bool,
    /// The option's line tag (Clean/Bent/Broken context).
    pub context: LineCof,
    /// True when the tell is in the contrast set of the face's family.
    pub is_contrast: bool,
}

/// The complete, reversible effect of a single answer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerDelta {
    /// Family screen of the answered question.
    pub family: FamilyName,
    /// Line tag of the picked option.
    pub line: LineCof,
    /// Tell marks carried by the picked option.
    pub marks: Vec<TellMark>,
}

/// Compile the delta for `(qid, option_key)` against the bank.
///
/// Fails with `E_QUESTION_NOT_FOUND` / `E_INVALID_OPTION`; schedule
/// membership is the session's concern, not this module's.
pub fn compile(
    bank: &BankPackage,
    qid: &Qid,
    option_key: &str,
) -> Result<AnswerDelta, EngineError> {
    let question = bank
        .question(qid)
        .ok_or_else(|| EngineError::QuestionNotFound(qid.clone()))?;
    let screen = bank
        .family_of_question(qid)
        .ok_or_else(|| EngineError::QuestionNotFound(qid.clone()))?
        .clone();
    let option = question.option(option_key).ok_or_else(|| EngineError::InvalidOption {
        qid: qid.clone(),
        key: option_key.to_string(),
    })?;

    let mut marks = Vec::with_capacity(option.tells.len());
    for tell_id in &option.tells {
        let tell = bank
            .tell(tell_id)
            .ok_or_else(|| EngineError::Internal(format!("option references unknown tell {tell_id}")))?;
        marks.push(TellMark {
            face: tell.face.clone(),
            tell: tell_id.clone(),
            screen: screen.clone(),
            qid: qid.clone(),
            is_signature: tell.family == screen,
            context: option.line_cof,
            is_contrast: tell.contrast,
        });
    }

    Ok(AnswerDelta { family: screen, line: option.line_cof, marks })
}

/// Add the delta to the ledgers.
pub fn apply(ledgers: &mut SessionLedgers, delta: &AnswerDelta) {
    if let Some(line) = ledgers.lines.get_mut(&delta.family) {
        match delta.line {
            LineCof::C => line.c += 1,
            LineCof::O => line.o_count += 1,
            LineCof::F => line.f_count += 1,
        }
    }
    for mark in &delta.marks {
        let Some(face) = ledgers.faces.get_mut(&mark.face) else {
            continue;
        };
        face.questions_hit.insert(mark.qid.clone());
        if mark.is_signature {
            face.signature_qids.insert(mark.qid.clone());
        }
        *face.per_family_counts.entry(mark.screen.clone()).or_default() += 1;
        match mark.context {
            LineCof::C => face.clean += 1,
            LineCof::O => face.bent += 1,
            LineCof::F => face.broken += 1,
        }
        if mark.is_contrast {
            face.contrast_hits += 1;
        }
    }
}

/// Subtract the delta from the ledgers, the exact inverse of [`apply`].
///
/// Callers only revert a delta they previously applied; the debug asserts
/// document that contract.
pub fn revert(ledgers: &mut SessionLedgers, delta: &AnswerDelta) {
    if let Some(line) = ledgers.lines.get_mut(&delta.family) {
        match delta.line {
            LineCof::C => {
                debug_assert!(line.c > 0, "revert C below zero");
                line.c = line.c.saturating_sub(1);
            }
            LineCof::O => {
                debug_assert!(line.o_count > 0, "revert O below zero");
                line.o_count = line.o_count.saturating_sub(1);
            }
            LineCof::F => {
                debug_assert!(line.f_count > 0, "revert F below zero");
                line.f_count = line.f_count.saturating_sub(1);
            }
        }
    }
    for mark in &delta.marks {
        let Some(face) = ledgers.faces.get_mut(&mark.face) else {
            continue;
        };
        face.questions_hit.remove(&mark.qid);
        if mark.is_signature {
            face.signature_qids.remove(&mark.qid);
        }
        if let Some(count) = face.per_family_counts.get_mut(&mark.screen) {
            debug_assert!(*count > 0, "revert per-family count below zero");
            *count = count.saturating_sub(1);
        }
        match mark.context {
            LineCof::C => face.clean = face.clean.saturating_sub(1),
            LineCof::O => face.bent = face.bent.saturating_sub(1),
            LineCof::F => face.broken = face.broken.saturating_sub(1),
        }
        if mark.is_contrast {
            face.contrast_hits = face.contrast_hits.saturating_sub(1);
        }
    }
}

/// Independent fold of an accepted answer set over zeroed ledgers.
///
/// This is the reference the strict-fold audit compares against; it is also
/// what the property tests use to pin "ledger = fold".
pub fn fold<'a>(
    bank: &BankPackage,
    picks: &std::collections::BTreeSet<FamilyName>,
    deltas: impl Iterator<Item = &'a AnswerDelta>,
) -> SessionLedgers {
    let mut ledgers = SessionLedgers::for_bank(bank);
    ledgers.seed_picks(picks);
    for delta in deltas {
        apply(&mut ledgers, delta);
    }
    ledgers
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authoring;
    use crate::bank;
    use std::collections::BTreeSet;

    const KEY: &[u8] = b"facekit-test-signing-key";

    fn load_demo() -> std::sync::Arc<bank::BankPackage> {
        let mut artifact = authoring::demo_bank();
        authoring::seal(&mut artifact, KEY, "test-signer").unwrap();
        bank::load_value(&artifact, KEY).unwrap()
    }

    #[test]
    fn apply_then_revert_restores_zero() {
        let bank = load_demo();
        let picks = BTreeSet::new();
        let mut ledgers = SessionLedgers::for_bank(&bank);
        let baseline = ledgers.clone();

        let qid = Qid("CTRL_Q1".into());
        let delta = compile(&bank, &qid, "A").unwrap();
        apply(&mut ledgers, &delta);
        assert_ne!(ledgers, baseline, "apply must change the ledgers");
        revert(&mut ledgers, &delta);
        assert_eq!(ledgers, baseline);

        let folded = fold(&bank, &picks, std::iter::empty());
        assert_eq!(folded, baseline);
    }

    #[test]
    fn replace_equals_fresh_apply_of_new_answer() {
        let bank = load_demo();
        let picks = BTreeSet::new();
        let qid = Qid("CTRL_Q1".into());
        let a = compile(&bank, &qid, "A").unwrap();
        let b = compile(&bank, &qid, "B").unwrap();

        let mut replaced = SessionLedgers::for_bank(&bank);
        apply(&mut replaced, &a);
        revert(&mut replaced, &a);
        apply(&mut replaced, &b);

        let fresh = fold(&bank, &picks, std::iter::once(&b));
        assert_eq!(replaced, fresh);
    }

    #[test]
    fn signature_flag_tracks_home_screen() {
        let bank = load_demo();
        let qid = Qid("CTRL_Q1".into());
        let delta = compile(&bank, &qid, "A").unwrap();
        for mark in &delta.marks {
            let face_family = bank.face(&mark.face).unwrap().family.clone();
            assert_eq!(mark.is_signature, face_family == delta.family);
        }
    }

    #[test]
    fn unknown_option_key_is_rejected() {
        let bank = load_demo();
        let qid = Qid("CTRL_Q1".into());
        match compile(&bank, &qid, "Z") {
            Err(EngineError::InvalidOption { key, .. }) => assert_eq!(key, "Z"),
            other => panic!("expected InvalidOption, got {other:?}"),
        }
    }
}
