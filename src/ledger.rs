//! Line state and face ledger (the per-session aggregates)
//!
//! Everything in here is a plain counter or a set keyed by qid. Booleans the
//! finalizer wants (`O_seen`, `contrast_seen`, membership of a family in
//! `families_hit`) are **derived from counters**, never stored, so reverting
//! an answer is strict subtraction and the flags fall out of the counts.
//!
//! Updates flow exclusively through the applicator (`apply`); nothing else
//! in the crate mutates these structures.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::bank::{BankPackage, LineCof};
use crate::ids::{FaceId, FamilyName, Qid};

/// Per-family line aggregate: C count plus O/F answer counters.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineState {
    /// Clean count; picked families are seeded with +1 at PICKED.
    pub c: u32,
    /// Number of currently-accepted answers with `lineCOF = O`.
    pub o_count: u32,
    /// Number of currently-accepted answers with `lineCOF = F`.
    pub f_count: u32,
}

impl LineState {
    /// `O_seen` is a view over the counter.
    pub fn o_seen(&self) -> bool {
        self.o_count > 0
    }

    /// `F_seen` is a view over the counter.
    pub fn f_seen(&self) -> bool {
        self.f_count > 0
    }

    /// Per-family verdict: F if any F seen, else O if any O seen, else C.
    pub fn verdict(&self) -> LineCof {
        if self.f_seen() {
            LineCof::F
        } else if self.o_seen() {
            LineCof::O
        } else {
            LineCof::C
        }
    }
}

/// Per-face aggregate counters.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FaceLedger {
    /// Qids that produced a tell for this face (one answer per qid, so this
    /// set adds/removes cleanly on apply/revert).
    pub questions_hit: BTreeSet<Qid>,
    /// Qids whose tell landed on the face's own family screen.
    pub signature_qids: BTreeSet<Qid>,
    /// Tell instances per family screen.
    pub per_family_counts: BTreeMap<FamilyName, u32>,
    /// Tell instances whose option was Clean.
    pub clean: u32,
    /// Tell instances whose option was Bent.
    pub bent: u32,
    /// Tell instances whose option was Broken.
    pub broken: u32,
    /// Tell instances using a contrast tell of the face's family.
    pub contrast_hits: u32,
}

impl FaceLedger {
    /// Q: distinct questions that hit this face.
    pub fn questions_hit(&self) -> u32 {
        self.questions_hit.len() as u32
    }

    /// F: distinct families that hit this face (derived: count > 0).
    pub fn families_hit(&self) -> u32 {
        self.per_family_counts.values().filter(|&&c| c > 0).count() as u32
    }

    /// S: distinct qids on the face's own family screen.
    pub fn signature_hits(&self) -> u32 {
        self.signature_qids.len() as u32
    }

    /// CLEAN + BENT + BROKEN.
    pub fn context_total(&self) -> u32 {
        self.clean + self.bent + self.broken
    }

    /// MFS as an exact fraction `(max per-family count, context total)`.
    ///
    /// A zero denominator means MFS = 0 by definition; callers compare with
    /// cross-multiplication, never by dividing.
    pub fn max_family_share(&self) -> (u32, u32) {
        let num = self.per_family_counts.values().copied().max().unwrap_or(0);
        (num, self.context_total())
    }

    /// CTR: whether any contrast tell was seen.
    pub fn contrast_seen(&self) -> bool {
        self.contrast_hits > 0
    }
}

/// The full mutable aggregate of a session: one line state per family, one
/// ledger per face. Keys are fixed at init from the bank.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionLedgers {
    /// Per-family line state.
    pub lines: BTreeMap<FamilyName, LineState>,
    /// Per-face ledger.
    pub faces: BTreeMap<FaceId, FaceLedger>,
}

impl SessionLedgers {
    /// Fresh zeroed ledgers with one row per bank family and face.
    pub fn for_bank(bank: &BankPackage) -> Self {
        let lines = bank
            .families()
            .iter()
            .map(|f| (f.clone(), LineState::default()))
            .collect();
        let faces = bank
            .faces()
            .map(|f| (f.id.clone(), FaceLedger::default()))
            .collect();
        Self { lines, faces }
    }

    /// Seed +1 C for every picked family (applied once, at PICKED).
    pub fn seed_picks(&mut self, picks: &BTreeSet<FamilyName>) {
        for family in picks {
            if let Some(line) = self.lines.get_mut(family) {
                line.c += 1;
            }
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
    fn verdict_prefers_f_over_o_over_c() {
        let mut line = LineState::default();
        assert_eq!(line.verdict(), LineCof::C);
        line.o_count = 1;
        assert_eq!(line.verdict(), LineCof::O);
        line.f_count = 1;
        assert_eq!(line.verdict(), LineCof::F);
        line.f_count = 0;
        assert_eq!(line.verdict(), LineCof::O);
    }

    #[test]
    fn families_hit_ignores_zeroed_counts() {
        let mut lg = FaceLedger::default();
        lg.per_family_counts.insert(FamilyName("Control".into()), 2);
        lg.per_family_counts.insert(FamilyName("Pace".into()), 0);
        assert_eq!(lg.families_hit(), 1);
    }

    #[test]
    fn max_family_share_on_empty_ledger_is_zero_over_zero() {
        let lg = FaceLedger::default();
        assert_eq!(lg.max_family_share(), (0, 0));
    }
}
