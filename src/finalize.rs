//! Finalization: face states, line verdicts, representatives, anchor
//!
//! The finalizer is a pure pass over the session's ledgers. It never touches
//! wall-clock or any shared state, so the produced [`FinalSnapshot`] is a
//! function of (seed, bank-hash, constants-profile, picks, answers) alone.
//!
//! Classification is first-match-wins down the lattice
//! LIT → LEAN → GHOST → COLD → ABSENT. All share comparisons (MFS vs the
//! per-screen cap, and the "lower MFS" tiebreak) are exact integer
//! cross-multiplications; no division, no floats.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::bank::{BankPackage, Constants, LineCof};
use crate::canonical;
use crate::error::{EngineError, Result};
use crate::ids::{FaceId, FamilyName, SessionId};
use crate::ledger::{FaceLedger, SessionLedgers};
use crate::rng::SessionRng;
use crate::schedule::{self, ScheduledQuestion};

/// Finalized presence state of a face.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaceState {
    /// Full presence: broad, signed, clean, contrast-confirmed.
    Lit,
    /// Partial presence.
    Lean,
    /// Gated out: concentrated, broken-heavy, or cap-exceeding evidence.
    Ghost,
    /// Thin but multi-family evidence.
    Cold,
    /// No meaningful evidence.
    Absent,
}

impl FaceState {
    /// Render as the uppercase tag used in snapshots.
    pub fn as_str(&self) -> &'static str {
        match self {
            FaceState::Lit => "LIT",
            FaceState::Lean => "LEAN",
            FaceState::Ghost => "GHOST",
            FaceState::Cold => "COLD",
            FaceState::Absent => "ABSENT",
        }
    }
}

impl std::fmt::Display for FaceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `num/den <= cap_bp/10000`, with `den == 0` meaning a share of zero.
fn share_within_cap(num: u32, den: u32, cap_bp: u32) -> bool {
    (num as u64) * 10_000 <= (cap_bp as u64) * (den as u64)
}

/// Classify one face ledger against the threshold lattice.
pub fn classify(lg: &FaceLedger, k: &Constants) -> FaceState {
    let q = lg.questions_hit();
    let f = lg.families_hit();
    let s = lg.signature_hits();
    let (clean, broken) = (lg.clean, lg.broken);
    let (mfs_num, mfs_den) = lg.max_family_share();

    let lit = q >= k.lit_min_questions
        && f >= k.lit_min_families
        && s >= k.lit_min_signature
        && clean >= k.lit_min_clean
        && broken <= k.lit_max_broken
        && broken < clean
        && share_within_cap(mfs_num, mfs_den, k.per_screen_cap_bp)
        && lg.contrast_seen();
    if lit {
        return FaceState::Lit;
    }

    let lean = q >= k.lean_min_questions
        && f >= k.lean_min_families
        && s >= k.lean_min_signature
        && clean >= k.lean_min_clean
        && broken < clean;
    if lean {
        return FaceState::Lean;
    }

    let ghost = (q >= k.ghost_min_questions && f <= k.ghost_max_families)
        || (broken >= clean && q >= k.lean_min_questions)
        || (!share_within_cap(mfs_num, mfs_den, k.per_screen_cap_bp)
            && q >= k.lean_min_questions);
    if ghost {
        return FaceState::Ghost;
    }

    if q >= k.cold_min_questions && q <= k.cold_max_questions && f >= k.cold_min_families {
        return FaceState::Cold;
    }

    FaceState::Absent
}

/// Representative of a family in the snapshot.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FamilyRep {
    /// The chosen sibling.
    pub face: FaceId,
    /// Both siblings landed in the same non-ABSENT state.
    pub co_present: bool,
}

/// Ledger summary carried per face in the snapshot (for audit diffs).
#[allow(missing_docs)]
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FaceSummary {
    /// Derived presence state.
    pub state: FaceState,
    pub questions_hit: u32,
    pub families_hit: u32,
    pub signature_hits: u32,
    pub clean: u32,
    pub bent: u32,
    pub broken: u32,
    pub contrast_seen: bool,
}

/// The immutable result of finalization.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinalSnapshot {
    /// Snapshot schema tag.
    pub schema: String,
    /// Session this snapshot belongs to.
    pub session_id: SessionId,
    /// Logical bank id.
    pub bank_id: String,
    /// Bank the session was bound to.
    pub bank_hash: String,
    /// Constants profile in effect.
    pub constants_profile: String,
    /// Picked families, sorted.
    pub picks: Vec<FamilyName>,
    /// Per-family verdict.
    pub line_verdicts: BTreeMap<FamilyName, LineCof>,
    /// Per-face state and counters.
    pub face_states: BTreeMap<FaceId, FaceSummary>,
    /// Per-family representative.
    pub family_reps: BTreeMap<FamilyName, FamilyRep>,
    /// Anchor family (always outside `picks`; `None` iff all seven picked).
    pub anchor_family: Option<FamilyName>,
}

/// Schema tag written into every snapshot.
pub const SNAPSHOT_SCHEMA: &str = "facekit.final.v1";

impl FinalSnapshot {
    /// Canonical SHA-256 of the snapshot, the replay comparison key.
    pub fn hash_hex(&self) -> Result<String> {
        let value = serde_json::to_value(self)
            .map_err(|e| EngineError::Internal(format!("snapshot serialize: {e}")))?;
        canonical::canonical_hash_hex(&value)
            .map_err(|e| EngineError::Internal(format!("snapshot canonicalize: {e}")))
    }
}

/// Apply the §-ordered tiebreak chain to two siblings. Returns the winner.
///
/// Chain: higher signature hits, higher families hit, higher CLEAN, lower
/// BROKEN, lower MFS, lower face id, then a draw from the session stream
/// (unreachable while face ids are distinct; kept as the terminal guard).
fn break_tie<'a>(
    a: (&'a FaceId, &FaceLedger),
    b: (&'a FaceId, &FaceLedger),
    rng: &mut SessionRng,
) -> &'a FaceId {
    let (a_id, la) = a;
    let (b_id, lb) = b;

    if la.signature_hits() != lb.signature_hits() {
        return if la.signature_hits() > lb.signature_hits() { a_id } else { b_id };
    }
    if la.families_hit() != lb.families_hit() {
        return if la.families_hit() > lb.families_hit() { a_id } else { b_id };
    }
    if la.clean != lb.clean {
        return if la.clean > lb.clean { a_id } else { b_id };
    }
    if la.broken != lb.broken {
        return if la.broken < lb.broken { a_id } else { b_id };
    }
    let (an, ad) = la.max_family_share();
    let (bn, bd) = lb.max_family_share();
    let a_cross = (an as u64) * (bd as u64);
    let b_cross = (bn as u64) * (ad as u64);
    if a_cross != b_cross {
        return if a_cross < b_cross { a_id } else { b_id };
    }
    if a_id != b_id {
        return if a_id < b_id { a_id } else { b_id };
    }
    let pair = [a_id, b_id];
    *rng.choice(&pair).expect("two candidates")
}

/// Resolve the representative between two siblings with derived states.
fn resolve_rep<'a>(
    a: (&'a FaceId, &FaceLedger, FaceState),
    b: (&'a FaceId, &FaceLedger, FaceState),
    rng: &mut SessionRng,
) -> &'a FaceId {
    let (a_id, la, sa) = a;
    let (b_id, lb, sb) = b;

    match (sa == FaceState::Lit, sb == FaceState::Lit) {
        (true, false) => return a_id,
        (false, true) => return b_id,
        (true, true) => return break_tie((a_id, la), (b_id, lb), rng),
        (false, false) => {}
    }
    match (sa == FaceState::Lean, sb == FaceState::Lean) {
        (true, false) => return a_id,
        (false, true) => return b_id,
        (true, true) => return break_tie((a_id, la), (b_id, lb), rng),
        (false, false) => {}
    }
    match (sa == FaceState::Ghost, sb == FaceState::Ghost) {
        (false, true) => return a_id,
        (true, false) => return b_id,
        _ => {}
    }
    break_tie((a_id, la), (b_id, lb), rng)
}

/// Compute the full snapshot. Pure except for the terminal tie-break draw.
#[allow(clippy::too_many_arguments)]
pub fn compute(
    bank: &BankPackage,
    constants: &Constants,
    ledgers: &SessionLedgers,
    picks: &BTreeSet<FamilyName>,
    sched: &[ScheduledQuestion],
    session_id: &SessionId,
    constants_profile: &str,
    rng: &mut SessionRng,
) -> Result<FinalSnapshot> {
    // Line verdicts.
    let mut line_verdicts = BTreeMap::new();
    for (family, line) in &ledgers.lines {
        line_verdicts.insert(family.clone(), line.verdict());
    }

    // Face states.
    let mut states: BTreeMap<FaceId, FaceState> = BTreeMap::new();
    let mut face_states = BTreeMap::new();
    for (face_id, lg) in &ledgers.faces {
        let state = classify(lg, constants);
        states.insert(face_id.clone(), state);
        face_states.insert(
            face_id.clone(),
            FaceSummary {
                state,
                questions_hit: lg.questions_hit(),
                families_hit: lg.families_hit(),
                signature_hits: lg.signature_hits(),
                clean: lg.clean,
                bent: lg.bent,
                broken: lg.broken,
                contrast_seen: lg.contrast_seen(),
            },
        );
    }

    // Family representatives.
    let mut family_reps = BTreeMap::new();
    for family in bank.families() {
        let siblings = bank.faces_of(family);
        let [a_id, b_id] = siblings else {
            return Err(EngineError::Internal(format!(
                "family {family} does not have two faces"
            )));
        };
        let la = ledgers
            .faces
            .get(a_id)
            .ok_or_else(|| EngineError::FaceNotFound(a_id.clone()))?;
        let lb = ledgers
            .faces
            .get(b_id)
            .ok_or_else(|| EngineError::FaceNotFound(b_id.clone()))?;
        let sa = states[a_id];
        let sb = states[b_id];
        let winner = resolve_rep((a_id, la, sa), (b_id, lb, sb), rng).clone();
        let co_present = sa == sb && sa != FaceState::Absent;
        family_reps.insert(family.clone(), FamilyRep { face: winner, co_present });
    }

    // Anchor: best verdict (C over O over F) among unpicked families, ties
    // going to the earlier shuffle position.
    let order = schedule::family_order(sched);
    let mut anchor: Option<(&FamilyName, u8)> = None;
    for family in &order {
        if picks.contains(family) {
            continue;
        }
        let rank = match line_verdicts.get(family) {
            Some(LineCof::C) | None => 0u8,
            Some(LineCof::O) => 1,
            Some(LineCof::F) => 2,
        };
        match anchor {
            Some((_, best)) if best <= rank => {}
            _ => anchor = Some((family, rank)),
        }
    }

    Ok(FinalSnapshot {
        schema: SNAPSHOT_SCHEMA.to_string(),
        session_id: session_id.clone(),
        bank_id: bank.meta().bank_id.clone(),
        bank_hash: bank.hash().to_string(),
        constants_profile: constants_profile.to_string(),
        picks: picks.iter().cloned().collect(),
        line_verdicts,
        face_states,
        family_reps,
        anchor_family: anchor.map(|(f, _)| f.clone()),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Qid;

    fn ledger(
        q: u32,
        families: u32,
        sig: u32,
        clean: u32,
        bent: u32,
        broken: u32,
        contrast: u32,
    ) -> FaceLedger {
        let mut lg = FaceLedger::default();
        for i in 0..q {
            lg.questions_hit.insert(Qid(format!("FAM{i}_Q1")));
        }
        for i in 0..sig {
            lg.signature_qids.insert(Qid(format!("FAM{i}_Q1")));
        }
        let total = clean + bent + broken;
        if families > 0 && total > 0 {
            // Spread the context total over `families` screens as evenly as
            // possible so MFS stays low unless the test wants otherwise.
            let base = total / families;
            let mut rem = total % families;
            for i in 0..families {
                let mut n = base;
                if rem > 0 {
                    n += 1;
                    rem -= 1;
                }
                lg.per_family_counts.insert(FamilyName(format!("Fam{}", (b'A' + i as u8) as char)), n);
            }
        }
        lg.clean = clean;
        lg.bent = bent;
        lg.broken = broken;
        lg.contrast_hits = contrast;
        lg
    }

    #[test]
    fn lit_requires_every_gate() {
        let k = Constants::default();
        let lg = ledger(6, 4, 2, 5, 2, 0, 1);
        assert_eq!(classify(&lg, &k), FaceState::Lit);

        // Missing contrast drops to LEAN.
        let lg = ledger(6, 4, 2, 5, 2, 0, 0);
        assert_eq!(classify(&lg, &k), FaceState::Lean);

        // Too much broken drops out of LIT.
        let lg = ledger(6, 4, 2, 5, 0, 2, 1);
        assert_eq!(classify(&lg, &k), FaceState::Lean);
    }

    #[test]
    fn ghost_gates_concentration() {
        let k = Constants::default();
        // Six questions but only two families: concentrated.
        let lg = ledger(6, 2, 2, 5, 1, 0, 1);
        assert_eq!(classify(&lg, &k), FaceState::Ghost);
        // Broken-heavy with enough questions.
        let lg = ledger(4, 3, 1, 1, 0, 3, 0);
        assert_eq!(classify(&lg, &k), FaceState::Ghost);
    }

    #[test]
    fn cold_is_thin_but_spread() {
        let k = Constants::default();
        let lg = ledger(2, 2, 0, 1, 1, 0, 0);
        assert_eq!(classify(&lg, &k), FaceState::Cold);
        let lg = ledger(1, 1, 0, 1, 0, 0, 0);
        assert_eq!(classify(&lg, &k), FaceState::Absent);
    }

    #[test]
    fn per_screen_cap_uses_exact_fractions() {
        let k = Constants::default(); // 4000 bp
        let mut lg = ledger(6, 4, 2, 5, 2, 0, 1);
        // Force one screen to 3 of 7 instances: 3/7 ≈ 0.4286 > 0.40.
        lg.per_family_counts.clear();
        lg.per_family_counts.insert(FamilyName("FamA".into()), 3);
        lg.per_family_counts.insert(FamilyName("FamB".into()), 2);
        lg.per_family_counts.insert(FamilyName("FamC".into()), 1);
        lg.per_family_counts.insert(FamilyName("FamD".into()), 1);
        assert_ne!(classify(&lg, &k), FaceState::Lit);

        // 2/7 < 0.40 on the biggest screen keeps LIT.
        lg.per_family_counts.insert(FamilyName("FamA".into()), 2);
        lg.per_family_counts.insert(FamilyName("FamE".into()), 1);
        assert_eq!(classify(&lg, &k), FaceState::Lit);
    }

    #[test]
    fn positive_signal_never_downgrades() {
        // Classification monotonicity spot-check: grow clean/signature/
        // families from a LEAN ledger and observe only upgrades.
        let k = Constants::default();
        let rank = |s: FaceState| match s {
            FaceState::Lit => 4,
            FaceState::Lean => 3,
            FaceState::Cold => 2,
            FaceState::Absent => 1,
            FaceState::Ghost => 0, // gate, excluded from the sweep below
        };
        let base = ledger(4, 3, 1, 2, 1, 0, 0);
        let before = classify(&base, &k);
        assert_eq!(before, FaceState::Lean);
        for extra in 1..4u32 {
            let grown = ledger(4 + extra, 3 + extra.min(3), 1 + extra, 2 + extra, 1, 0, 1);
            let after = classify(&grown, &k);
            assert!(
                rank(after) >= rank(before),
                "adding positive signal downgraded {before} -> {after}"
            );
        }
    }

    #[test]
    fn tiebreak_chain_orders_by_signature_first() {
        let mut rng = SessionRng::derive("tie", &"ab".repeat(32), "default");
        let a_id = FaceId("FACE/Control/Rebel".into());
        let b_id = FaceId("FACE/Control/Sovereign".into());
        let mut la = ledger(6, 4, 3, 5, 2, 0, 1);
        let lb = ledger(6, 4, 2, 5, 2, 0, 1);
        assert_eq!(
            break_tie((&a_id, &la), (&b_id, &lb), &mut rng),
            &a_id,
            "higher signature wins"
        );
        // Equalize signature; identical ledgers fall to the lower face id.
        la.signature_qids = lb.signature_qids.clone();
        let expected = if a_id < b_id { a_id.clone() } else { b_id.clone() };
        let winner = break_tie((&a_id, &la), (&b_id, &lb), &mut rng);
        assert_eq!(winner, &expected);
    }
}
