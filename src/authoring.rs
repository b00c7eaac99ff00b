//! Bank authoring: sealing and the built-in demo bank
//!
//! [`seal`] is the inverse of loading: given an unsigned artifact it
//! computes the canonical hash, signs the same bytes with HMAC-SHA-256, and
//! installs the signature block into `meta`. Deployment tooling and the
//! fixtures both go through it, so there is exactly one writer of
//! `bank_hash` / `signature` in the codebase.
//!
//! [`demo_bank`] builds a deterministic, balanced 7×2×3 artifact: every
//! family has two faces with two tells each, three questions in C→O→F slot
//! order, and a tell spread that exercises home and away screens evenly.
//! The option-A side of every question is Clean, so an all-A run never
//! produces an F verdict; the option-B side is Bent except on the F-slot,
//! where it is Broken.

#![forbid(unsafe_code)]

use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;

use crate::bank::{strip_signature_block, BankError};
use crate::canonical;

type HmacSha256 = Hmac<Sha256>;

/// Compute and install `meta.bank_hash`, `meta.signature`, `meta.signed_by`.
///
/// Any existing signature block is replaced. Fails (without modifying the
/// artifact) when the unsigned tree cannot be canonicalized, the same
/// condition that would make the loader reject it.
pub fn seal(
    artifact: &mut serde_json::Value,
    signing_key: &[u8],
    signed_by: &str,
) -> Result<(), BankError> {
    let unsigned = strip_signature_block(artifact);
    let canon = canonical::CanonValue::from_json(&unsigned)?;
    let canon_bytes = canon.canonical_bytes();
    let bank_hash = canon.sha256_hex();

    let mut mac = HmacSha256::new_from_slice(signing_key)
        .map_err(|_| BankError::Defect("signing key unusable".into()))?;
    mac.update(&canon_bytes);
    let signature = hex::encode(mac.finalize().into_bytes());

    let meta = artifact
        .get_mut("meta")
        .and_then(|m| m.as_object_mut())
        .ok_or_else(|| BankError::Defect("artifact has no meta object".into()))?;
    meta.insert("bank_hash".into(), bank_hash.into());
    meta.insert("signature".into(), signature.into());
    meta.insert("signed_by".into(), signed_by.into());
    Ok(())
}

/// Families, faces, and tell slugs of the demo bank.
///
/// Order matters: it is the canonical family order of the artifact.
const DEMO_SHAPE: [(&str, &str, [(&str, [&str; 2]); 2]); 7] = [
    ("Control", "CTRL", [
        ("Sovereign", ["sets-terms", "owns-call"]),
        ("Rebel", ["breaks-frame", "defies-script"]),
    ]),
    ("Pace", "PACE", [
        ("Visionary", ["long-view", "names-horizon"]),
        ("Navigator", ["plots-route", "holds-course"]),
    ]),
    ("Boundary", "BOUND", [
        ("Guardian", ["draws-line", "holds-gate"]),
        ("Equalizer", ["levels-field", "trades-fair"]),
    ]),
    ("Truth", "TRUTH", [
        ("Seeker", ["asks-why", "digs-deeper"]),
        ("Architect", ["builds-case", "maps-logic"]),
    ]),
    ("Recognition", "RECOG", [
        ("Spotlight", ["takes-stage", "shows-work"]),
        ("Diplomat", ["reads-room", "shares-credit"]),
    ]),
    ("Bonding", "BOND", [
        ("Anchor", ["stays-close", "keeps-vigil"]),
        ("Provider", ["carries-load", "feeds-first"]),
    ]),
    ("Stress", "STRESS", [
        ("Catalyst", ["moves-first", "sparks-action"]),
        ("Artisan", ["steadies-hand", "polishes-detail"]),
    ]),
];

fn face_id(family_idx: usize, sibling: usize) -> String {
    let (family, _, faces) = DEMO_SHAPE[family_idx];
    format!("FACE/{family}/{}", faces[sibling].0)
}

fn tell_id(family_idx: usize, sibling: usize, slug_idx: usize) -> String {
    let (family, _, faces) = DEMO_SHAPE[family_idx];
    let (face, slugs) = faces[sibling];
    format!("TELL/{family}/{face}/{}", slugs[slug_idx])
}

/// Build the unsigned demo artifact. Callers [`seal`] it with their key.
pub fn demo_bank() -> serde_json::Value {
    let families: Vec<&str> = DEMO_SHAPE.iter().map(|(f, _, _)| *f).collect();

    let mut faces = Vec::with_capacity(14);
    let mut tells = Vec::with_capacity(28);
    for (fi, (family, _, siblings)) in DEMO_SHAPE.iter().enumerate() {
        for (si, (_face, slugs)) in siblings.iter().enumerate() {
            faces.push(json!({ "id": face_id(fi, si), "family": family }));
            for slug_idx in 0..slugs.len() {
                tells.push(json!({ "id": tell_id(fi, si, slug_idx), "face": face_id(fi, si) }));
            }
        }
    }

    // Index-0 tells of both siblings are the family's contrast set.
    let mut contrast_matrix = serde_json::Map::new();
    for (fi, (family, _, _)) in DEMO_SHAPE.iter().enumerate() {
        contrast_matrix.insert(
            (*family).to_string(),
            json!({
                "faces": [face_id(fi, 0), face_id(fi, 1)],
                "tells": [tell_id(fi, 0, 0), tell_id(fi, 1, 0)],
            }),
        );
    }

    let slot_texts = [
        "When {f} is on the line, what do you reach for first?",
        "When {f} bends under pressure, where do you give ground?",
        "When {f} breaks down completely, what do you protect?",
    ];
    let slot_tags = ["C", "O", "F"];

    let mut questions = serde_json::Map::new();
    for (fi, (family, screen, _)) in DEMO_SHAPE.iter().enumerate() {
        let mut authored = Vec::with_capacity(3);
        for q in 0..3usize {
            // Option A: Clean line, three tells spread over home and two
            // away screens. Option B: Bent (Broken on the F-slot), two
            // tells for the sibling side.
            let a_tells = json!([
                tell_id(fi, 0, q % 2),
                tell_id((fi + 1 + q) % 7, 0, (q + 1) % 2),
                tell_id((fi + 3 + q) % 7, 1, q % 2),
            ]);
            let b_tells = json!([
                tell_id(fi, 1, q % 2),
                tell_id((fi + 2 + q) % 7, 1, (q + 1) % 2),
            ]);
            let b_line = if q == 2 { "F" } else { "O" };
            authored.push(json!({
                "qid": format!("{screen}_Q{}", q + 1),
                "order_in_family": slot_tags[q],
                "text": slot_texts[q].replace("{f}", &family.to_lowercase()),
                "options": [
                    { "key": "A", "line_cof": "C", "tells": a_tells },
                    { "key": "B", "line_cof": b_line, "tells": b_tells },
                ],
            }));
        }
        questions.insert((*family).to_string(), serde_json::Value::Array(authored));
    }

    json!({
        "meta": {
            "bank_id": "facekit.demo",
            "version": "1.0.0",
            "constants_profile": "default",
        },
        "registries": {
            "families": families,
            "faces": faces,
            "tells": tells,
            "contrast_matrix": contrast_matrix,
        },
        "constants": {
            "LIT_MIN_QUESTIONS": 6,
            "LIT_MIN_FAMILIES": 4,
            "LIT_MIN_SIGNATURE": 2,
            "LIT_MIN_CLEAN": 4,
            "LIT_MAX_BROKEN": 1,
            "PER_SCREEN_CAP_BP": 4000,
            "LEAN_MIN_QUESTIONS": 4,
            "LEAN_MIN_FAMILIES": 3,
            "LEAN_MIN_SIGNATURE": 1,
            "LEAN_MIN_CLEAN": 2,
            "GHOST_MIN_QUESTIONS": 6,
            "GHOST_MAX_FAMILIES": 2,
            "COLD_MIN_QUESTIONS": 2,
            "COLD_MAX_QUESTIONS": 3,
            "COLD_MIN_FAMILIES": 2,
        },
        "questions": questions,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank;

    const KEY: &[u8] = b"facekit-test-signing-key";

    #[test]
    fn sealed_demo_bank_verifies() {
        let mut artifact = demo_bank();
        seal(&mut artifact, KEY, "test-signer").unwrap();
        let bank = bank::load_value(&artifact, KEY).unwrap();
        assert_eq!(bank.meta().bank_id, "facekit.demo");
        assert_eq!(bank.meta().signed_by, "test-signer");
    }

    #[test]
    fn sealing_is_deterministic() {
        let mut a = demo_bank();
        let mut b = demo_bank();
        seal(&mut a, KEY, "test-signer").unwrap();
        seal(&mut b, KEY, "test-signer").unwrap();
        assert_eq!(a["meta"]["bank_hash"], b["meta"]["bank_hash"]);
        assert_eq!(a["meta"]["signature"], b["meta"]["signature"]);
    }

    #[test]
    fn reseal_after_edit_changes_hash() {
        let mut a = demo_bank();
        seal(&mut a, KEY, "test-signer").unwrap();
        let original = a["meta"]["bank_hash"].clone();
        a["questions"]["Control"][0]["text"] = "edited".into();
        seal(&mut a, KEY, "test-signer").unwrap();
        assert_ne!(a["meta"]["bank_hash"], original);
        // And the resealed artifact loads cleanly.
        bank::load_value(&a, KEY).unwrap();
    }
}
