//! Bank package: typed model, structural validation, hash & signature
//!
//! The bank is the system's trust root. Loading performs **four layers** of
//! validation before anything downstream may touch the data:
//!
//! 1. **Parse**: the artifact bytes must be well-formed JSON
//!    ([`BankError::Corrupted`] otherwise).
//! 2. **Canonical hash**: the SHA-256 of the canonical byte form (signature
//!    block excluded) must equal `meta.bank_hash`.
//! 3. **Signature**: `meta.signature` must verify as HMAC-SHA-256 over the
//!    same canonical bytes under the injected per-environment key.
//! 4. **Structure**: the 7-families / 14-faces / 3-questions / 2-options law
//!    and every cross-reference rule of the data model.
//!
//! Only after all four does the loader hand out an `Arc<BankPackage>`: an
//! immutable value with no mutating surface. Sessions hold the `Arc` for
//! their lifetime; bank updates are out-of-band and forward-only.
//!
//! The signature block is `meta.bank_hash`, `meta.signature`, and
//! `meta.signed_by`. Both the hash and the HMAC are computed over the
//! canonical form of the artifact with those three fields removed, so the
//! definition is non-circular and a tampered byte anywhere in the signed
//! region trips layer 2 or 3.

#![forbid(unsafe_code)]

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::canonical;
use crate::error::EngineError;
use crate::ids::{self, FaceId, FamilyName, Qid, TellId};

type HmacSha256 = Hmac<Sha256>;

/// Line tag carried by options and by question slots: Clean, Bent, Broken.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LineCof {
    /// Clean.
    C,
    /// Bent.
    O,
    /// Broken.
    F,
}

impl LineCof {
    /// Render as the single-letter tag used across the artifact.
    pub fn as_str(&self) -> &'static str {
        match self {
            LineCof::C => "C",
            LineCof::O => "O",
            LineCof::F => "F",
        }
    }
}

impl std::fmt::Display for LineCof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced while loading a bank artifact.
#[derive(Debug, thiserror::Error)]
pub enum BankError {
    /// The bytes are not parseable as the artifact at all.
    #[error("bank corrupted: {0}")]
    Corrupted(String),
    /// A structural invariant is violated (includes hash mismatch).
    #[error("bank defect: {0}")]
    Defect(String),
    /// HMAC verification failed.
    #[error("bank signature invalid")]
    SignatureInvalid,
}

impl From<BankError> for EngineError {
    fn from(e: BankError) -> Self {
        match e {
            BankError::Corrupted(m) => EngineError::BankCorrupted(m),
            BankError::Defect(m) => EngineError::BankDefect(m),
            BankError::SignatureInvalid => EngineError::BankSignatureInvalid,
        }
    }
}

impl From<canonical::CanonError> for BankError {
    fn from(e: canonical::CanonError) -> Self {
        BankError::Defect(e.to_string())
    }
}

// ============================================================================
// Typed model (frozen after load)
// ============================================================================

/// Signed metadata block of the artifact.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BankMeta {
    /// Logical bank id (stable across versions).
    pub bank_id: String,
    /// Dotted version, forward-only across deployments.
    pub version: String,
    /// Name of the authored constants profile.
    pub constants_profile: String,
    /// SHA-256 (hex) of the canonical bytes, signature block excluded.
    pub bank_hash: String,
    /// HMAC-SHA-256 (hex) over the same bytes.
    pub signature: String,
    /// Key identifier of the signer.
    pub signed_by: String,
}

/// One of the 14 faces; two siblings per family.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Face {
    /// Face identifier.
    pub id: FaceId,
    /// Owning family.
    pub family: FamilyName,
}

/// Atomic evidence unit owned by exactly one face.
#[derive(Clone, Debug)]
pub struct Tell {
    /// Tell identifier.
    pub id: TellId,
    /// Owning face.
    pub face: FaceId,
    /// Family of the owning face (derived at load).
    pub family: FamilyName,
    /// Whether this tell is in its family's contrast set (derived at load).
    pub contrast: bool,
}

/// One of a question's two options.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuestionOption {
    /// Option key (distinct within the question, e.g. `A` / `B`).
    pub key: String,
    /// Line tag recorded for the family when this option is picked.
    pub line_cof: LineCof,
    /// Zero to three tells, at most one per face.
    #[serde(default)]
    pub tells: Vec<TellId>,
}

/// An authored question with its order-in-family slot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Question {
    /// Question id.
    pub qid: Qid,
    /// Slot within the family screen (authored order C, O, F).
    pub order_in_family: LineCof,
    /// Prompt text shown to the subject.
    pub text: String,
    /// Exactly two options.
    pub options: Vec<QuestionOption>,
}

impl Question {
    /// Look up an option by key.
    pub fn option(&self, key: &str) -> Option<&QuestionOption> {
        self.options.iter().find(|o| o.key == key)
    }
}

/// Contrast-bearing faces and tells for one family.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContrastEntry {
    /// The family's two faces.
    pub faces: Vec<FaceId>,
    /// Tells considered contrast-bearing for this family.
    pub tells: BTreeSet<TellId>,
}

/// Threshold lattice. Authored with the bank; all-integer so the artifact
/// stays float-free (`PER_SCREEN_CAP` is in basis points). Field names are
/// the artifact's constant names, lowered.
#[allow(missing_docs)]
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct Constants {
    pub lit_min_questions: u32,
    pub lit_min_families: u32,
    pub lit_min_signature: u32,
    pub lit_min_clean: u32,
    pub lit_max_broken: u32,
    /// LIT gate on the max per-family share, in basis points (4000 = 0.40).
    pub per_screen_cap_bp: u32,
    pub lean_min_questions: u32,
    pub lean_min_families: u32,
    pub lean_min_signature: u32,
    pub lean_min_clean: u32,
    pub ghost_min_questions: u32,
    pub ghost_max_families: u32,
    pub cold_min_questions: u32,
    pub cold_max_questions: u32,
    pub cold_min_families: u32,
}

impl Default for Constants {
    fn default() -> Self {
        Self {
            lit_min_questions: 6,
            lit_min_families: 4,
            lit_min_signature: 2,
            lit_min_clean: 4,
            lit_max_broken: 1,
            per_screen_cap_bp: 4000,
            lean_min_questions: 4,
            lean_min_families: 3,
            lean_min_signature: 1,
            lean_min_clean: 2,
            ghost_min_questions: 6,
            ghost_max_families: 2,
            cold_min_questions: 2,
            cold_max_questions: 3,
            cold_min_families: 2,
        }
    }
}

/// The immutable bank package.
///
/// Constructed only by [`load`]; all lookups go through accessors and the
/// value is shared behind `Arc`; there is no mutating surface.
#[derive(Clone, Debug)]
pub struct BankPackage {
    meta: BankMeta,
    families: Vec<FamilyName>,
    faces: BTreeMap<FaceId, Face>,
    faces_by_family: BTreeMap<FamilyName, Vec<FaceId>>,
    tells: BTreeMap<TellId, Tell>,
    questions: BTreeMap<FamilyName, Vec<Question>>,
    question_families: BTreeMap<Qid, FamilyName>,
    constants: Constants,
    contrast: BTreeMap<FamilyName, ContrastEntry>,
}

impl BankPackage {
    /// Signed metadata.
    pub fn meta(&self) -> &BankMeta {
        &self.meta
    }

    /// Bank hash (hex), the registry key and session binding.
    pub fn hash(&self) -> &str {
        &self.meta.bank_hash
    }

    /// The seven families in authored canonical order.
    pub fn families(&self) -> &[FamilyName] {
        &self.families
    }

    /// Whether `family` is one of the bank's seven.
    pub fn has_family(&self, family: &FamilyName) -> bool {
        self.questions.contains_key(family)
    }

    /// The two sibling faces of `family`, in face-id order.
    pub fn faces_of(&self, family: &FamilyName) -> &[FaceId] {
        self.faces_by_family
            .get(family)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All 14 faces.
    pub fn faces(&self) -> impl Iterator<Item = &Face> {
        self.faces.values()
    }

    /// Look up a face.
    pub fn face(&self, id: &FaceId) -> Option<&Face> {
        self.faces.get(id)
    }

    /// Look up a tell.
    pub fn tell(&self, id: &TellId) -> Option<&Tell> {
        self.tells.get(id)
    }

    /// The three authored questions of `family`, in C→O→F order.
    pub fn questions_of(&self, family: &FamilyName) -> &[Question] {
        self.questions.get(family).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Family screen a qid belongs to.
    pub fn family_of_question(&self, qid: &Qid) -> Option<&FamilyName> {
        self.question_families.get(qid)
    }

    /// Look up a question by qid.
    pub fn question(&self, qid: &Qid) -> Option<&Question> {
        let family = self.question_families.get(qid)?;
        self.questions
            .get(family)?
            .iter()
            .find(|q| &q.qid == qid)
    }

    /// Authored constants profile.
    pub fn constants(&self) -> &Constants {
        &self.constants
    }

    /// Contrast entry for `family`.
    pub fn contrast_of(&self, family: &FamilyName) -> Option<&ContrastEntry> {
        self.contrast.get(family)
    }

    /// Whether `tell` is contrast-bearing for its family.
    pub fn is_contrast_tell(&self, tell: &TellId) -> bool {
        self.tells.get(tell).map(|t| t.contrast).unwrap_or(false)
    }
}

// ============================================================================
// Raw artifact shape (serde mirror of the JSON)
// ============================================================================

#[derive(Deserialize)]
struct RawArtifact {
    meta: BankMeta,
    registries: RawRegistries,
    #[serde(default)]
    constants: Constants,
    questions: BTreeMap<String, Vec<Question>>,
}

#[derive(Deserialize)]
struct RawRegistries {
    families: Vec<String>,
    faces: Vec<Face>,
    tells: Vec<RawTell>,
    contrast_matrix: BTreeMap<String, ContrastEntry>,
}

#[derive(Deserialize)]
struct RawTell {
    id: TellId,
    face: FaceId,
}

// ============================================================================
// Loading
// ============================================================================

/// Remove the signature block (`meta.bank_hash`, `meta.signature`,
/// `meta.signed_by`) from a copy of the artifact. The result is the exact
/// tree the canonical hash and the HMAC are computed over.
pub fn strip_signature_block(artifact: &serde_json::Value) -> serde_json::Value {
    let mut unsigned = artifact.clone();
    if let Some(meta) = unsigned.get_mut("meta").and_then(|m| m.as_object_mut()) {
        meta.remove("bank_hash");
        meta.remove("signature");
        meta.remove("signed_by");
    }
    unsigned
}

/// Load, verify, and freeze a bank artifact.
///
/// `signing_key` is the per-environment HMAC key, injected by the caller.
pub fn load(bytes: &[u8], signing_key: &[u8]) -> Result<Arc<BankPackage>, BankError> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| BankError::Corrupted(e.to_string()))?;
    load_value(&value, signing_key)
}

/// [`load`] over an already-parsed JSON tree.
pub fn load_value(
    value: &serde_json::Value,
    signing_key: &[u8],
) -> Result<Arc<BankPackage>, BankError> {
    let meta = value
        .get("meta")
        .and_then(|m| m.as_object())
        .ok_or_else(|| BankError::Corrupted("missing meta object".into()))?;
    let claimed_hash = meta
        .get("bank_hash")
        .and_then(|h| h.as_str())
        .ok_or_else(|| BankError::Defect("meta.bank_hash missing".into()))?
        .to_string();
    let claimed_sig = meta
        .get("signature")
        .and_then(|s| s.as_str())
        .ok_or_else(|| BankError::Defect("meta.signature missing".into()))?
        .to_string();

    if !ids::is_bank_hash(&claimed_hash) {
        return Err(BankError::Defect("meta.bank_hash is not 64 lowercase hex".into()));
    }

    // Layer 2: canonical hash over the unsigned tree.
    let unsigned = strip_signature_block(value);
    let canon = canonical::CanonValue::from_json(&unsigned)?;
    let canon_bytes = canon.canonical_bytes();
    let computed = canon.sha256_hex();
    if computed != claimed_hash {
        return Err(BankError::Defect(format!(
            "bank hash mismatch: meta says {claimed_hash}, canonical bytes give {computed}"
        )));
    }

    // Layer 3: HMAC-SHA-256 over the same bytes.
    let sig_bytes = hex::decode(&claimed_sig).map_err(|_| BankError::SignatureInvalid)?;
    let mut mac = HmacSha256::new_from_slice(signing_key)
        .map_err(|_| BankError::SignatureInvalid)?;
    mac.update(&canon_bytes);
    mac.verify_slice(&sig_bytes)
        .map_err(|_| BankError::SignatureInvalid)?;

    // Layer 4: typed parse + structural validation.
    let raw: RawArtifact = serde_json::from_value(value.clone())
        .map_err(|e| BankError::Defect(format!("artifact shape: {e}")))?;
    validate(raw).map(Arc::new)
}

fn defect(msg: impl Into<String>) -> BankError {
    BankError::Defect(msg.into())
}

fn validate(raw: RawArtifact) -> Result<BankPackage, BankError> {
    // Families: exactly 7, well-formed, distinct.
    if raw.registries.families.len() != 7 {
        return Err(defect(format!(
            "expected 7 families, got {}",
            raw.registries.families.len()
        )));
    }
    let mut families = Vec::with_capacity(7);
    let mut family_set = BTreeSet::new();
    for name in &raw.registries.families {
        if !ids::is_family_name(name) {
            return Err(defect(format!("malformed family name {name:?}")));
        }
        if !family_set.insert(name.clone()) {
            return Err(defect(format!("duplicate family {name:?}")));
        }
        families.push(FamilyName(name.clone()));
    }

    // Faces: exactly 14, two per family, id segments consistent.
    if raw.registries.faces.len() != 14 {
        return Err(defect(format!(
            "expected 14 faces, got {}",
            raw.registries.faces.len()
        )));
    }
    let mut faces = BTreeMap::new();
    let mut faces_by_family: BTreeMap<FamilyName, Vec<FaceId>> = BTreeMap::new();
    for face in raw.registries.faces {
        if !ids::is_face_id(&face.id.0) {
            return Err(defect(format!("malformed face id {}", face.id)));
        }
        if !family_set.contains(&face.family.0) {
            return Err(defect(format!("face {} names unknown family {}", face.id, face.family)));
        }
        if face.id.family_segment() != Some(face.family.0.as_str()) {
            return Err(defect(format!(
                "face {} id segment disagrees with family {}",
                face.id, face.family
            )));
        }
        faces_by_family
            .entry(face.family.clone())
            .or_default()
            .push(face.id.clone());
        if faces.insert(face.id.clone(), face).is_some() {
            return Err(defect("duplicate face id"));
        }
    }
    for family in &families {
        let siblings = faces_by_family.get(family).map(Vec::len).unwrap_or(0);
        if siblings != 2 {
            return Err(defect(format!("family {family} has {siblings} faces, expected 2")));
        }
    }
    for siblings in faces_by_family.values_mut() {
        siblings.sort();
    }

    // Tells: owned by a known face, id segments consistent, distinct.
    let mut tells = BTreeMap::new();
    for raw_tell in raw.registries.tells {
        if !ids::is_tell_id(&raw_tell.id.0) {
            return Err(defect(format!("malformed tell id {}", raw_tell.id)));
        }
        let face = faces
            .get(&raw_tell.face)
            .ok_or_else(|| defect(format!("tell {} owned by unknown face {}", raw_tell.id, raw_tell.face)))?;
        if raw_tell.id.family_segment() != Some(face.family.0.as_str()) {
            return Err(defect(format!(
                "tell {} family segment disagrees with owning face {}",
                raw_tell.id, face.id
            )));
        }
        let tell = Tell {
            id: raw_tell.id.clone(),
            face: raw_tell.face.clone(),
            family: face.family.clone(),
            contrast: false, // set below from the matrix
        };
        if tells.insert(raw_tell.id, tell).is_some() {
            return Err(defect("duplicate tell id"));
        }
    }

    // Contrast matrix: one entry per family, referencing that family's faces
    // and only tells owned by them.
    let mut contrast = BTreeMap::new();
    for (name, entry) in raw.registries.contrast_matrix {
        if !family_set.contains(&name) {
            return Err(defect(format!("contrast matrix names unknown family {name:?}")));
        }
        let family = FamilyName(name);
        let siblings = &faces_by_family[&family];
        let mut entry_faces = entry.faces.clone();
        entry_faces.sort();
        if entry_faces != *siblings {
            return Err(defect(format!(
                "contrast matrix for {family} does not name its two faces"
            )));
        }
        for tell_id in &entry.tells {
            let tell = tells
                .get(tell_id)
                .ok_or_else(|| defect(format!("contrast matrix references unknown tell {tell_id}")))?;
            if tell.family != family {
                return Err(defect(format!(
                    "contrast tell {tell_id} belongs to {}, not {family}",
                    tell.family
                )));
            }
        }
        contrast.insert(family, entry);
    }
    for family in &families {
        if !contrast.contains_key(family) {
            return Err(defect(format!("contrast matrix missing family {family}")));
        }
    }
    for tell in tells.values_mut() {
        tell.contrast = contrast
            .get(&tell.family)
            .map(|entry| entry.tells.contains(&tell.id))
            .unwrap_or(false);
    }

    // Questions: every family exactly once, 3 questions in C→O→F order,
    // 2 options each, tell discipline per option.
    let mut questions = BTreeMap::new();
    let mut question_families = BTreeMap::new();
    for (name, qs) in raw.questions {
        if !family_set.contains(&name) {
            return Err(defect(format!("questions name unknown family {name:?}")));
        }
        let family = FamilyName(name);
        if qs.len() != 3 {
            return Err(defect(format!(
                "family {family} has {} questions, expected 3",
                qs.len()
            )));
        }
        let expected_slots = [LineCof::C, LineCof::O, LineCof::F];
        for (question, expected) in qs.iter().zip(expected_slots) {
            if question.order_in_family != expected {
                return Err(defect(format!(
                    "family {family} slot order is not C,O,F at {}",
                    question.qid
                )));
            }
            if !ids::is_qid(&question.qid.0) {
                return Err(defect(format!("malformed qid {}", question.qid)));
            }
            if question.options.len() != 2 {
                return Err(defect(format!(
                    "{} has {} options, expected 2",
                    question.qid,
                    question.options.len()
                )));
            }
            if question.options[0].key == question.options[1].key {
                return Err(defect(format!("{} has duplicate option keys", question.qid)));
            }
            for option in &question.options {
                if option.key.is_empty() {
                    return Err(defect(format!("{} has an empty option key", question.qid)));
                }
                if option.tells.len() > 3 {
                    return Err(defect(format!(
                        "{} option {} carries {} tells, max 3",
                        question.qid,
                        option.key,
                        option.tells.len()
                    )));
                }
                let mut faces_seen = BTreeSet::new();
                for tell_id in &option.tells {
                    let tell = tells.get(tell_id).ok_or_else(|| {
                        defect(format!("{} references unknown tell {tell_id}", question.qid))
                    })?;
                    if !faces_seen.insert(tell.face.clone()) {
                        return Err(defect(format!(
                            "{} option {} has two tells for face {}",
                            question.qid, option.key, tell.face
                        )));
                    }
                }
            }
            if question_families
                .insert(question.qid.clone(), family.clone())
                .is_some()
            {
                return Err(defect(format!("duplicate qid {}", question.qid)));
            }
        }
        questions.insert(family, qs);
    }
    for family in &families {
        if !questions.contains_key(family) {
            return Err(defect(format!("no questions for family {family}")));
        }
    }

    // Constants sanity.
    if raw.constants.per_screen_cap_bp > 10_000 {
        return Err(defect("PER_SCREEN_CAP_BP exceeds 10000"));
    }
    if raw.constants.cold_min_questions > raw.constants.cold_max_questions {
        return Err(defect("COLD_MIN_QUESTIONS exceeds COLD_MAX_QUESTIONS"));
    }

    Ok(BankPackage {
        meta: raw.meta,
        families,
        faces,
        faces_by_family,
        tells,
        questions,
        question_families,
        constants: raw.constants,
        contrast,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authoring;

    const KEY: &[u8] = b"facekit-test-signing-key";

    fn demo() -> serde_json::Value {
        let mut artifact = authoring::demo_bank();
        authoring::seal(&mut artifact, KEY, "test-signer").unwrap();
        artifact
    }

    #[test]
    fn demo_bank_loads_and_freezes() {
        let bank = load_value(&demo(), KEY).unwrap();
        assert_eq!(bank.families().len(), 7);
        assert_eq!(bank.faces().count(), 14);
        for family in bank.families() {
            assert_eq!(bank.faces_of(family).len(), 2);
            let qs = bank.questions_of(family);
            assert_eq!(qs.len(), 3);
            assert_eq!(
                qs.iter().map(|q| q.order_in_family).collect::<Vec<_>>(),
                vec![LineCof::C, LineCof::O, LineCof::F]
            );
        }
    }

    #[test]
    fn tampered_text_fails_hash_check() {
        let mut artifact = demo();
        artifact["questions"]["Control"][0]["text"] = "tampered".into();
        match load_value(&artifact, KEY) {
            Err(BankError::Defect(msg)) => assert!(msg.contains("hash mismatch")),
            other => panic!("expected hash-mismatch defect, got {other:?}"),
        }
    }

    #[test]
    fn wrong_key_fails_signature() {
        let artifact = demo();
        match load_value(&artifact, b"some-other-key") {
            Err(BankError::SignatureInvalid) => {}
            other => panic!("expected SignatureInvalid, got {other:?}"),
        }
    }

    #[test]
    fn resigned_tamper_fails_signature() {
        // Re-sealing with the wrong key keeps hash consistent but the HMAC
        // cannot verify under the real key.
        let mut artifact = authoring::demo_bank();
        authoring::seal(&mut artifact, b"attacker-key", "attacker").unwrap();
        match load_value(&artifact, KEY) {
            Err(BankError::SignatureInvalid) => {}
            other => panic!("expected SignatureInvalid, got {other:?}"),
        }
    }

    #[test]
    fn six_families_is_a_defect() {
        let mut artifact = authoring::demo_bank();
        {
            let families = artifact["registries"]["families"].as_array_mut().unwrap();
            families.pop();
        }
        authoring::seal(&mut artifact, KEY, "test-signer").unwrap();
        match load_value(&artifact, KEY) {
            Err(BankError::Defect(msg)) => assert!(msg.contains("7 families")),
            other => panic!("expected defect, got {other:?}"),
        }
    }

    #[test]
    fn four_tells_on_an_option_is_a_defect() {
        let mut artifact = authoring::demo_bank();
        {
            let tells = artifact["questions"]["Control"][0]["options"][0]["tells"]
                .as_array_mut()
                .unwrap();
            tells.push("TELL/Pace/Visionary/long-view".into());
            tells.push("TELL/Truth/Seeker/asks-why".into());
            tells.push("TELL/Bonding/Anchor/stays-close".into());
        }
        authoring::seal(&mut artifact, KEY, "test-signer").unwrap();
        match load_value(&artifact, KEY) {
            Err(BankError::Defect(msg)) => assert!(msg.contains("max 3")),
            other => panic!("expected defect, got {other:?}"),
        }
    }

    #[test]
    fn float_constants_are_a_defect() {
        let mut artifact = authoring::demo_bank();
        artifact["constants"]["PER_SCREEN_CAP"] = serde_json::json!(0.4);
        match authoring::seal(&mut artifact, KEY, "test-signer") {
            Err(_) => {} // canonicalizer already refuses to hash a float
            Ok(()) => panic!("sealing a float-bearing artifact must fail"),
        }
    }
}
