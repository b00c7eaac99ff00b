//! Identifier newtypes and format rules
//!
//! Every identifier that crosses the bank boundary has a fixed textual shape
//! (see the artifact contract). Centralizing the newtypes here keeps a single
//! definition site; downstream code imports them from the crate root
//! (e.g., `use facekit::{FamilyName, FaceId, Qid};`).
//!
//! Shapes:
//! - family:     `^[A-Z][a-z]+$`
//! - face id:    `^FACE/[A-Z][a-z]+/[A-Z][a-z]+$`
//! - tell id:    `^TELL/[A-Z][a-z]+/[A-Z][a-z]+/[a-z][a-z0-9-]*$`
//! - qid:        `^[A-Z]{3,8}_Q[1-3]$`
//! - session id: `^[a-f0-9]{16}$`
//! - bank hash:  64 lowercase hex chars
//!
//! The checks are hand-rolled (no regex engine); each one is a short scan
//! over ASCII classes.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of one of the seven families (e.g., `Control`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FamilyName(pub String);

/// Identifier of a face, shaped `FACE/<Family>/<Name>`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceId(pub String);

/// Identifier of a tell, shaped `TELL/<Family>/<Face>/<slug>`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TellId(pub String);

/// Question identifier, shaped `<SCREEN>_Q<n>` (e.g., `CTRL_Q1`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Qid(pub String);

/// Session identifier: 16 lowercase hex chars derived at init.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl fmt::Display for FamilyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
impl fmt::Display for TellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
impl fmt::Display for Qid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FaceId {
    /// The family segment of the face id, if well-formed.
    pub fn family_segment(&self) -> Option<&str> {
        self.0.split('/').nth(1)
    }
}

impl TellId {
    /// The family segment of the tell id, if well-formed.
    pub fn family_segment(&self) -> Option<&str> {
        self.0.split('/').nth(1)
    }
}

/// `^[A-Z][a-z]+$`
pub fn is_family_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => {}
        _ => return false,
    }
    let mut rest = 0usize;
    for c in chars {
        if !c.is_ascii_lowercase() {
            return false;
        }
        rest += 1;
    }
    rest >= 1
}

/// `^FACE/[A-Z][a-z]+/[A-Z][a-z]+$`
pub fn is_face_id(s: &str) -> bool {
    let parts: Vec<&str> = s.split('/').collect();
    parts.len() == 3 && parts[0] == "FACE" && is_family_name(parts[1]) && is_family_name(parts[2])
}

/// `^TELL/[A-Z][a-z]+/[A-Z][a-z]+/[a-z][a-z0-9-]*$`
pub fn is_tell_id(s: &str) -> bool {
    let parts: Vec<&str> = s.split('/').collect();
    if parts.len() != 4 || parts[0] != "TELL" {
        return false;
    }
    if !is_family_name(parts[1]) || !is_family_name(parts[2]) {
        return false;
    }
    let slug = parts[3];
    let mut chars = slug.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// `^[A-Z]{3,8}_Q[1-3]$`
pub fn is_qid(s: &str) -> bool {
    let Some((screen, q)) = s.split_once('_') else {
        return false;
    };
    if screen.len() < 3 || screen.len() > 8 || !screen.chars().all(|c| c.is_ascii_uppercase()) {
        return false;
    }
    let bytes = q.as_bytes();
    bytes.len() == 2 && bytes[0] == b'Q' && (b'1'..=b'3').contains(&bytes[1])
}

/// `^[a-f0-9]{16}$`
pub fn is_session_id(s: &str) -> bool {
    s.len() == 16 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// 64 lowercase hex chars.
pub fn is_bank_hash(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_name_shape() {
        assert!(is_family_name("Control"));
        assert!(is_family_name("Pace"));
        assert!(!is_family_name("control"));
        assert!(!is_family_name("C"));
        assert!(!is_family_name("CONTROL"));
        assert!(!is_family_name("Con trol"));
        assert!(!is_family_name(""));
    }

    #[test]
    fn face_and_tell_shapes() {
        assert!(is_face_id("FACE/Control/Sovereign"));
        assert!(!is_face_id("FACE/Control"));
        assert!(!is_face_id("face/Control/Sovereign"));
        assert!(!is_face_id("FACE/Control/SOVEREIGN"));

        assert!(is_tell_id("TELL/Control/Sovereign/sets-terms"));
        assert!(is_tell_id("TELL/Pace/Visionary/long-view2"));
        assert!(!is_tell_id("TELL/Control/Sovereign/Sets-terms"));
        assert!(!is_tell_id("TELL/Control/sets-terms"));
    }

    #[test]
    fn qid_shape() {
        assert!(is_qid("CTRL_Q1"));
        assert!(is_qid("BOUNDARY_Q3"));
        assert!(!is_qid("CT_Q1")); // screen too short
        assert!(!is_qid("CTRL_Q4"));
        assert!(!is_qid("CTRL_Q12"));
        assert!(!is_qid("ctrl_Q1"));
    }

    #[test]
    fn session_and_hash_shapes() {
        assert!(is_session_id("0123456789abcdef"));
        assert!(!is_session_id("0123456789ABCDEF"));
        assert!(!is_session_id("0123456789abcde"));
        assert!(is_bank_hash(&"ab".repeat(32)));
        assert!(!is_bank_hash(&"AB".repeat(32)));
        assert!(!is_bank_hash("ab"));
    }
}
