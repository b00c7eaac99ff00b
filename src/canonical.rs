//! Canonical value tree, byte form, and SHA-256 digests
//!
//! Every hash in the system (bank hash, signature input, snapshot hash) is
//! SHA-256 over the **canonical byte form** of a value tree. The byte form is
//! a pure function of the value: object keys are sorted by Unicode code
//! point, arrays keep their order, scalars render through a fixed mapping,
//! and no insignificant whitespace is emitted. Two trees are equal iff their
//! canonical bytes are equal.
//!
//! The canonical IR ([`CanonValue`]) is deliberately small:
//! `null | bool | int | string | list | map`. Anything outside it (floats,
//! integers beyond `i64`, non-NFC text) is rejected at ingress with a
//! precise error, never coerced. This removes the ambiguity around
//! floating-point specials and iteration order that a "hash the JSON you
//! were handed" approach would carry.
//!
//! ### Rendering rules
//! - `null` → `null`, booleans → `true` / `false`
//! - integers → minimal decimal form (i64 range only)
//! - strings → double-quoted; `"` and `\` escaped; control chars as
//!   `\u00XX` (lowercase hex); everything else passes through as UTF-8
//! - lists → `[` items `]` joined by `,`
//! - maps → `{` `"key":value` `}` joined by `,`, keys sorted by code point
//!
//! Keys of a `BTreeMap<String, _>` iterate in byte order, which for UTF-8 is
//! exactly code-point order, so the map type itself enforces the sort.

#![forbid(unsafe_code)]

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use unicode_normalization::is_nfc;

/// Errors produced while lowering a value into the canonical IR.
#[derive(Debug, thiserror::Error)]
pub enum CanonError {
    /// A number that is not an `i64` (float, or out-of-range integer).
    #[error("non-representable number at {path}: {repr}")]
    NonRepresentableNumber {
        /// Dotted path to the offending value.
        path: String,
        /// Textual rendering of the number.
        repr: String,
    },

    /// A string (or key) that is not NFC-normalized.
    #[error("non-NFC text at {path}")]
    NotNfc {
        /// Dotted path to the offending value.
        path: String,
    },
}

/// The canonical value tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CanonValue {
    /// JSON null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer; the only numeric type the IR admits.
    Int(i64),
    /// NFC-normalized string.
    Str(String),
    /// Ordered list.
    List(Vec<CanonValue>),
    /// Key-sorted map.
    Map(BTreeMap<String, CanonValue>),
}

impl CanonValue {
    /// Lower an arbitrary JSON tree into the canonical IR.
    ///
    /// Rejects floats, integers outside `i64`, and non-NFC text (values and
    /// keys alike). The `path` in the error is a dotted/bracketed locator
    /// for diagnostics.
    pub fn from_json(v: &serde_json::Value) -> Result<Self, CanonError> {
        Self::from_json_at(v, "$")
    }

    fn from_json_at(v: &serde_json::Value, path: &str) -> Result<Self, CanonError> {
        match v {
            serde_json::Value::Null => Ok(CanonValue::Null),
            serde_json::Value::Bool(b) => Ok(CanonValue::Bool(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(CanonValue::Int(i)),
                None => Err(CanonError::NonRepresentableNumber {
                    path: path.to_string(),
                    repr: n.to_string(),
                }),
            },
            serde_json::Value::String(s) => {
                if !is_nfc(s) {
                    return Err(CanonError::NotNfc { path: path.to_string() });
                }
                Ok(CanonValue::Str(s.clone()))
            }
            serde_json::Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    out.push(Self::from_json_at(item, &format!("{path}[{i}]"))?);
                }
                Ok(CanonValue::List(out))
            }
            serde_json::Value::Object(map) => {
                let mut out = BTreeMap::new();
                for (k, val) in map {
                    if !is_nfc(k) {
                        return Err(CanonError::NotNfc { path: format!("{path}.{k}") });
                    }
                    out.insert(k.clone(), Self::from_json_at(val, &format!("{path}.{k}"))?);
                }
                Ok(CanonValue::Map(out))
            }
        }
    }

    /// Render the canonical byte form into `out`.
    pub fn write_canonical(&self, out: &mut Vec<u8>) {
        match self {
            CanonValue::Null => out.extend_from_slice(b"null"),
            CanonValue::Bool(true) => out.extend_from_slice(b"true"),
            CanonValue::Bool(false) => out.extend_from_slice(b"false"),
            CanonValue::Int(i) => out.extend_from_slice(i.to_string().as_bytes()),
            CanonValue::Str(s) => write_canonical_string(s, out),
            CanonValue::List(items) => {
                out.push(b'[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(b',');
                    }
                    item.write_canonical(out);
                }
                out.push(b']');
            }
            CanonValue::Map(map) => {
                out.push(b'{');
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        out.push(b',');
                    }
                    write_canonical_string(k, out);
                    out.push(b':');
                    v.write_canonical(out);
                }
                out.push(b'}');
            }
        }
    }

    /// Canonical byte form as an owned buffer.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_canonical(&mut out);
        out
    }

    /// SHA-256 over the canonical byte form.
    pub fn sha256(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_bytes());
        hasher.finalize().into()
    }

    /// SHA-256 over the canonical byte form, rendered as lowercase hex.
    pub fn sha256_hex(&self) -> String {
        hex::encode(self.sha256())
    }
}

fn write_canonical_string(s: &str, out: &mut Vec<u8>) {
    out.push(b'"');
    for c in s.chars() {
        match c {
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            c if (c as u32) < 0x20 => {
                out.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            }
            c => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out.push(b'"');
}

/// Lower a JSON tree and hash it in one step (lowercase hex digest).
pub fn canonical_hash_hex(v: &serde_json::Value) -> Result<String, CanonError> {
    Ok(CanonValue::from_json(v)?.sha256_hex())
}

/// Lower a JSON tree and return its canonical bytes in one step.
pub fn canonical_bytes(v: &serde_json::Value) -> Result<Vec<u8>, CanonError> {
    Ok(CanonValue::from_json(v)?.canonical_bytes())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_is_insignificant() {
        let a = json!({"b": 1, "a": {"y": 2, "x": 3}});
        let b = json!({"a": {"x": 3, "y": 2}, "b": 1});
        assert_eq!(
            canonical_hash_hex(&a).unwrap(),
            canonical_hash_hex(&b).unwrap()
        );
    }

    #[test]
    fn array_order_is_significant() {
        let a = json!([1, 2, 3]);
        let b = json!([3, 2, 1]);
        assert_ne!(
            canonical_hash_hex(&a).unwrap(),
            canonical_hash_hex(&b).unwrap()
        );
    }

    #[test]
    fn byte_form_is_minimal() {
        let v = json!({"b": [1, true, null], "a": "hi"});
        let bytes = canonical_bytes(&v).unwrap();
        assert_eq!(bytes, br#"{"a":"hi","b":[1,true,null]}"#.to_vec());
    }

    #[test]
    fn control_chars_escape_lowercase() {
        let v = json!("a\nb\u{1}");
        let bytes = canonical_bytes(&v).unwrap();
        assert_eq!(bytes, b"\"a\\u000ab\\u0001\"".to_vec());
    }

    #[test]
    fn floats_are_rejected() {
        let v = json!({"x": 1.5});
        match CanonValue::from_json(&v) {
            Err(CanonError::NonRepresentableNumber { path, .. }) => {
                assert_eq!(path, "$.x");
            }
            other => panic!("expected NonRepresentableNumber, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_integers_are_rejected() {
        let v = json!({"x": u64::MAX});
        assert!(CanonValue::from_json(&v).is_err());
    }

    #[test]
    fn non_nfc_text_is_rejected() {
        // "e" + combining acute accent is NFD; its NFC form is a single char.
        let v = serde_json::Value::String("e\u{0301}".to_string());
        match CanonValue::from_json(&v) {
            Err(CanonError::NotNfc { .. }) => {}
            other => panic!("expected NotNfc, got {other:?}"),
        }
    }

    #[test]
    fn single_byte_change_changes_hash() {
        let a = json!({"text": "Control sets the terms"});
        let b = json!({"text": "Control sets the termz"});
        assert_ne!(
            canonical_hash_hex(&a).unwrap(),
            canonical_hash_hex(&b).unwrap()
        );
    }
}
