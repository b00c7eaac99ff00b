//! Process-wide bank registry
//!
//! Read-mostly map of bank-hash → frozen package. Registration is the only
//! writer and excludes readers while swapping entries; it can never mutate
//! an already-loaded package (they live behind `Arc` with no mutating
//! surface). Deployments are **forward-only** per bank id: registering a
//! version lower than the one already present is rejected, while older
//! hashes stay resident so in-flight sessions keep their binding.

#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::bank::BankPackage;
use crate::error::{EngineError, Result};

/// Registry of loaded banks, keyed by hash.
#[derive(Default)]
pub struct BankRegistry {
    banks: RwLock<HashMap<String, Arc<BankPackage>>>,
    /// Latest (version, hash) per bank id, for the forward-only rule.
    latest: RwLock<HashMap<String, (String, String)>>,
}

impl BankRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loaded bank. Idempotent for an identical hash; rejects a
    /// version rollback for the same bank id.
    pub fn register(&self, bank: Arc<BankPackage>) -> Result<()> {
        let meta = bank.meta();
        let mut latest = self
            .latest
            .write()
            .map_err(|_| EngineError::Internal("registry lock poisoned".into()))?;
        if let Some((registered, hash)) = latest.get(&meta.bank_id) {
            if hash == &meta.bank_hash {
                return Ok(());
            }
            if compare_versions(&meta.version, registered) == Ordering::Less {
                return Err(EngineError::BankVersionMismatch {
                    bank_id: meta.bank_id.clone(),
                    registered: registered.clone(),
                    offered: meta.version.clone(),
                });
            }
        }
        latest.insert(
            meta.bank_id.clone(),
            (meta.version.clone(), meta.bank_hash.clone()),
        );
        let mut banks = self
            .banks
            .write()
            .map_err(|_| EngineError::Internal("registry lock poisoned".into()))?;
        banks.insert(meta.bank_hash.clone(), bank.clone());
        Ok(())
    }

    /// Look up a bank by hash.
    pub fn get(&self, bank_hash: &str) -> Result<Arc<BankPackage>> {
        let banks = self
            .banks
            .read()
            .map_err(|_| EngineError::Internal("registry lock poisoned".into()))?;
        banks
            .get(bank_hash)
            .cloned()
            .ok_or_else(|| EngineError::BankNotFound(bank_hash.to_string()))
    }

    /// Whether a bank with this hash is registered.
    pub fn contains(&self, bank_hash: &str) -> bool {
        self.banks
            .read()
            .map(|b| b.contains_key(bank_hash))
            .unwrap_or(false)
    }

    /// Number of resident banks.
    pub fn len(&self) -> usize {
        self.banks.read().map(|b| b.len()).unwrap_or(0)
    }

    /// True when no bank is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Componentwise dotted-version comparison; numeric components compare as
/// integers, anything else falls back to a string compare for that slot.
fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(xn), Ok(yn)) => xn.cmp(&yn),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
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
    use crate::authoring;
    use crate::bank;

    const KEY: &[u8] = b"facekit-test-signing-key";

    fn sealed_demo(version: &str) -> Arc<bank::BankPackage> {
        let mut artifact = authoring::demo_bank();
        artifact["meta"]["version"] = version.into();
        authoring::seal(&mut artifact, KEY, "test-signer").unwrap();
        bank::load_value(&artifact, KEY).unwrap()
    }

    #[test]
    fn register_and_get_roundtrip() {
        let registry = BankRegistry::new();
        let bank = sealed_demo("1.0.0");
        registry.register(bank.clone()).unwrap();
        let fetched = registry.get(bank.hash()).unwrap();
        assert_eq!(fetched.hash(), bank.hash());
        assert_eq!(
            registry.get(&"00".repeat(32)).unwrap_err().code(),
            "E_BANK_NOT_FOUND"
        );
    }

    #[test]
    fn forward_only_versioning() {
        let registry = BankRegistry::new();
        registry.register(sealed_demo("1.2.0")).unwrap();
        // Upgrade is fine; both hashes stay resident.
        let v13 = sealed_demo("1.3.0");
        registry.register(v13.clone()).unwrap();
        assert_eq!(registry.len(), 2);
        // Rollback is not.
        let err = registry.register(sealed_demo("1.1.9")).unwrap_err();
        assert_eq!(err.code(), "E_BANK_VERSION_MISMATCH");
        // Same hash again is idempotent.
        registry.register(v13).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn version_compare_is_numeric_per_component() {
        assert_eq!(compare_versions("1.10.0", "1.9.9"), Ordering::Greater);
        assert_eq!(compare_versions("2.0", "2.0.0"), Ordering::Less);
        assert_eq!(compare_versions("1.0.0", "1.0.0"), Ordering::Equal);
    }
}
