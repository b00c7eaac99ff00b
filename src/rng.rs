//! Deterministic session RNG (SHA-256 counter stream)
//!
//! Each session owns one [`SessionRng`], seeded from
//! `SHA-256(session_seed || "|" || bank_hash || "|" || constants_profile)`
//! behind a stable domain-separation preamble. The stream is counter-mode:
//! block `i` is `SHA-256(seed_digest || be64(i))`, cut into four big-endian
//! 64-bit words. The same (seed, hash, profile) triple therefore always
//! yields the same word sequence, on any platform.
//!
//! `bounded` rejection-samples to avoid modulo bias; `shuffle` is
//! Fisher–Yates over `bounded`. The whole state (digest + counter + buffered
//! words) is serializable so a restored session continues the exact stream.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Stable preamble, hashed ahead of the seed material.
const SEED_DOMAIN: &[u8] = b"facekit.rng.v1";

/// Deterministic, session-local random stream.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRng {
    seed: [u8; 32],
    ctr: u64,
    /// Words from the current block not yet handed out (drained back-to-front).
    buf: Vec<u64>,
}

impl SessionRng {
    /// Derive the stream from the session-identity triple.
    pub fn derive(session_seed: &str, bank_hash: &str, constants_profile: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(SEED_DOMAIN);
        hasher.update(b":");
        hasher.update(session_seed.as_bytes());
        hasher.update(b"|");
        hasher.update(bank_hash.as_bytes());
        hasher.update(b"|");
        hasher.update(constants_profile.as_bytes());
        Self { seed: hasher.finalize().into(), ctr: 0, buf: Vec::new() }
    }

    fn refill(&mut self) {
        let mut hasher = Sha256::new();
        hasher.update(self.seed);
        hasher.update(self.ctr.to_be_bytes());
        let block: [u8; 32] = hasher.finalize().into();
        self.ctr = self.ctr.wrapping_add(1);
        // Push in reverse so pop() hands words out in block order.
        for chunk in block.chunks_exact(8).rev() {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            self.buf.push(u64::from_be_bytes(word));
        }
    }

    /// Next uniform 64-bit word.
    pub fn uniform_u64(&mut self) -> u64 {
        if self.buf.is_empty() {
            self.refill();
        }
        self.buf.pop().expect("refill produces words")
    }

    /// Uniform value in `[0, n)`, rejection-sampled (no modulo bias).
    ///
    /// # Panics
    /// Panics if `n == 0`; every call site draws against a non-empty range.
    pub fn bounded(&mut self, n: u64) -> u64 {
        assert!(n > 0, "bounded(0) is meaningless");
        // Reject the low leftover zone so each residue is equally likely.
        let threshold = n.wrapping_neg() % n;
        loop {
            let v = self.uniform_u64();
            if v >= threshold {
                return v % n;
            }
        }
    }

    /// Fisher–Yates shuffle driven by `bounded`.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.bounded(i as u64 + 1) as usize;
            items.swap(i, j);
        }
    }

    /// Uniform choice from a slice; `None` on empty input.
    pub fn choice<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let i = self.bounded(items.len() as u64) as usize;
        Some(&items[i])
    }
}

// ============================================================================
// Tests
// ============================================================================
