//! Fingerprints: two row-set hashes joined as `"<hashA>,<hashB>"`.
//!
//! An empty row set hashes to `0`, so a snapshot with no data at all is the
//! sentinel `"0,0"`. The sentinel is never a valid checkpoint.
//!
//! Hashing sits behind [`RowHasher`]. The default [`SipRowHasher`] is only
//! guaranteed stable within one process; [`Sha256RowHasher`] is stable across
//! runs and builds.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::Hasher;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;

pub const SENTINEL: &str = "0,0";

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn sentinel() -> Self {
        Self(SENTINEL.to_string())
    }

    pub fn from_hashes(a: u64, b: u64) -> Self {
        Self(format!("{a},{b}"))
    }

    pub fn is_sentinel(&self) -> bool {
        self.0 == SENTINEL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Fingerprint {
    fn default() -> Self {
        Self::sentinel()
    }
}

impl From<&str> for Fingerprint {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Fingerprint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// RowHasher
// ---------------------------------------------------------------------------

/// Reduces the canonical byte encoding of a row set to a `u64`.
pub trait RowHasher: Send + Sync {
    fn digest(&self, bytes: &[u8]) -> u64;
}

/// SipHash via the standard library hasher.
#[derive(Debug, Clone, Copy, Default)]
pub struct SipRowHasher;

impl RowHasher for SipRowHasher {
    fn digest(&self, bytes: &[u8]) -> u64 {
        let mut h = DefaultHasher::new();
        h.write(bytes);
        h.finish()
    }
}

/// First eight bytes of SHA-256, big-endian.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256RowHasher;

impl RowHasher for Sha256RowHasher {
    fn digest(&self, bytes: &[u8]) -> u64 {
        let out = Sha256::digest(bytes);
        let mut head = [0u8; 8];
        head.copy_from_slice(&out[..8]);
        u64::from_be_bytes(head)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    #[default]
    Sip,
    Sha256,
}

impl HashAlgorithm {
    pub fn hasher(self) -> Box<dyn RowHasher> {
        match self {
            HashAlgorithm::Sip => Box::new(SipRowHasher),
            HashAlgorithm::Sha256 => Box::new(Sha256RowHasher),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::Sip => "sip",
            HashAlgorithm::Sha256 => "sha256",
        }
    }
}

// ---------------------------------------------------------------------------
// Row-set hashing
// ---------------------------------------------------------------------------

/// Hash an ordered row set. Empty sets hash to `0`; a non-empty set never
/// does, so the two cases cannot collide.
pub fn hash_rows<T: Serialize>(hasher: &dyn RowHasher, rows: &[T]) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    let bytes = serde_json::to_vec(rows)?;
    Ok(hasher.digest(&bytes).max(1))
}

pub fn fingerprint<A: Serialize, B: Serialize>(
    hasher: &dyn RowHasher,
    rows_a: &[A],
    rows_b: &[B],
) -> Result<Fingerprint> {
    Ok(Fingerprint::from_hashes(
        hash_rows(hasher, rows_a)?,
        hash_rows(hasher, rows_b)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY: &[(i64, i64)] = &[];

    #[test]
    fn both_empty_is_sentinel() {
        for algo in [HashAlgorithm::Sip, HashAlgorithm::Sha256] {
            let fp = fingerprint(algo.hasher().as_ref(), EMPTY, EMPTY).unwrap();
            assert!(fp.is_sentinel());
            assert_eq!(fp.as_str(), "0,0");
        }
    }

    #[test]
    fn both_non_empty_is_not_sentinel() {
        let a = [(1_i64, 10_i64), (2, 20)];
        let b = [3_i64, 4];
        for algo in [HashAlgorithm::Sip, HashAlgorithm::Sha256] {
            let fp = fingerprint(algo.hasher().as_ref(), &a, &b).unwrap();
            assert!(!fp.is_sentinel());
            let (ha, hb) = fp.as_str().split_once(',').unwrap();
            assert_ne!(ha, "0");
            assert_ne!(hb, "0");
        }
    }

    #[test]
    fn one_empty_side_hashes_to_zero() {
        let a = [(1_i64, 10_i64)];
        let fp = fingerprint(&SipRowHasher, &a, &[] as &[i64]).unwrap();
        assert!(fp.as_str().ends_with(",0"));
        assert!(!fp.is_sentinel());
    }

    #[test]
    fn same_rows_same_fingerprint() {
        let a = [(1_i64, 10_i64), (2, 20)];
        let b = [3_i64];
        let first = fingerprint(&SipRowHasher, &a, &b).unwrap();
        let second = fingerprint(&SipRowHasher, &a, &b).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn changed_row_changes_fingerprint() {
        let b = [3_i64];
        let before = fingerprint(&Sha256RowHasher, &[(1_i64, 10_i64)], &b).unwrap();
        let after = fingerprint(&Sha256RowHasher, &[(1_i64, 11_i64)], &b).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn row_order_matters() {
        let forward = hash_rows(&SipRowHasher, &[1_i64, 2]).unwrap();
        let reverse = hash_rows(&SipRowHasher, &[2_i64, 1]).unwrap();
        assert_ne!(forward, reverse);
    }

    #[test]
    fn hash_algorithm_yaml_names() {
        let algo: HashAlgorithm = serde_yaml::from_str("sha256").unwrap();
        assert_eq!(algo, HashAlgorithm::Sha256);
        assert_eq!(HashAlgorithm::default().as_str(), "sip");
    }
}
