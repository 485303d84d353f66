//! Memoization for loaded datasets and actual-margin matrices.
//!
//! Nothing is shared across threads: every interaction recomputes on the UI
//! thread and this layer only skips work whose inputs did not change.

use crate::matrix::MarginMatrix;
use crate::scope::{ReportScope, SupplierFilter};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use tracing::debug;

/// Content identity of a data source: SHA-256 of a file's bytes, or of the
/// request parameters for a live fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId([u8; 32]);

impl SourceId {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    pub fn from_parts(parts: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            // Separator keeps ("ab", "c") and ("a", "bc") apart.
            hasher.update([0u8]);
        }
        Self(hasher.finalize().into())
    }

    pub fn short_hex(&self) -> String {
        self.0[..6].iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_hex())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatrixKey {
    pub source: SourceId,
    pub supplier: SupplierFilter,
    pub exclude_misc: bool,
    /// `None` for the summary over the whole scope.
    pub discount_group: Option<String>,
}

impl MatrixKey {
    pub fn new(source: &SourceId, scope: &ReportScope, discount_group: Option<&str>) -> Self {
        Self {
            source: source.clone(),
            supplier: scope.supplier.clone(),
            exclude_misc: scope.exclude_misc,
            discount_group: discount_group.map(str::to_string),
        }
    }
}

pub struct MemoCache<K, V> {
    entries: HashMap<K, V>,
    hits: u64,
    misses: u64,
}

impl<K: Eq + Hash + fmt::Debug, V: Clone> MemoCache<K, V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Returns the stored value for `key`, running `compute` only on a miss.
    pub fn get_or_insert_with(&mut self, key: K, compute: impl FnOnce() -> V) -> V {
        if let Some(v) = self.entries.get(&key) {
            self.hits += 1;
            debug!(?key, "cache hit");
            return v.clone();
        }
        self.misses += 1;
        let value = compute();
        self.entries.insert(key, value.clone());
        value
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

impl<K: Eq + Hash + fmt::Debug, V: Clone> Default for MemoCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

pub type MatrixCache = MemoCache<MatrixKey, MarginMatrix>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn computes_once_per_key() {
        let calls = Cell::new(0);
        let mut cache: MemoCache<&str, u32> = MemoCache::new();
        let compute = || {
            calls.set(calls.get() + 1);
            7
        };

        assert_eq!(cache.get_or_insert_with("a", compute), 7);
        assert_eq!(cache.get_or_insert_with("a", compute), 7);
        assert_eq!(calls.get(), 1);
        assert_eq!((cache.hits(), cache.misses()), (1, 1));

        cache.get_or_insert_with("b", compute);
        assert_eq!(calls.get(), 2);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.hits(), 0);
    }

    #[test]
    fn matrix_keys_differ_by_every_field() {
        let src = SourceId::from_bytes(b"file");
        let all = ReportScope::new(SupplierFilter::All, true);
        let acme = ReportScope::new(SupplierFilter::Supplier("Acme".into()), true);
        let acme_incl = ReportScope::new(SupplierFilter::Supplier("Acme".into()), false);

        let base = MatrixKey::new(&src, &acme, None);
        assert_eq!(base, MatrixKey::new(&src, &acme, None));
        assert_ne!(base, MatrixKey::new(&src, &all, None));
        assert_ne!(base, MatrixKey::new(&src, &acme_incl, None));
        assert_ne!(base, MatrixKey::new(&src, &acme, Some("100")));
        assert_ne!(base, MatrixKey::new(&SourceId::from_bytes(b"other"), &acme, None));
    }

    #[test]
    fn source_id_is_content_based() {
        assert_eq!(SourceId::from_bytes(b"abc"), SourceId::from_bytes(b"abc"));
        assert_ne!(SourceId::from_bytes(b"abc"), SourceId::from_bytes(b"abd"));
        assert_ne!(SourceId::from_parts(&["ab", "c"]), SourceId::from_parts(&["a", "bc"]));
        assert_eq!(SourceId::from_bytes(b"abc").short_hex().len(), 12);
    }
}
