// src/models/state.rs

//! Fingerprints and the per-source seen-sets they are recorded in.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity of a posting, a lowercase hex SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub(crate) fn from_hex(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source name to seen-set mapping.
///
/// Serialized as `{ "source": ["fingerprint", ...] }`. Entries are only ever
/// added; there is no removal API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupState {
    sources: BTreeMap<String, BTreeSet<Fingerprint>>,
}

impl DedupState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fingerprint. Returns `true` if it was not seen before.
    pub fn insert(&mut self, source: &str, fingerprint: Fingerprint) -> bool {
        self.sources
            .entry(source.to_string())
            .or_default()
            .insert(fingerprint)
    }

    /// Number of fingerprints seen for a source.
    pub fn seen_count(&self, source: &str) -> usize {
        self.sources.get(source).map_or(0, BTreeSet::len)
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn total(&self) -> usize {
        self.sources.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Iterate over `(source, seen count)` pairs in name order.
    pub fn counts(&self) -> impl Iterator<Item = (&str, usize)> {
        self.sources.iter().map(|(name, seen)| (name.as_str(), seen.len()))
    }
}
