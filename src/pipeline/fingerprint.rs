//! Posting identity.
//!
//! A fingerprint is the hex SHA-256 of `source`, `title` and `link` joined
//! with U+001F. Every stored seen-set depends on this exact derivation, so
//! it must not change.

use sha2::{Digest, Sha256};

use crate::models::{Fingerprint, Posting};

const SEPARATOR: &str = "\u{1f}";

/// Fingerprint a `(title, source, link)` triple.
pub fn fingerprint(title: &str, source: &str, link: &str) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(SEPARATOR.as_bytes());
    hasher.update(title.as_bytes());
    hasher.update(SEPARATOR.as_bytes());
    hasher.update(link.as_bytes());
    Fingerprint::from_hex(hex::encode(hasher.finalize()))
}

impl Posting {
    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint(&self.title, &self.source, &self.link)
    }
}
