//! Cache key derivation
//!
//! A key is the endpoint identifier with every character outside
//! `[A-Za-z0-9_-]` replaced by `_`. Parameterized requests append `_` and a
//! digest of the key-sorted parameter map, so `?a=1&b=2` and `?b=2&a=1`
//! share an entry.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// File extension of a published cache entry
pub const ENTRY_EXTENSION: &str = "json";

/// Hex characters of the parameter digest kept in the key
const PARAM_DIGEST_LEN: usize = 32;

/// Filesystem-safe cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for an endpoint and an optional parameter set
    pub fn derive(endpoint: &str, params: &[(&str, &str)]) -> Self {
        if params.is_empty() {
            return Self(sanitize(endpoint));
        }

        let sorted: BTreeMap<&str, &str> = params.iter().copied().collect();
        let encoded = serde_json::to_string(&sorted).unwrap_or_default();
        let digest = hex::encode(Sha256::digest(encoded.as_bytes()));

        Self(sanitize(&format!(
            "{}_{}",
            endpoint,
            &digest[..PARAM_DIGEST_LEN]
        )))
    }

    /// Key prefix shared by an endpoint and all of its parameterized variants
    pub fn prefix_for(endpoint: &str) -> String {
        sanitize(endpoint)
    }

    /// Recover a key from a directory entry name, if it names a cache entry
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(".json")?;
        if stem.is_empty() || stem.starts_with('.') || !stem.chars().all(is_key_char) {
            return None;
        }
        Some(Self(stem.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.0, ENTRY_EXTENSION)
    }

    /// Whether this key has the shape of `endpoint`'s plain or parameterized key
    ///
    /// Distinct endpoints can sanitize to the same text, so callers that
    /// delete by endpoint still confirm against the stored entry.
    pub fn matches_endpoint(&self, endpoint: &str) -> bool {
        let prefix = Self::prefix_for(endpoint);
        match self.0.strip_prefix(&prefix) {
            Some("") => true,
            Some(rest) => rest.strip_prefix('_').is_some_and(|digest| {
                digest.len() == PARAM_DIGEST_LEN && digest.chars().all(|c| c.is_ascii_hexdigit())
            }),
            None => false,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if is_key_char(c) { c } else { '_' })
        .collect()
}
