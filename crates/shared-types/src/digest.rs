//! # Checksum Digests
//!
//! Content hash of a badge's punch history, used for anti-entropy.
//!
//! The digest is SHA-256 over the canonical JSON form of the ordered punch
//! list: object keys sorted, no insignificant whitespace. Two nodes holding
//! the same list always produce the same digest.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::entities::{BadgeNumber, PunchRecord};
use crate::errors::EventError;

/// Hex length of a SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Point-in-time content hash of one badge's punch list. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChecksumDigest {
    badge_number: BadgeNumber,
    hash: String,
}

impl ChecksumDigest {
    /// Hash the punch list for `badge_number`.
    pub fn compute(badge_number: &str, punches: &[PunchRecord]) -> Result<Self, EventError> {
        let canonical = canonical_json(&punches)?;
        let hash = hex::encode(Sha256::digest(canonical.as_bytes()));
        Ok(Self {
            badge_number: badge_number.to_string(),
            hash,
        })
    }

    /// Rebuild a digest received from a peer, validating the hash text.
    pub fn from_parts(badge_number: impl Into<String>, hash: impl Into<String>) -> Result<Self, EventError> {
        let hash = hash.into();
        let well_formed = hash.len() == DIGEST_HEX_LEN
            && hash.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !well_formed {
            return Err(EventError::InvalidDigest(hash));
        }
        Ok(Self {
            badge_number: badge_number.into(),
            hash,
        })
    }

    pub fn badge_number(&self) -> &str {
        &self.badge_number
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// True when `other` hashes the same content.
    pub fn matches(&self, other: &ChecksumDigest) -> bool {
        self.hash == other.hash
    }
}

/// Serialize `value` as canonical JSON (sorted keys, compact).
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String, EventError> {
    let value = sort_keys(serde_json::to_value(value)?);
    Ok(serde_json::to_string(&value)?)
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k, sort_keys(v)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
