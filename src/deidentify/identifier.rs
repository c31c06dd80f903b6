//! Identifier pseudonymization
//!
//! FHIR `Identifier` elements are either dropped or replaced by a keyed
//! SHA-256 pseudonym. Only identifiers whose `system` is on the
//! [`HashedSystems`] allowlist survive; they keep their `system` and get a
//! hashed `value`, every other sub-field (type, period, assigner, ...) is
//! discarded.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// Default pseudonym length in hex characters (~64 bits)
pub const DEFAULT_HASH_LENGTH: usize = 16;

/// Length of a full SHA-256 hex digest
pub const FULL_DIGEST_LENGTH: usize = 64;

/// Identifier systems retained (hashed) out of the box
pub const DEFAULT_HASHED_SYSTEMS: &[&str] = &["http://hospital.example.org/mrn", "urn:system:mrn"];

/// Hex-encoded `SHA-256(secret || value)`
pub fn keyed_digest(secret: &str, value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Allowlist of `Identifier.system` values that are kept in hashed form
///
/// Membership is the only criterion: an identifier whose system is missing or
/// not listed is removed entirely, whatever its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashedSystems(BTreeSet<String>);

impl HashedSystems {
    /// Build an allowlist from any collection of system URIs
    pub fn new<I, S>(systems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(systems.into_iter().map(Into::into).collect())
    }

    /// Check whether `system` is allowlisted
    pub fn contains(&self, system: &str) -> bool {
        self.0.contains(system)
    }

    /// Check whether an identifier element is eligible for pseudonymization
    ///
    /// Requires an object with a non-empty string `system` on the allowlist.
    pub fn admits(&self, identifier: &Value) -> bool {
        identifier
            .get("system")
            .and_then(Value::as_str)
            .is_some_and(|system| !system.is_empty() && self.contains(system))
    }

    /// Iterate the allowlisted systems in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for HashedSystems {
    fn default() -> Self {
        Self::new(DEFAULT_HASHED_SYSTEMS.iter().copied())
    }
}

/// Keyed-hash masking of identifier values
///
/// # Examples
///
/// ```
/// use fhir_deid::deidentify::identifier::Pseudonymizer;
/// use serde_json::json;
///
/// let pseudonymizer = Pseudonymizer::new("s3cr3t").with_hash_length(16);
/// let masked = pseudonymizer
///     .mask(&json!({"system": "urn:system:mrn", "value": "12345", "use": "official"}))
///     .unwrap();
///
/// assert_eq!(masked["system"], "urn:system:mrn");
/// assert_eq!(masked["value"].as_str().unwrap().len(), 16);
/// assert!(masked.get("use").is_none());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Pseudonymizer<'a> {
    secret: &'a str,
    hash_length: Option<usize>,
}

impl<'a> Pseudonymizer<'a> {
    /// Create a pseudonymizer producing full 64-character digests
    pub fn new(secret: &'a str) -> Self {
        Self {
            secret,
            hash_length: None,
        }
    }

    /// Truncate pseudonyms to `length` hex characters (clamped to 1..=64)
    pub fn with_hash_length(mut self, length: usize) -> Self {
        self.hash_length = Some(length.clamp(1, FULL_DIGEST_LENGTH));
        self
    }

    /// Hash a raw value
    pub fn hash(&self, value: &str) -> String {
        let mut digest = keyed_digest(self.secret, value);
        if let Some(length) = self.hash_length {
            digest.truncate(length);
        }
        digest
    }

    /// Mask a single identifier element
    ///
    /// Returns `None` when there is nothing to mask (not an object, or no
    /// `value`). Booleans are hashed as `True`/`False` so pseudonyms match
    /// those issued by earlier tooling; other non-string values are hashed
    /// via their JSON text.
    pub fn mask(&self, identifier: &Value) -> Option<Value> {
        let original = identifier.get("value").filter(|v| !v.is_null())?;

        let masked_value = match original {
            Value::String(s) => self.hash(s),
            Value::Bool(true) => self.hash("True"),
            Value::Bool(false) => self.hash("False"),
            other => self.hash(&other.to_string()),
        };

        let mut masked = Map::new();
        masked.insert("value".to_string(), Value::String(masked_value));
        if let Some(system) = identifier.get("system") {
            masked.insert("system".to_string(), system.clone());
        }
        Some(Value::Object(masked))
    }
}
