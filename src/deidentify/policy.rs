//! PHI removal policy
//!
//! A [`PolicyTable`] maps a FHIR `resourceType` to the fields that must be
//! stripped from resources of that type. The [`WILDCARD`] entry applies to
//! every object, including nested elements that carry no `resourceType`.
//!
//! The built-in table targets the HIPAA Safe Harbor identifiers as far as a
//! static field list over generic FHIR allows. It is an explicit allowlist to
//! be reviewed against each dataset, not a completeness guarantee.
//!
//! # Override semantics
//!
//! [`PolicyTable::merge`] replaces the entry for every tag the override
//! mentions and leaves all other tags as they were:
//!
//! ```
//! use fhir_deid::deidentify::PolicyTable;
//!
//! let overrides = PolicyTable::from_json_str(r#"{"Patient": ["name"]}"#).unwrap();
//! let table = PolicyTable::builtin().merge(overrides);
//!
//! assert_eq!(table.get("Patient"), Some(&["name".to_string()][..]));
//! assert!(table.get("Practitioner").is_some());
//! ```

use crate::domain::{DeidError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Policy key applied to every object
pub const WILDCARD: &str = "*";

/// Field handled by the identifier pseudonymizer instead of plain removal
pub const IDENTIFIER_FIELD: &str = "identifier";

/// Field exempted from removal in Safe Harbor mode (collapsed and binned instead)
pub const BIRTH_DATE_FIELD: &str = "birthDate";

/// Built-in resourceType → fields-to-strip table
const BUILTIN_POLICY: &[(&str, &[&str])] = &[
    (
        "Patient",
        &[
            "identifier",
            "name",
            "telecom",
            "address",
            "photo",
            "birthDate",
            "contact",
            "communication",
            "multipleBirthBoolean",
            "multipleBirthInteger",
            "generalPractitioner",
            "managingOrganization",
            "link",
        ],
    ),
    ("Practitioner", &["identifier", "name", "telecom", "address", "photo"]),
    ("PractitionerRole", &["telecom", "phone", "address"]),
    ("Organization", &["identifier", "telecom", "address"]),
    ("Endpoint", &["address"]),
    ("Device", &["identifier", "udiCarrier"]),
    ("Encounter", &["identifier", "location"]),
    ("Location", &["identifier", "address", "telecom"]),
    ("Claim", &["identifier"]),
    ("Observation", &["identifier"]),
    ("Condition", &["identifier"]),
    ("MedicationRequest", &["identifier"]),
    ("ImagingStudy", &["identifier"]),
    (WILDCARD, &["identifier"]),
];

/// Immutable resourceType-indexed removal policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyTable {
    entries: BTreeMap<String, Vec<String>>,
}

impl PolicyTable {
    /// The built-in Safe-Harbor-oriented policy
    pub fn builtin() -> Self {
        BUILTIN_POLICY
            .iter()
            .map(|(tag, fields)| {
                (
                    (*tag).to_string(),
                    fields.iter().map(|f| (*f).to_string()).collect(),
                )
            })
            .collect()
    }

    /// Parse a policy override from JSON (`{"Tag": ["field", ...], ...}`)
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| DeidError::Policy(format!("Invalid policy JSON: {e}")))
    }

    /// Load a policy override file
    pub fn load_policy_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DeidError::Policy(format!("Cannot load policy file {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            DeidError::Policy(format!("Cannot load policy file {}: {}", path.display(), e))
        })
    }

    /// Merge `overrides` into this table; mentioned tags are replaced wholesale
    pub fn merge(mut self, overrides: PolicyTable) -> Self {
        for (tag, fields) in overrides.entries {
            tracing::debug!(resource_type = %tag, fields = fields.len(), "Policy entry overridden");
            self.entries.insert(tag, fields);
        }
        self
    }

    /// Raw entry for `tag`
    pub fn get(&self, tag: &str) -> Option<&[String]> {
        self.entries.get(tag).map(Vec::as_slice)
    }

    /// Iterate entries in tag order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(tag, fields)| (tag.as_str(), fields.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Effective fields to strip from an object tagged `tag`
    ///
    /// The tag's own entry (empty if unknown or absent) comes first, followed
    /// by wildcard fields not already present. In Safe Harbor mode
    /// `birthDate` is carved out because it is collapsed and binned instead.
    pub fn fields_to_strip(&self, tag: Option<&str>, safe_harbor: bool) -> Vec<String> {
        let mut fields: Vec<String> = tag
            .and_then(|t| self.entries.get(t))
            .cloned()
            .unwrap_or_default();

        if tag != Some(WILDCARD) {
            if let Some(wildcard) = self.entries.get(WILDCARD) {
                for field in wildcard {
                    if !fields.contains(field) {
                        fields.push(field.clone());
                    }
                }
            }
        }

        if safe_harbor {
            fields.retain(|f| f != BIRTH_DATE_FIELD);
        }

        fields
    }

    /// Sorted union of a tag's entry and the wildcard, for reporting
    pub fn removed_fields(&self, tag: Option<&str>) -> Vec<String> {
        let mut fields: BTreeSet<&String> = BTreeSet::new();
        if let Some(entry) = tag.and_then(|t| self.entries.get(t)) {
            fields.extend(entry);
        }
        if let Some(wildcard) = self.entries.get(WILDCARD) {
            fields.extend(wildcard);
        }
        fields.into_iter().cloned().collect()
    }
}

impl FromIterator<(String, Vec<String>)> for PolicyTable {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
