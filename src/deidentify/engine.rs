//! Main de-identification engine
//!
//! This module provides the [`Deidentifier`] that walks a FHIR JSON document
//! and produces a de-identified copy.
//!
//! # Architecture
//!
//! For every object the engine resolves the fields to strip from the
//! [`PolicyTable`] using the object's own `resourceType`, then handles each
//! field in input order:
//!
//! - **Policy-stripped `identifier`**: allowlisted identifiers are
//!   pseudonymized, all others dropped
//! - **Other policy-stripped fields**: omitted
//! - **Date-like strings**: shifted by the subject offset or collapsed to the
//!   year; birth dates may be binned in Safe Harbor mode
//! - **Everything else**: rewritten recursively and kept
//!
//! The input document is never modified.
//!
//! # Examples
//!
//! ```
//! use fhir_deid::deidentify::Deidentifier;
//! use serde_json::json;
//!
//! # fn example() -> fhir_deid::domain::Result<()> {
//! let engine = Deidentifier::builder("s3cr3t").build()?;
//!
//! let encounter = json!({
//!     "resourceType": "Encounter",
//!     "period": {"start": "2024-01-01T00:00:00Z", "end": "2024-01-02T00:00:00Z"}
//! });
//!
//! let result = engine.deidentify(&encounter, Some(10), false);
//! assert_eq!(result.document["period"]["start"], "2024-01-11T00:00:00Z");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use crate::config::{secret_string, SecretString};
use crate::deidentify::{
    compliance::{hipaa::bin_birth_date, ComplianceMode},
    dates::{apply_shift, is_date_key, looks_like_date, parse_date},
    identifier::{HashedSystems, Pseudonymizer, DEFAULT_HASH_LENGTH, FULL_DIGEST_LENGTH},
    models::{DeidStats, DeidentifiedResource},
    offset::derive_offset,
    policy::{PolicyTable, BIRTH_DATE_FIELD, IDENTIFIER_FIELD},
    report::DeidReport,
};
use crate::domain::{DeidError, Result};
use chrono::{Datelike, Utc};
use secrecy::ExposeSecret;
use serde_json::{Map, Value};
use std::time::Instant;

/// Field holding a resource's type tag
pub const RESOURCE_TYPE_FIELD: &str = "resourceType";

/// Resource type whose own `id` is the subject identifier
pub const SUBJECT_RESOURCE_TYPE: &str = "Patient";

/// Reference fields consulted, in order, for non-Patient resources
const SUBJECT_REFERENCE_FIELDS: &[&str] = &["subject", "patient"];

/// Prepended to the subject id before hashing its pseudonym, so the
/// pseudonym never shares a digest with the date offset
const SUBJECT_PSEUDONYM_PREFIX: &str = "subject:";

/// De-identification engine
///
/// Holds only immutable configuration (policy, allowlist, secret), so a
/// single instance can be shared across threads and used for any number of
/// documents. Each call builds a fresh output tree.
///
/// # Examples
///
/// ```
/// use fhir_deid::deidentify::{Deidentifier, HashedSystems, PolicyTable};
///
/// # fn example() -> fhir_deid::domain::Result<()> {
/// let engine = Deidentifier::builder("s3cr3t")
///     .policy(PolicyTable::builtin())
///     .hashed_systems(HashedSystems::new(["urn:system:mrn"]))
///     .hash_length(24)
///     .reference_year(2025)
///     .build()?;
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct Deidentifier {
    policy: PolicyTable,
    hashed_systems: HashedSystems,
    secret: SecretString,
    hash_length: usize,
    reference_year: i32,
}

impl Deidentifier {
    /// Start building an engine around `secret`
    pub fn builder(secret: impl Into<String>) -> DeidentifierBuilder {
        DeidentifierBuilder::new(secret_string(secret.into()))
    }

    /// Start building an engine around an already-protected secret
    pub fn builder_with_secret(secret: SecretString) -> DeidentifierBuilder {
        DeidentifierBuilder::new(secret)
    }

    /// The effective policy table
    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    /// The identifier systems kept in hashed form
    pub fn hashed_systems(&self) -> &HashedSystems {
        &self.hashed_systems
    }

    /// Pseudonym length in hex characters
    pub fn hash_length(&self) -> usize {
        self.hash_length
    }

    /// Year against which Safe Harbor ages are computed
    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    fn secret(&self) -> &str {
        self.secret.expose_secret().as_ref()
    }

    fn pseudonymizer(&self) -> Pseudonymizer<'_> {
        Pseudonymizer::new(self.secret()).with_hash_length(self.hash_length)
    }

    /// De-identify one resource
    ///
    /// The subject is read from the resource itself (see
    /// [`subject_identifier`]). In Safe Harbor mode the offset is forced to 0
    /// and every date collapses to its year; otherwise `fixed_offset` is used
    /// when given, else the offset is derived from the secret and subject.
    pub fn deidentify(
        &self,
        document: &Value,
        fixed_offset: Option<i64>,
        safe_harbor: bool,
    ) -> DeidentifiedResource {
        let start = Instant::now();

        let resource_type = resource_type(document).map(str::to_string);
        let subject_id = subject_identifier(document);

        let (offset_days, collapse_dates) = if safe_harbor {
            (0, true)
        } else {
            let offset =
                fixed_offset.unwrap_or_else(|| derive_offset(self.secret(), &subject_id));
            (offset, false)
        };

        let mut walk = Rewrite::new(self, offset_days, collapse_dates, safe_harbor);
        let rewritten = walk.node(document);

        let subject_pseudonym = (!subject_id.is_empty()).then(|| {
            self.pseudonymizer()
                .hash(&format!("{SUBJECT_PSEUDONYM_PREFIX}{subject_id}"))
        });

        let result = DeidentifiedResource {
            resource_type,
            document: rewritten,
            mode: ComplianceMode::from_safe_harbor(safe_harbor),
            offset_days,
            subject_pseudonym,
            stats: walk.stats,
            timestamp: Utc::now(),
            processing_time_ms: start.elapsed().as_millis() as u64,
        };

        crate::log_resource_deidentified!(&result);
        result
    }

    /// De-identify several independent resources and summarize the run
    ///
    /// Each document gets its own subject lookup and offset.
    pub fn deidentify_batch<'a, I>(
        &self,
        documents: I,
        fixed_offset: Option<i64>,
        safe_harbor: bool,
    ) -> (Vec<DeidentifiedResource>, DeidReport)
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut report = DeidReport::new(ComplianceMode::from_safe_harbor(safe_harbor));
        let results: Vec<DeidentifiedResource> = documents
            .into_iter()
            .map(|document| {
                let result = self.deidentify(document, fixed_offset, safe_harbor);
                report.add_resource(&result);
                result
            })
            .collect();
        (results, report)
    }

    /// Rewrite an arbitrary node with explicit parameters
    ///
    /// Lower-level than [`deidentify`](Self::deidentify): no subject lookup,
    /// no offset derivation, no statistics.
    pub fn rewrite(
        &self,
        node: &Value,
        offset_days: i64,
        collapse_dates: bool,
        safe_harbor: bool,
    ) -> Value {
        Rewrite::new(self, offset_days, collapse_dates, safe_harbor).node(node)
    }
}

/// Builder for [`Deidentifier`]
#[derive(Debug)]
pub struct DeidentifierBuilder {
    secret: SecretString,
    policy: PolicyTable,
    hashed_systems: HashedSystems,
    hash_length: usize,
    reference_year: Option<i32>,
}

impl DeidentifierBuilder {
    fn new(secret: SecretString) -> Self {
        Self {
            secret,
            policy: PolicyTable::builtin(),
            hashed_systems: HashedSystems::default(),
            hash_length: DEFAULT_HASH_LENGTH,
            reference_year: None,
        }
    }

    /// Use `policy` instead of the built-in table
    pub fn policy(mut self, policy: PolicyTable) -> Self {
        self.policy = policy;
        self
    }

    /// Use a custom identifier-system allowlist
    pub fn hashed_systems(mut self, systems: HashedSystems) -> Self {
        self.hashed_systems = systems;
        self
    }

    /// Pseudonym length in hex characters (1..=64)
    pub fn hash_length(mut self, length: usize) -> Self {
        self.hash_length = length;
        self
    }

    /// Fix the year used for Safe Harbor age binning (defaults to now)
    pub fn reference_year(mut self, year: i32) -> Self {
        self.reference_year = Some(year);
        self
    }

    /// Build the engine
    ///
    /// # Errors
    ///
    /// Returns [`DeidError::Validation`] if the hash length is out of range.
    pub fn build(self) -> Result<Deidentifier> {
        if !(1..=FULL_DIGEST_LENGTH).contains(&self.hash_length) {
            return Err(DeidError::Validation(format!(
                "hash_length must be between 1 and {FULL_DIGEST_LENGTH}, got {}",
                self.hash_length
            )));
        }

        Ok(Deidentifier {
            policy: self.policy,
            hashed_systems: self.hashed_systems,
            secret: self.secret,
            hash_length: self.hash_length,
            reference_year: self.reference_year.unwrap_or_else(|| Utc::now().year()),
        })
    }
}

/// `resourceType` of a node, if it is an object carrying a string tag
pub fn resource_type(node: &Value) -> Option<&str> {
    node.get(RESOURCE_TYPE_FIELD).and_then(Value::as_str)
}

/// The subject identifier used to key the date offset
///
/// A Patient's own `id`; otherwise the first truthy of `subject`/`patient`,
/// which may be a plain reference string or an object with a `reference`.
/// Empty when none is present.
///
/// ```
/// use fhir_deid::deidentify::engine::subject_identifier;
/// use serde_json::json;
///
/// assert_eq!(subject_identifier(&json!({"resourceType": "Patient", "id": "p1"})), "p1");
/// assert_eq!(
///     subject_identifier(&json!({"resourceType": "Encounter", "subject": {"reference": "Patient/p1"}})),
///     "Patient/p1"
/// );
/// assert_eq!(subject_identifier(&json!({"resourceType": "Claim", "patient": "Patient/p2"})), "Patient/p2");
/// assert_eq!(subject_identifier(&json!({"resourceType": "Group"})), "");
/// ```
pub fn subject_identifier(resource: &Value) -> String {
    if resource_type(resource) == Some(SUBJECT_RESOURCE_TYPE) {
        return resource
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
    }

    let reference = SUBJECT_REFERENCE_FIELDS
        .iter()
        .filter_map(|field| resource.get(*field))
        .find(|value| is_truthy(value));

    match reference {
        Some(Value::String(reference)) => reference.clone(),
        Some(Value::Object(object)) => object
            .get("reference")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

/// Emptiness test for reference fields: null, false, 0, "" and empty
/// containers don't count as present.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// State for one traversal: fixed parameters plus the counters
struct Rewrite<'a> {
    engine: &'a Deidentifier,
    pseudonymizer: Pseudonymizer<'a>,
    offset_days: i64,
    collapse_dates: bool,
    safe_harbor: bool,
    stats: DeidStats,
}

impl<'a> Rewrite<'a> {
    fn new(
        engine: &'a Deidentifier,
        offset_days: i64,
        collapse_dates: bool,
        safe_harbor: bool,
    ) -> Self {
        Self {
            engine,
            pseudonymizer: engine.pseudonymizer(),
            offset_days,
            collapse_dates,
            safe_harbor,
            stats: DeidStats::default(),
        }
    }

    fn node(&mut self, node: &Value) -> Value {
        match node {
            Value::Object(map) => self.object(map),
            Value::Array(items) => Value::Array(items.iter().map(|item| self.node(item)).collect()),
            scalar => scalar.clone(),
        }
    }

    fn object(&mut self, map: &Map<String, Value>) -> Value {
        let tag = map.get(RESOURCE_TYPE_FIELD).and_then(Value::as_str);
        let strip = self.engine.policy.fields_to_strip(tag, self.safe_harbor);

        let mut out = Map::with_capacity(map.len());
        for (key, value) in map {
            if strip.iter().any(|field| field == key) {
                if key == IDENTIFIER_FIELD {
                    if let Some(kept) = self.identifiers(value) {
                        out.insert(key.clone(), kept);
                    }
                } else {
                    self.stats.record_removed(key);
                }
                continue;
            }

            if let Value::String(text) = value {
                if is_date_key(key) || looks_like_date(text) {
                    if let Some(rewritten) = self.date(key, text) {
                        out.insert(key.clone(), Value::String(rewritten));
                        continue;
                    }
                }
            }

            out.insert(key.clone(), self.node(value));
        }

        Value::Object(out)
    }

    /// Pseudonymize an identifier field (single element or list).
    ///
    /// Returns `None` when nothing survives so the field is omitted.
    fn identifiers(&mut self, value: &Value) -> Option<Value> {
        let (items, is_list) = match value {
            Value::Array(items) => (items.iter().collect::<Vec<_>>(), true),
            single => (vec![single], false),
        };

        let mut kept = Vec::with_capacity(items.len());
        for identifier in items {
            let masked = self
                .engine
                .hashed_systems
                .admits(identifier)
                .then(|| self.pseudonymizer.mask(identifier))
                .flatten();

            match masked {
                Some(masked) => {
                    self.stats.identifiers_masked += 1;
                    kept.push(masked);
                }
                None => self.stats.identifiers_dropped += 1,
            }
        }

        if kept.is_empty() {
            return None;
        }
        if is_list {
            Some(Value::Array(kept))
        } else {
            kept.pop()
        }
    }

    /// Shift or collapse a date candidate; `None` if it doesn't parse.
    fn date(&mut self, key: &str, text: &str) -> Option<String> {
        let Some(parsed) = parse_date(text) else {
            self.stats.unparsed_dates += 1;
            return None;
        };

        let mut rewritten = apply_shift(text, &parsed, self.offset_days, self.collapse_dates);
        if self.collapse_dates {
            self.stats.dates_collapsed += 1;
        } else {
            self.stats.dates_shifted += 1;
        }

        if self.safe_harbor && key == BIRTH_DATE_FIELD {
            if let Some(binned) = bin_birth_date(&rewritten, self.engine.reference_year) {
                rewritten = binned.to_string();
                self.stats.ages_binned += 1;
            }
        }

        Some(rewritten)
    }
}
