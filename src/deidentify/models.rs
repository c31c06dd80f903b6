//! De-identification result models

use crate::deidentify::compliance::ComplianceMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Per-document counters collected while rewriting
///
/// Counts only; never values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeidStats {
    /// Policy-stripped fields by name (identifier fields are counted below)
    pub fields_removed: BTreeMap<String, usize>,

    /// Identifier elements kept in pseudonymized form
    pub identifiers_masked: usize,

    /// Identifier elements removed (system not allowlisted, or no value)
    pub identifiers_dropped: usize,

    /// Dates moved by the offset
    pub dates_shifted: usize,

    /// Dates reduced to their year
    pub dates_collapsed: usize,

    /// Birth dates aggregated into the 90+ bucket
    pub ages_binned: usize,

    /// Date-like strings that did not parse and were left unchanged
    pub unparsed_dates: usize,
}

impl DeidStats {
    /// Record one removal of `field`
    pub fn record_removed(&mut self, field: &str) {
        *self.fields_removed.entry(field.to_string()).or_insert(0) += 1;
    }

    /// Total policy removals across all field names
    pub fn total_fields_removed(&self) -> usize {
        self.fields_removed.values().sum()
    }

    /// Accumulate another set of counters into this one
    pub fn merge(&mut self, other: &DeidStats) {
        for (field, count) in &other.fields_removed {
            *self.fields_removed.entry(field.clone()).or_insert(0) += count;
        }
        self.identifiers_masked += other.identifiers_masked;
        self.identifiers_dropped += other.identifiers_dropped;
        self.dates_shifted += other.dates_shifted;
        self.dates_collapsed += other.dates_collapsed;
        self.ages_binned += other.ages_binned;
        self.unparsed_dates += other.unparsed_dates;
    }

    /// Whether anything at all was changed
    pub fn is_untouched(&self) -> bool {
        self.fields_removed.is_empty()
            && self.identifiers_masked == 0
            && self.identifiers_dropped == 0
            && self.dates_shifted == 0
            && self.dates_collapsed == 0
    }
}

/// A de-identified FHIR resource with processing metadata
#[derive(Debug, Clone)]
pub struct DeidentifiedResource {
    /// `resourceType` of the input, if it had one
    pub resource_type: Option<String>,

    /// The rewritten document
    pub document: Value,

    /// Date handling applied
    pub mode: ComplianceMode,

    /// Day offset applied to dates (0 under Safe Harbor).
    /// Knowing it reverses the shift; keep it out of logs and reports.
    pub offset_days: i64,

    /// Keyed hash of the subject reference, `None` when no subject was found
    pub subject_pseudonym: Option<String>,

    /// What the rewrite did
    pub stats: DeidStats,

    /// When the resource was processed
    pub timestamp: DateTime<Utc>,

    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl DeidentifiedResource {
    /// Label for the date handling, suitable for logs
    pub fn date_handling(&self) -> &'static str {
        if self.mode.is_safe_harbor() {
            "collapsed"
        } else {
            "shifted"
        }
    }

    /// Consume the result, keeping only the document
    pub fn into_document(self) -> Value {
        self.document
    }
}
