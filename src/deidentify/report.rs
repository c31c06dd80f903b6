//! Run summary reporting
//!
//! A [`DeidReport`] aggregates the per-resource counters of a run into totals
//! that are safe to print or persist: counts, resource types and the number
//! of distinct subjects. Identifier values, subject references and offsets are
//! never recorded.

use crate::deidentify::{
    compliance::ComplianceMode,
    models::{DeidStats, DeidentifiedResource},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Label used for resources without a `resourceType`
const UNTYPED_RESOURCE: &str = "(untyped)";

/// Summary of a de-identification run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeidReport {
    /// Date handling applied to the run
    pub mode: ComplianceMode,

    /// Total resources processed
    pub total_resources: usize,

    /// Resources processed by `resourceType`
    pub resources_by_type: BTreeMap<String, usize>,

    /// Number of distinct subjects seen (counted by pseudonym)
    pub distinct_subjects: usize,

    /// Counters summed over all resources
    pub totals: DeidStats,

    /// Warnings raised during the run
    pub warnings: Vec<String>,

    /// Processing statistics
    pub stats: ProcessingStats,

    #[serde(skip)]
    subjects: BTreeSet<String>,
}

/// Processing statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingStats {
    /// Average processing time per resource (ms)
    pub avg_processing_time_ms: u64,

    /// Total processing time (ms)
    pub total_processing_time_ms: u64,

    /// Resources with at least one change
    pub resources_modified: usize,

    /// Resources passed through unchanged
    pub resources_unchanged: usize,

    /// Resources without a subject reference
    pub resources_without_subject: usize,
}

impl DeidReport {
    /// Create an empty report for a run in `mode`
    pub fn new(mode: ComplianceMode) -> Self {
        Self {
            mode,
            total_resources: 0,
            resources_by_type: BTreeMap::new(),
            distinct_subjects: 0,
            totals: DeidStats::default(),
            warnings: Vec::new(),
            stats: ProcessingStats::default(),
            subjects: BTreeSet::new(),
        }
    }

    /// Add results from a de-identified resource
    pub fn add_resource(&mut self, resource: &DeidentifiedResource) {
        self.total_resources += 1;
        self.stats.total_processing_time_ms += resource.processing_time_ms;

        let tag = resource
            .resource_type
            .clone()
            .unwrap_or_else(|| UNTYPED_RESOURCE.to_string());
        *self.resources_by_type.entry(tag).or_insert(0) += 1;

        match &resource.subject_pseudonym {
            Some(pseudonym) => {
                self.subjects.insert(pseudonym.clone());
                self.distinct_subjects = self.subjects.len();
            }
            None => self.stats.resources_without_subject += 1,
        }

        if resource.stats.is_untouched() {
            self.stats.resources_unchanged += 1;
        } else {
            self.stats.resources_modified += 1;
        }

        self.totals.merge(&resource.stats);
        self.stats.avg_processing_time_ms =
            self.stats.total_processing_time_ms / self.total_resources as u64;
    }

    /// Add a warning
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Format report for console output
    pub fn format_console(&self) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str("                  FHIR DE-IDENTIFICATION REPORT                \n");
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        output.push_str("📊 SUMMARY\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!("  Mode:                        {}\n", self.mode));
        output.push_str(&format!(
            "  Total Resources Processed:   {}\n",
            self.total_resources
        ));
        output.push_str(&format!(
            "  Resources Modified:          {}\n",
            self.stats.resources_modified
        ));
        output.push_str(&format!(
            "  Resources Unchanged:         {}\n",
            self.stats.resources_unchanged
        ));
        output.push_str(&format!(
            "  Distinct Subjects:           {}\n",
            self.distinct_subjects
        ));
        output.push_str(&format!(
            "  Avg Processing Time:         {} ms\n",
            self.stats.avg_processing_time_ms
        ));
        output.push('\n');

        if !self.resources_by_type.is_empty() {
            output.push_str("🗂  RESOURCES BY TYPE\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");

            let mut types: Vec<_> = self.resources_by_type.iter().collect();
            types.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            for (tag, count) in types {
                output.push_str(&format!("  {:30} {:>5}\n", tag, count));
            }
            output.push('\n');
        }

        output.push_str("🔒 TRANSFORMATIONS\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!(
            "  Fields Removed:              {}\n",
            self.totals.total_fields_removed()
        ));
        output.push_str(&format!(
            "  Identifiers Pseudonymized:   {}\n",
            self.totals.identifiers_masked
        ));
        output.push_str(&format!(
            "  Identifiers Dropped:         {}\n",
            self.totals.identifiers_dropped
        ));
        if self.mode.is_safe_harbor() {
            output.push_str(&format!(
                "  Dates Collapsed to Year:     {}\n",
                self.totals.dates_collapsed
            ));
            output.push_str(&format!(
                "  Birth Dates Aggregated 90+:  {}\n",
                self.totals.ages_binned
            ));
        } else {
            output.push_str(&format!(
                "  Dates Shifted:               {}\n",
                self.totals.dates_shifted
            ));
        }
        output.push_str(&format!(
            "  Unparsed Date Candidates:    {}\n",
            self.totals.unparsed_dates
        ));
        output.push('\n');

        if !self.totals.fields_removed.is_empty() {
            output.push_str("✂️  REMOVED FIELDS\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            for (field, count) in &self.totals.fields_removed {
                output.push_str(&format!("  {:30} {:>5}\n", field, count));
            }
            output.push('\n');
        }

        if !self.warnings.is_empty() {
            output.push_str("⚠️  WARNINGS\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            for warning in &self.warnings {
                output.push_str(&format!("  • {}\n", warning));
            }
            output.push('\n');
        }

        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        output
    }

    /// Format report as JSON
    pub fn format_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write report to file as JSON
    pub fn write_to_file(&self, path: &Path) -> std::io::Result<()> {
        let json = self.format_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

impl Default for DeidReport {
    fn default() -> Self {
        Self::new(ComplianceMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn resource(tag: Option<&str>, subject: Option<&str>, stats: DeidStats) -> DeidentifiedResource {
        DeidentifiedResource {
            resource_type: tag.map(str::to_string),
            document: json!({}),
            mode: ComplianceMode::DateShift,
            offset_days: 17,
            subject_pseudonym: subject.map(str::to_string),
            stats,
            timestamp: Utc::now(),
            processing_time_ms: 4,
        }
    }

    #[test]
    fn test_report_creation() {
        let report = DeidReport::new(ComplianceMode::HipaaSafeHarbor);
        assert_eq!(report.total_resources, 0);
        assert_eq!(report.distinct_subjects, 0);
        assert!(report.resources_by_type.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_add_resources() {
        let mut report = DeidReport::default();
        let mut changed = DeidStats::default();
        changed.record_removed("name");
        changed.dates_shifted = 2;

        report.add_resource(&resource(Some("Patient"), Some("aaaa"), changed));
        report.add_resource(&resource(Some("Encounter"), Some("aaaa"), DeidStats::default()));
        report.add_resource(&resource(None, None, DeidStats::default()));

        assert_eq!(report.total_resources, 3);
        assert_eq!(report.distinct_subjects, 1);
        assert_eq!(report.resources_by_type["Patient"], 1);
        assert_eq!(report.resources_by_type[UNTYPED_RESOURCE], 1);
        assert_eq!(report.stats.resources_modified, 1);
        assert_eq!(report.stats.resources_unchanged, 2);
        assert_eq!(report.stats.resources_without_subject, 1);
        assert_eq!(report.totals.dates_shifted, 2);
        assert_eq!(report.stats.avg_processing_time_ms, 4);
    }

    #[test]
    fn test_json_never_contains_offset_or_subjects() {
        let mut report = DeidReport::default();
        report.add_resource(&resource(Some("Patient"), Some("feedface"), DeidStats::default()));

        let json = report.format_json().unwrap();
        assert!(!json.contains("feedface"));
        assert!(!json.contains("offset"));
        assert!(json.contains("\"distinct_subjects\": 1"));
    }

    #[test]
    fn test_format_console() {
        let mut report = DeidReport::default();
        report.add_resource(&resource(Some("Observation"), None, DeidStats::default()));
        report.add_warning("Using the default salt");

        let output = report.format_console();
        assert!(output.contains("FHIR DE-IDENTIFICATION REPORT"));
        assert!(output.contains("Total Resources Processed:   1"));
        assert!(output.contains("Observation"));
        assert!(output.contains("Dates Shifted"));
        assert!(output.contains("Using the default salt"));
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        DeidReport::default().write_to_file(&path).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["mode"], "date_shift");
        assert_eq!(parsed["total_resources"], 0);
    }
}
