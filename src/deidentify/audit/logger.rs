//! Audit logger for de-identification operations

use crate::deidentify::models::DeidentifiedResource;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Audit log entry
///
/// Holds counts and the keyed subject pseudonym only; identifier values,
/// dates and the day offset never reach the audit trail.
#[derive(Debug, Serialize)]
struct AuditLogEntry<'a> {
    timestamp: String,
    source: &'a str,
    resource_type: Option<&'a str>,
    subject_pseudonym: Option<&'a str>,
    mode: String,
    date_handling: &'static str,
    fields_removed: &'a BTreeMap<String, usize>,
    identifiers_masked: usize,
    identifiers_dropped: usize,
    dates_changed: usize,
    processing_time_ms: u64,
}

/// Audit logger for de-identification operations
pub struct AuditLogger {
    log_path: PathBuf,
    json_format: bool,
    enabled: bool,
}

impl AuditLogger {
    /// Create a new audit logger
    pub fn new(log_path: PathBuf, json_format: bool, enabled: bool) -> Result<Self> {
        if enabled {
            if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create audit log directory: {}", parent.display())
                })?;
            }
        }

        Ok(Self {
            log_path,
            json_format,
            enabled,
        })
    }

    /// A logger that records nothing
    pub fn disabled() -> Self {
        Self {
            log_path: PathBuf::new(),
            json_format: true,
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record one de-identified resource read from `source`
    pub fn log_deidentification(
        &self,
        resource: &DeidentifiedResource,
        source: &str,
    ) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let entry = AuditLogEntry {
            timestamp: resource.timestamp.to_rfc3339(),
            source,
            resource_type: resource.resource_type.as_deref(),
            subject_pseudonym: resource.subject_pseudonym.as_deref(),
            mode: resource.mode.to_string(),
            date_handling: resource.date_handling(),
            fields_removed: &resource.stats.fields_removed,
            identifiers_masked: resource.stats.identifiers_masked,
            identifiers_dropped: resource.stats.identifiers_dropped,
            dates_changed: resource.stats.dates_shifted + resource.stats.dates_collapsed,
            processing_time_ms: resource.processing_time_ms,
        };

        self.write_entry(&entry)
    }

    fn write_entry(&self, entry: &AuditLogEntry<'_>) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("Failed to open audit log: {}", self.log_path.display()))?;

        if self.json_format {
            let json_line =
                serde_json::to_string(entry).context("Failed to serialize audit entry")?;
            writeln!(file, "{json_line}").context("Failed to write audit entry")?;
        } else {
            writeln!(
                file,
                "[{}] Source: {} | Type: {} | Subject: {} | Dates: {} | Removed: {} | Identifiers: {} kept, {} dropped | Time: {}ms",
                entry.timestamp,
                entry.source,
                entry.resource_type.unwrap_or("-"),
                entry.subject_pseudonym.unwrap_or("-"),
                entry.date_handling,
                entry.fields_removed.values().sum::<usize>(),
                entry.identifiers_masked,
                entry.identifiers_dropped,
                entry.processing_time_ms
            )
            .context("Failed to write audit entry")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deidentify::Deidentifier;
    use serde_json::json;
    use tempfile::tempdir;

    fn deidentified() -> DeidentifiedResource {
        let engine = Deidentifier::builder("audit-secret").build().unwrap();
        engine.deidentify(
            &json!({
                "resourceType": "Patient",
                "id": "patient-42",
                "name": [{"family": "Doe"}],
                "identifier": [{"system": "urn:system:mrn", "value": "MRN-998877"}],
                "deceasedDateTime": "2024-01-01T00:00:00Z"
            }),
            Some(33),
            false,
        )
    }

    #[test]
    fn test_audit_logger_creation() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("nested").join("audit.log");

        let logger = AuditLogger::new(log_path.clone(), true, true).unwrap();
        assert!(logger.is_enabled());
        assert!(log_path.parent().unwrap().exists());
    }

    #[test]
    fn test_log_resource_json() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.log");
        let logger = AuditLogger::new(log_path.clone(), true, true).unwrap();

        let resource = deidentified();
        logger.log_deidentification(&resource, "patient.json").unwrap();
        logger.log_deidentification(&resource, "patient.json").unwrap();

        let content = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let entry: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(entry["source"], "patient.json");
        assert_eq!(entry["resource_type"], "Patient");
        assert_eq!(entry["date_handling"], "shifted");
        assert_eq!(entry["identifiers_masked"], 1);
        assert_eq!(entry["fields_removed"]["name"], 1);

        assert!(!content.contains("patient-42"));
        assert!(!content.contains("MRN-998877"));
        assert!(!content.contains("Doe"));
        assert!(!content.contains("offset"));
    }

    #[test]
    fn test_log_resource_text() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.txt");
        let logger = AuditLogger::new(log_path.clone(), false, true).unwrap();

        logger.log_deidentification(&deidentified(), "in.json").unwrap();

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("Source: in.json"));
        assert!(content.contains("Type: Patient"));
        assert!(!content.contains("MRN-998877"));
    }

    #[test]
    fn test_disabled_logger_writes_nothing() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.log");
        let logger = AuditLogger::new(log_path.clone(), true, false).unwrap();

        logger.log_deidentification(&deidentified(), "in.json").unwrap();
        assert!(!log_path.exists());
        assert!(AuditLogger::disabled().log_deidentification(&deidentified(), "x").is_ok());
    }
}
