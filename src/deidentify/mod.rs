//! FHIR de-identification
//!
//! This module rewrites FHIR JSON resources so they can leave the clinical
//! boundary: policy-listed PHI fields are removed, allowlisted identifiers are
//! replaced by keyed hashes and every date is either shifted by a stable
//! per-subject offset or collapsed to its year (HIPAA Safe Harbor).
//!
//! # Architecture
//!
//! The pipeline consists of:
//! - **Policy**: resourceType-indexed table of fields to strip
//! - **Identifiers**: allowlist filter plus keyed SHA-256 pseudonyms
//! - **Dates**: precision-preserving FHIR date parser and formatter
//! - **Offsets**: deterministic per-subject day shift in `[-90, 90]`
//! - **Compliance**: date-shift and Safe Harbor modes, 90+ age aggregation
//! - **Audit**: append-only JSONL record without PHI
//!
//! # Usage
//!
//! ```rust
//! use fhir_deid::deidentify::Deidentifier;
//! use serde_json::json;
//!
//! # fn example() -> fhir_deid::domain::Result<()> {
//! let engine = Deidentifier::builder("s3cr3t").build()?;
//! let patient = json!({"resourceType": "Patient", "id": "p1", "name": [{"family": "Doe"}]});
//!
//! let result = engine.deidentify(&patient, None, false);
//! assert!(result.document.get("name").is_none());
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod audit;
pub mod compliance;
pub mod dates;
pub mod engine;
pub mod identifier;
pub mod models;
pub mod offset;
pub mod policy;
pub mod report;

// Re-export main types
pub use audit::AuditLogger;
pub use compliance::ComplianceMode;
pub use dates::{format_date, parse_date, shift_date, ParsedDate};
pub use engine::{Deidentifier, DeidentifierBuilder};
pub use identifier::{HashedSystems, Pseudonymizer};
pub use models::{DeidStats, DeidentifiedResource};
pub use offset::derive_offset;
pub use policy::PolicyTable;
pub use report::DeidReport;
