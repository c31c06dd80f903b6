// fhir-deid - FHIR JSON de-identification tool
// Copyright (c) 2025 fhir-deid Contributors
// Licensed under the MIT License

//! # fhir-deid - FHIR JSON de-identification
//!
//! fhir-deid rewrites FHIR R4 JSON resources so they can be shared for
//! analytics, machine learning and research without carrying protected
//! health information.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Removing** PHI fields listed in a per-resourceType policy table
//! - **Pseudonymizing** allowlisted identifiers with salted SHA-256 hashes
//! - **Shifting** every date by a stable per-subject offset in `[-90, 90]` days
//! - **Collapsing** dates to the year under HIPAA Safe Harbor, with 90+ birth
//!   years aggregated to `"1900"`
//!
//! ## Architecture
//!
//! fhir-deid follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`deidentify`] - De-identification engine (policy, identifiers, dates, audit)
//! - [`domain`] - Error and result types
//! - [`config`] - Configuration management and salt handling
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust
//! use fhir_deid::deidentify::Deidentifier;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Deidentifier::builder("s3cr3t").build()?;
//!
//! let encounter = json!({
//!     "resourceType": "Encounter",
//!     "subject": {"reference": "Patient/123"},
//!     "period": {"start": "2024-03-15"}
//! });
//!
//! // Fixed offset, date-shift mode
//! let result = engine.deidentify(&encounter, Some(10), false);
//! assert_eq!(result.document["period"]["start"], "2024-03-25");
//!
//! // Safe Harbor keeps only the year
//! let result = engine.deidentify(&encounter, None, true);
//! assert_eq!(result.document["period"]["start"], "2024");
//! # Ok(())
//! # }
//! ```
//!
//! ## Stable Offsets
//!
//! The date offset is derived from the salt and the resource's subject, so
//! every resource of one patient moves by the same number of days and
//! intervals between events survive:
//!
//! ```rust
//! use fhir_deid::deidentify::derive_offset;
//!
//! let a = derive_offset("s3cr3t", "Patient/123");
//! let b = derive_offset("s3cr3t", "Patient/123");
//! assert_eq!(a, b);
//! assert!((-90..=90).contains(&a));
//! ```
//!
//! ## Error Handling
//!
//! fhir-deid uses the [`domain::DeidError`] type for all errors. Each variant
//! maps to a process exit code:
//!
//! ```rust,no_run
//! use fhir_deid::domain::DeidError;
//!
//! fn example() -> Result<(), DeidError> {
//!     // Errors are automatically converted using the ? operator
//!     let config = fhir_deid::config::load_config("fhir-deid.toml")?;
//!     let policy = config.build_policy(None)?;
//!     println!("{} policy entries", policy.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! fhir-deid uses structured logging with the `tracing` crate. Log records
//! carry counts and pseudonyms, never identifier values or date offsets:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!(resources = 12, "Starting de-identification");
//! warn!(source = "placeholder", "Using a weak salt");
//! ```

pub mod cli;
pub mod config;
pub mod deidentify;
pub mod domain;
pub mod logging;
