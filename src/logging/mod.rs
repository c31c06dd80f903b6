//! Logging and observability
//!
//! Structured logging via `tracing`, written to stderr and optionally to
//! rotating JSON files. Records carry counts, resource types and
//! pseudonyms; never identifier values, salts, subject references or
//! date offsets.
//!
//! # Example
//!
//! ```no_run
//! use fhir_deid::logging::init_logging;
//! use fhir_deid::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(resources = 3, "Run started");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, LoggingGuard};

/// Log a de-identified resource
///
/// # Example
///
/// ```no_run
/// use fhir_deid::deidentify::Deidentifier;
/// use fhir_deid::log_resource_deidentified;
/// use serde_json::json;
///
/// let engine = Deidentifier::builder("s3cr3t").build().unwrap();
/// let result = engine.deidentify(&json!({"resourceType": "Patient"}), None, false);
/// log_resource_deidentified!(&result);
/// ```
#[macro_export]
macro_rules! log_resource_deidentified {
    ($result:expr) => {
        tracing::debug!(
            resource_type = $result.resource_type.as_deref().unwrap_or("-"),
            dates = $result.date_handling(),
            fields_removed = $result.stats.total_fields_removed(),
            identifiers_masked = $result.stats.identifiers_masked,
            identifiers_dropped = $result.stats.identifiers_dropped,
            processing_time_ms = $result.processing_time_ms,
            "Resource de-identified"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use fhir_deid::log_error_with_context;
/// use fhir_deid::domain::DeidError;
///
/// let error = DeidError::Input("Not valid JSON".to_string());
/// log_error_with_context!(&error, "Failed to read patient.json");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = %$context,
            "Error occurred"
        );
    };
}

/// Warn that the salt offers no protection
///
/// # Example
///
/// ```no_run
/// use fhir_deid::log_weak_salt;
/// use fhir_deid::config::SaltSource;
///
/// log_weak_salt!(SaltSource::Placeholder);
/// ```
#[macro_export]
macro_rules! log_weak_salt {
    ($source:expr) => {
        tracing::warn!(
            source = %$source,
            "Weak salt in use; pseudonyms and offsets can be reproduced by anyone"
        );
    };
}
