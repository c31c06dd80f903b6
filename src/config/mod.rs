//! Configuration management for fhir-deid.
//!
//! Configuration is optional: every setting has a default and the CLI flags
//! take precedence over the file. When a file is used it is TOML with support
//! for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - Environment overrides (`FHIR_DEID_<SECTION>_<KEY>`)
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use fhir_deid::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("fhir-deid.toml")?;
//!
//! println!("Mode: {}", config.deidentify.mode);
//! println!("Hash length: {}", config.deidentify.hash_length);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level
//! - [`DeidentifyConfig`] - Mode, salt, offsets, identifier allowlist, policy file
//! - `[policy]` - Inline policy overrides, same shape as a policy file
//! - [`LoggingConfig`] - Optional JSON log files
//! - [`AuditConfig`] - Per-resource audit trail
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "warn"
//!
//! [deidentify]
//! mode = "date_shift"
//! salt = "${DEID_SALT}"
//! hash_length = 16
//!
//! [policy]
//! Patient = ["identifier", "name", "telecom", "address", "birthDate"]
//!
//! [audit]
//! enabled = true
//! log_path = "./audit/deidentify.log"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, load_config_from_str, load_optional_config};
pub use schema::{ApplicationConfig, AuditConfig, DeidConfig, DeidentifyConfig, LoggingConfig};
pub use secret::{
    is_weak_salt, resolve_salt, secret_string, ResolvedSalt, SaltSource, SecretString,
    SecretValue, DEFAULT_SALT_PLACEHOLDER,
};
