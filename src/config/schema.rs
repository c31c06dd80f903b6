//! Configuration schema definitions

use super::secret::SecretString;
use crate::deidentify::{
    compliance::ComplianceMode,
    identifier::{HashedSystems, DEFAULT_HASHED_SYSTEMS, DEFAULT_HASH_LENGTH, FULL_DIGEST_LENGTH},
    policy::PolicyTable,
};
use crate::domain::Result as DeidResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest fixed shift accepted from configuration (about 100 years)
pub const MAX_CONFIGURED_SHIFT_DAYS: i64 = 36_500;

/// Main fhir-deid configuration
///
/// This is the root configuration structure that maps to the TOML file.
/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeidConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// De-identification settings
    #[serde(default)]
    pub deidentify: DeidentifyConfig,

    /// Inline policy overrides (`Tag = ["field", ...]`)
    #[serde(default)]
    pub policy: PolicyTable,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Audit trail configuration
    #[serde(default)]
    pub audit: AuditConfig,
}

impl DeidConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.deidentify.validate()?;
        self.logging.validate()?;
        self.audit.validate()?;
        Ok(())
    }

    /// Effective policy: built-in, then the policy file, then inline
    /// `[policy]`, then `cli_policy`. Later layers replace earlier ones per tag.
    pub fn build_policy(&self, cli_policy: Option<&Path>) -> DeidResult<PolicyTable> {
        let mut policy = PolicyTable::builtin();

        if let Some(path) = &self.deidentify.policy_file {
            policy = policy.merge(PolicyTable::load_policy_file(path)?);
        }
        if !self.policy.is_empty() {
            policy = policy.merge(self.policy.clone());
        }
        if let Some(path) = cli_policy {
            policy = policy.merge(PolicyTable::load_policy_file(path)?);
        }

        Ok(policy)
    }

    /// The identifier-system allowlist
    pub fn hashed_systems(&self) -> HashedSystems {
        HashedSystems::new(self.deidentify.hashed_identifier_systems.iter().cloned())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// De-identification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeidentifyConfig {
    /// Date handling mode
    #[serde(default)]
    pub mode: ComplianceMode,

    /// Fixed day offset for every resource (date-shift mode only)
    #[serde(default)]
    pub shift_days: Option<i64>,

    /// Pseudonym length in hex characters
    #[serde(default = "default_hash_length")]
    pub hash_length: usize,

    /// Secret salt for hashing and offsets
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default, skip_serializing)]
    pub salt: Option<SecretString>,

    /// File holding the salt (trimmed on read)
    #[serde(default)]
    pub salt_file: Option<PathBuf>,

    /// Identifier systems kept in hashed form
    #[serde(default = "default_hashed_identifier_systems")]
    pub hashed_identifier_systems: Vec<String>,

    /// JSON policy override file
    #[serde(default)]
    pub policy_file: Option<PathBuf>,
}

impl DeidentifyConfig {
    fn validate(&self) -> Result<(), String> {
        if !(1..=FULL_DIGEST_LENGTH).contains(&self.hash_length) {
            return Err(format!(
                "deidentify.hash_length must be between 1 and {}, got {}",
                FULL_DIGEST_LENGTH, self.hash_length
            ));
        }

        if let Some(days) = self.shift_days {
            if !(-MAX_CONFIGURED_SHIFT_DAYS..=MAX_CONFIGURED_SHIFT_DAYS).contains(&days) {
                return Err(format!(
                    "deidentify.shift_days must be within ±{MAX_CONFIGURED_SHIFT_DAYS}, got {days}"
                ));
            }
        }

        if self
            .hashed_identifier_systems
            .iter()
            .any(|system| system.trim().is_empty())
        {
            return Err(
                "deidentify.hashed_identifier_systems must not contain empty entries".to_string(),
            );
        }

        Ok(())
    }
}

impl Default for DeidentifyConfig {
    fn default() -> Self {
        Self {
            mode: ComplianceMode::default(),
            shift_days: None,
            hash_length: default_hash_length(),
            salt: None,
            salt_file: None,
            hashed_identifier_systems: default_hashed_identifier_systems(),
            policy_file: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local JSON file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path must be set when local logging is enabled".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

/// Audit trail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Write one audit record per de-identified resource
    #[serde(default)]
    pub enabled: bool,

    /// Audit log file
    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,

    /// JSON lines (true) or plain text (false)
    #[serde(default = "default_true")]
    pub json_format: bool,
}

impl AuditConfig {
    fn validate(&self) -> Result<(), String> {
        if self.enabled && self.log_path.as_os_str().is_empty() {
            return Err("audit.log_path must be set when audit is enabled".to_string());
        }
        Ok(())
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_path: default_audit_log_path(),
            json_format: true,
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "warn".to_string()
}

fn default_true() -> bool {
    true
}

fn default_hash_length() -> usize {
    DEFAULT_HASH_LENGTH
}

fn default_hashed_identifier_systems() -> Vec<String> {
    DEFAULT_HASHED_SYSTEMS.iter().map(|s| s.to_string()).collect()
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("./audit/deidentify.log")
}
