//! Salt handling
//!
//! The salt keys every pseudonym and date offset, so whoever holds it can
//! link output back to source records. It is kept in a `secrecy` container
//! that zeroizes on drop and redacts itself from `Debug` output; reading it
//! requires an explicit `expose_secret()`.
//!
//! # Resolution order
//!
//! [`resolve_salt`] picks the first available of:
//!
//! 1. a salt file given on the command line
//! 2. a salt given on the command line (or `DEID_SALT`)
//! 3. `deidentify.salt_file` from the configuration
//! 4. `deidentify.salt` from the configuration
//! 5. [`DEFAULT_SALT_PLACEHOLDER`]
//!
//! ```rust
//! use fhir_deid::config::{resolve_salt, DeidentifyConfig, SaltSource};
//! use secrecy::ExposeSecret;
//!
//! let resolved = resolve_salt(None, Some("from-cli"), &DeidentifyConfig::default()).unwrap();
//! assert_eq!(resolved.source, SaltSource::Argument);
//! assert_eq!(resolved.salt.expose_secret().as_ref(), "from-cli");
//! assert!(!resolved.is_weak());
//! ```

use super::schema::DeidentifyConfig;
use crate::domain::{DeidError, Result};
use secrecy::{CloneableSecret, DebugSecret, ExposeSecret, Secret};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::Path;
use zeroize::Zeroize;

/// Salt used when none is configured. Output produced with it is only
/// pseudonymous against people who don't know this constant.
pub const DEFAULT_SALT_PLACEHOLDER: &str = "change-me-salt";

/// Newtype wrapper for String that implements the required traits for Secret
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// A secret string: zeroized on drop, redacted in `Debug`
pub type SecretString = Secret<SecretValue>;

/// Wrap a String in a [`SecretString`]
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

/// Where the effective salt came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaltSource {
    /// `--salt-file`
    ArgumentFile,
    /// `--salt` or `DEID_SALT`
    Argument,
    /// `deidentify.salt_file`
    ConfigFile,
    /// `deidentify.salt`
    Config,
    /// Nothing configured
    Placeholder,
}

impl fmt::Display for SaltSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SaltSource::ArgumentFile => "--salt-file",
            SaltSource::Argument => "--salt/DEID_SALT",
            SaltSource::ConfigFile => "config salt_file",
            SaltSource::Config => "config salt",
            SaltSource::Placeholder => "built-in placeholder",
        };
        f.write_str(label)
    }
}

/// The effective salt and its origin
#[derive(Debug, Clone)]
pub struct ResolvedSalt {
    pub salt: SecretString,
    pub source: SaltSource,
}

impl ResolvedSalt {
    /// Whether the salt is empty or the well-known placeholder
    pub fn is_weak(&self) -> bool {
        is_weak_salt(self.salt.expose_secret().as_ref())
    }
}

/// Whether `salt` offers no protection (empty or the placeholder)
pub fn is_weak_salt(salt: &str) -> bool {
    salt.is_empty() || salt == DEFAULT_SALT_PLACEHOLDER
}

/// Read a salt file, trimming surrounding whitespace
pub fn read_salt_file(path: &Path) -> Result<SecretString> {
    let mut content = std::fs::read_to_string(path).map_err(|e| {
        DeidError::Configuration(format!(
            "Failed to read salt file {}: {}",
            path.display(),
            e
        ))
    })?;
    let salt = content.trim().to_string();
    content.zeroize();
    Ok(secret_string(salt))
}

/// Pick the effective salt (see the module docs for the order)
pub fn resolve_salt(
    cli_salt_file: Option<&Path>,
    cli_salt: Option<&str>,
    config: &DeidentifyConfig,
) -> Result<ResolvedSalt> {
    if let Some(path) = cli_salt_file {
        return Ok(ResolvedSalt {
            salt: read_salt_file(path)?,
            source: SaltSource::ArgumentFile,
        });
    }

    if let Some(salt) = cli_salt {
        return Ok(ResolvedSalt {
            salt: secret_string(salt.to_string()),
            source: SaltSource::Argument,
        });
    }

    if let Some(path) = &config.salt_file {
        return Ok(ResolvedSalt {
            salt: read_salt_file(path)?,
            source: SaltSource::ConfigFile,
        });
    }

    if let Some(salt) = &config.salt {
        return Ok(ResolvedSalt {
            salt: salt.clone(),
            source: SaltSource::Config,
        });
    }

    Ok(ResolvedSalt {
        salt: secret_string(DEFAULT_SALT_PLACEHOLDER.to_string()),
        source: SaltSource::Placeholder,
    })
}
