//! Domain error types
//!
//! Errors raised at the edges of the de-identification pipeline: configuration,
//! policy loading and document I/O. The rewriting core itself never fails; it
//! degrades to pass-through for anything it cannot interpret.

use thiserror::Error;

/// Main fhir-deid error type
///
/// Wraps every failure the CLI and loaders can surface. Variants carry
/// rendered messages so third-party error types don't leak into the API.
#[derive(Debug, Error)]
pub enum DeidError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Policy file or policy override errors
    #[error("Policy error: {0}")]
    Policy(String),

    /// Input document could not be read or parsed
    #[error("Input error: {0}")]
    Input(String),

    /// Output document could not be written
    #[error("Output error: {0}")]
    Output(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl DeidError {
    /// Process exit code associated with this error class
    ///
    /// 2 = configuration/policy, 3 = input, 4 = output, 5 = anything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) | Self::Policy(_) | Self::Validation(_) => 2,
            Self::Input(_) => 3,
            Self::Output(_) => 4,
            Self::Serialization(_) | Self::Io(_) | Self::Other(_) => 5,
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for DeidError {
    fn from(err: std::io::Error) -> Self {
        DeidError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for DeidError {
    fn from(err: serde_json::Error) -> Self {
        DeidError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for DeidError {
    fn from(err: toml::de::Error) -> Self {
        DeidError::Configuration(format!("TOML parse error: {err}"))
    }
}
