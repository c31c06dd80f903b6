//! Compliance modes
//!
//! # Modes
//!
//! ## Date shift (default)
//!
//! Dates move by a deterministic per-subject offset in `[-90, 90]` days,
//! keeping their original precision. Intervals between a subject's events
//! are preserved, which suits longitudinal research extracts.
//!
//! ## HIPAA Safe Harbor
//!
//! Implements the date and age rules of 45 CFR §164.514(b)(2)(i)(C): every
//! date is reduced to its year, any caller-supplied offset is ignored, and
//! birth years implying an age of 90 or more are aggregated into a single
//! `"1900"` bucket.
//!
//! # Examples
//!
//! ```
//! use fhir_deid::deidentify::compliance::ComplianceMode;
//!
//! let mode = ComplianceMode::HipaaSafeHarbor;
//! assert_eq!(mode.to_string(), "hipaa_safe_harbor");
//! assert!(mode.is_safe_harbor());
//!
//! assert_eq!(ComplianceMode::default(), ComplianceMode::DateShift);
//! ```

pub mod hipaa;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How temporal values are de-identified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceMode {
    /// Shift dates by a per-subject offset, preserving precision
    #[default]
    DateShift,

    /// Collapse dates to year and bin ages of 90+ (HIPAA Safe Harbor)
    HipaaSafeHarbor,
}

impl ComplianceMode {
    /// Whether this is the Safe Harbor profile
    pub fn is_safe_harbor(self) -> bool {
        matches!(self, Self::HipaaSafeHarbor)
    }

    /// Mode selected by a boolean Safe Harbor flag
    pub fn from_safe_harbor(safe_harbor: bool) -> Self {
        if safe_harbor {
            Self::HipaaSafeHarbor
        } else {
            Self::DateShift
        }
    }
}

impl fmt::Display for ComplianceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DateShift => write!(f, "date_shift"),
            Self::HipaaSafeHarbor => write!(f, "hipaa_safe_harbor"),
        }
    }
}

impl FromStr for ComplianceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "date_shift" | "shift" => Ok(Self::DateShift),
            "hipaa_safe_harbor" | "safe_harbor" | "hipaa" => Ok(Self::HipaaSafeHarbor),
            _ => Err(format!(
                "Invalid compliance mode: {s}. Use 'date_shift' or 'hipaa_safe_harbor'"
            )),
        }
    }
}
