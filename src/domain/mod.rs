//! Domain types shared across fhir-deid.
//!
//! All fallible operations outside the rewriting core return
//! [`Result<T, DeidError>`]:
//!
//! ```rust
//! use fhir_deid::domain::{DeidError, Result};
//!
//! fn example() -> Result<()> {
//!     let _table = fhir_deid::deidentify::PolicyTable::from_json_str(r#"{"Patient": ["name"]}"#)?;
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod result;

pub use errors::DeidError;
pub use result::Result;
