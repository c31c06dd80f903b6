//! Audit logging module
//!
//! Provides an append-only record of every de-identified resource.

pub mod logger;

pub use logger::AuditLogger;
