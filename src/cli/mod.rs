//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for fhir-deid using clap.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fhir-deid - FHIR JSON de-identification tool
#[derive(Parser, Debug)]
#[command(name = "fhir-deid")]
#[command(version, about, long_about = None)]
#[command(author = "fhir-deid Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "FHIR_DEID_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "FHIR_DEID_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// De-identify one or more FHIR JSON resources
    Deidentify(commands::deidentify::DeidentifyArgs),

    /// Show the effective PHI policy
    ShowPolicy(commands::policy::ShowPolicyArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
