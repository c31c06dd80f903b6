// fhir-deid - FHIR JSON de-identification tool
// Copyright (c) 2025 fhir-deid Contributors
// Licensed under the MIT License

use clap::Parser;
use fhir_deid::cli::{Cli, Commands};
use fhir_deid::config::{load_optional_config, DeidConfig};
use fhir_deid::logging::init_logging;
use std::process;

fn main() {
    // Load environment variables from .env file if present
    // This is optional - if .env doesn't exist, it's silently ignored
    let _ = dotenvy::dotenv();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Logging settings come from the config when it loads; commands report
    // config errors themselves, so a broken file falls back to defaults here
    let config = load_optional_config(cli.config.as_deref())
        .unwrap_or_else(|_| DeidConfig::default());
    let log_level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.application.log_level.clone());

    let guard = match init_logging(&log_level, &config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(5);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "fhir-deid - FHIR JSON de-identification tool"
    );

    // Execute command and get exit code
    let exit_code = match execute_command(&cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e}");
            5 // Fatal error exit code
        }
    };

    // Flush file logs before exiting
    drop(guard);
    process::exit(exit_code);
}

/// Execute the CLI command
fn execute_command(cli: &Cli) -> anyhow::Result<i32> {
    let config_path = cli.config.as_deref();
    match &cli.command {
        Commands::Deidentify(args) => args.execute(config_path),
        Commands::ShowPolicy(args) => args.execute(config_path),
        Commands::ValidateConfig(args) => args.execute(config_path),
        Commands::Init(args) => args.execute(),
    }
}
