//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the fhir-deid configuration file.

use crate::config::{load_config, resolve_salt, DEFAULT_SALT_PLACEHOLDER};
use clap::Args;
use std::path::Path;

/// Arguments for the validate-config command
#[derive(Args, Debug, Default)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    ///
    /// Loading runs env substitution, overrides and validation; on top of
    /// that the salt source and every referenced policy file are checked.
    pub fn execute(&self, config_path: Option<&Path>) -> anyhow::Result<i32> {
        let Some(config_path) = config_path else {
            println!("❌ No configuration file given");
            println!("   Use --config <PATH> or set FHIR_DEID_CONFIG");
            return Ok(2);
        };

        tracing::info!(config_path = %config_path.display(), "Validating configuration");

        println!("🔍 Validating configuration file: {}", config_path.display());
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(e.exit_code());
            }
        };

        let policy = match config.build_policy(None) {
            Ok(policy) => policy,
            Err(e) => {
                println!("❌ Policy could not be built");
                println!("   Error: {e}");
                return Ok(e.exit_code());
            }
        };

        let salt = match resolve_salt(None, None, &config.deidentify) {
            Ok(salt) => salt,
            Err(e) => {
                println!("❌ Salt could not be read");
                println!("   Error: {e}");
                return Ok(e.exit_code());
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Mode: {}", config.deidentify.mode);
        match config.deidentify.shift_days {
            Some(days) => println!("  Date Offset: fixed ({days} days)"),
            None => println!("  Date Offset: per subject"),
        }
        println!("  Hash Length: {}", config.deidentify.hash_length);
        println!("  Salt Source: {}", salt.source);
        println!("  Policy Entries: {}", policy.len());
        println!(
            "  Hashed Identifier Systems: {}",
            config.deidentify.hashed_identifier_systems.join(", ")
        );
        println!(
            "  File Logging: {}",
            if config.logging.local_enabled {
                config.logging.local_path.as_str()
            } else {
                "disabled"
            }
        );
        if config.audit.enabled {
            println!("  Audit Log: {}", config.audit.log_path.display());
        } else {
            println!("  Audit Log: disabled");
        }

        if salt.is_weak() {
            println!();
            println!("⚠️  No strong salt configured (falls back to \"{DEFAULT_SALT_PLACEHOLDER}\").");
            println!("   Pass --salt-file or DEID_SALT when running deidentify.");
        }
        println!();

        Ok(0)
    }
}
