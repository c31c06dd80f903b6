//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Default name of the generated configuration file
pub const DEFAULT_CONFIG_FILE: &str = "fhir-deid.toml";

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing fhir-deid configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        match fs::write(&self.output, Self::generate_config()) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Store a strong secret salt outside the repository:");
                println!("     - export DEID_SALT=... (or put it in .env)");
                println!("     - or point deidentify.salt_file at a secrets mount");
                println!(
                    "  3. Validate configuration: fhir-deid --config {} validate-config",
                    self.output
                );
                println!(
                    "  4. Review the policy: fhir-deid --config {} show-policy",
                    self.output
                );
                println!(
                    "  5. Run: fhir-deid --config {} deidentify patient.json",
                    self.output
                );
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {}", e);
                Ok(4)
            }
        }
    }

    /// Generate the sample configuration
    pub fn generate_config() -> String {
        r#"# fhir-deid configuration file
# Every setting is optional; command-line flags take precedence.

[application]
log_level = "warn"  # trace | debug | info | warn | error

[deidentify]
# date_shift: dates move by a per-subject offset in [-90, 90] days
# hipaa_safe_harbor: dates collapse to the year, birth years of 90+ become "1900"
mode = "date_shift"

# Fixed offset for every resource instead of the per-subject one
# shift_days = 14

# Pseudonym length in hex characters (1-64)
hash_length = 16

# Secret salt. Never commit it; prefer the environment or a secrets file.
# salt = "${DEID_SALT}"
# salt_file = "/run/secrets/deid_salt"

# Identifier systems kept as keyed hashes; every other identifier is dropped
hashed_identifier_systems = [
    "http://hospital.example.org/mrn",
    "urn:system:mrn",
]

# JSON file with {"ResourceType": ["field", ...]} entries replacing built-ins
# policy_file = "policy.json"

[policy]
# Inline overrides, applied after policy_file
# Patient = ["identifier", "name", "telecom", "address", "photo", "birthDate"]

[logging]
local_enabled = false
local_path = "./logs"
local_rotation = "daily"  # daily | hourly | never

[audit]
enabled = false
log_path = "./audit/deidentify.log"
json_format = true
"#
        .to_string()
    }
}
