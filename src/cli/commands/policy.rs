//! Show-policy command implementation
//!
//! Prints the effective PHI policy after all layers (built-in, policy file,
//! inline `[policy]`, `--policy`) have been merged.

use crate::config::load_optional_config;
use crate::deidentify::policy::{PolicyTable, WILDCARD};
use crate::deidentify::HashedSystems;
use clap::Args;
use std::path::{Path, PathBuf};

/// Arguments for the show-policy command
#[derive(Args, Debug, Default)]
pub struct ShowPolicyArgs {
    /// JSON file overriding entries of the built-in PHI policy
    #[arg(long, value_name = "POLICY_JSON")]
    pub policy: Option<PathBuf>,

    /// Only show the fields stripped from this resource type
    #[arg(long, value_name = "TYPE")]
    pub resource_type: Option<String>,

    /// Show the Safe Harbor view (birthDate is kept and binned)
    #[arg(long)]
    pub safe_harbor: bool,

    /// Print the merged table as JSON
    #[arg(long)]
    pub json: bool,
}

impl ShowPolicyArgs {
    /// Execute the show-policy command
    pub fn execute(&self, config_path: Option<&Path>) -> anyhow::Result<i32> {
        tracing::info!("Showing effective policy");

        let config = match load_optional_config(config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Failed to load configuration");
                eprintln!("   Error: {e}");
                return Ok(e.exit_code());
            }
        };

        let policy = match config.build_policy(self.policy.as_deref()) {
            Ok(policy) => policy,
            Err(e) => {
                eprintln!("❌ Failed to build policy");
                eprintln!("   Error: {e}");
                return Ok(e.exit_code());
            }
        };

        let safe_harbor = self.safe_harbor || config.deidentify.mode.is_safe_harbor();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&policy)?);
            return Ok(0);
        }

        print!(
            "{}",
            render_policy(
                &policy,
                &config.hashed_systems(),
                self.resource_type.as_deref(),
                safe_harbor
            )
        );
        Ok(0)
    }
}

/// Human-readable view of the effective policy
pub fn render_policy(
    policy: &PolicyTable,
    hashed_systems: &HashedSystems,
    resource_type: Option<&str>,
    safe_harbor: bool,
) -> String {
    let mut output = String::new();

    let mode = if safe_harbor {
        "hipaa_safe_harbor"
    } else {
        "date_shift"
    };
    output.push_str(&format!("🛡  Effective PHI policy (mode: {mode})\n"));
    output.push_str("───────────────────────────────────────────────────────────────\n");

    match resource_type {
        Some(tag) => {
            let fields = policy.fields_to_strip(Some(tag), safe_harbor);
            let source = if policy.get(tag).is_some() {
                "own entry + wildcard"
            } else {
                "wildcard only"
            };
            output.push_str(&format!("  {tag} ({source})\n"));
            output.push_str(&format!("    {}\n", join_or_none(&fields)));
        }
        None => {
            for (tag, _) in policy.iter().filter(|(tag, _)| *tag != WILDCARD) {
                let fields = policy.fields_to_strip(Some(tag), safe_harbor);
                output.push_str(&format!("  {:22} {}\n", tag, join_or_none(&fields)));
            }
            if let Some(wildcard) = policy.get(WILDCARD) {
                output.push_str(&format!(
                    "  {:22} {}\n",
                    "* (every object)",
                    join_or_none(wildcard)
                ));
            }
        }
    }

    output.push('\n');
    output.push_str("🔑 Identifier systems kept as keyed hashes\n");
    output.push_str("───────────────────────────────────────────────────────────────\n");
    if hashed_systems.is_empty() {
        output.push_str("  (none, every identifier is dropped)\n");
    }
    for system in hashed_systems.iter() {
        output.push_str(&format!("  {system}\n"));
    }

    output
}

fn join_or_none(fields: &[String]) -> String {
    if fields.is_empty() {
        "(nothing)".to_string()
    } else {
        fields.join(", ")
    }
}
