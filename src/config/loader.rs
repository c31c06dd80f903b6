//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::DeidConfig;
use super::secret::secret_string;
use crate::domain::errors::DeidError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Prefix for environment overrides (`FHIR_DEID_<SECTION>_<KEY>`)
pub const ENV_PREFIX: &str = "FHIR_DEID";

static ENV_PLACEHOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("Invalid env placeholder regex")
});

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into DeidConfig
/// 4. Applies environment variable overrides (FHIR_DEID_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`DeidError::Configuration`] if the file is missing or unreadable,
/// a referenced variable is unset, the TOML is malformed, an override
/// doesn't parse or validation fails.
///
/// # Examples
///
/// ```no_run
/// use fhir_deid::config::loader::load_config;
///
/// let config = load_config("fhir-deid.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<DeidConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(DeidError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        DeidError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    load_config_from_str(&contents)
}

/// Parse, override and validate configuration text
pub fn load_config_from_str(contents: &str) -> Result<DeidConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: DeidConfig = toml::from_str(&contents)?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        DeidError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Load `path` when given, otherwise validated defaults with env overrides
pub fn load_optional_config(path: Option<&Path>) -> Result<DeidConfig> {
    match path {
        Some(path) => load_config(path),
        None => load_config_from_str(""),
    }
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are passed through untouched.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let processed = ENV_PLACEHOLDER_REGEX.replace_all(line, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        });
        result.push_str(&processed);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(DeidError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn env_override(section: &str, key: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}_{section}_{key}")).ok()
}

fn parse_override<T: std::str::FromStr>(section: &str, key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        DeidError::Configuration(format!(
            "Invalid value '{value}' for {ENV_PREFIX}_{section}_{key}"
        ))
    })
}

/// Applies environment variable overrides using the FHIR_DEID_* prefix
///
/// Environment variables follow the pattern: FHIR_DEID_<SECTION>_<KEY>
/// For example: FHIR_DEID_DEIDENTIFY_MODE, FHIR_DEID_AUDIT_ENABLED
fn apply_env_overrides(config: &mut DeidConfig) -> Result<()> {
    // Application overrides
    if let Some(val) = env_override("APPLICATION", "LOG_LEVEL") {
        config.application.log_level = val;
    }

    // De-identification overrides
    if let Some(val) = env_override("DEIDENTIFY", "MODE") {
        config.deidentify.mode = val
            .parse()
            .map_err(|e: String| DeidError::Configuration(e))?;
    }
    if let Some(val) = env_override("DEIDENTIFY", "SHIFT_DAYS") {
        config.deidentify.shift_days = Some(parse_override("DEIDENTIFY", "SHIFT_DAYS", &val)?);
    }
    if let Some(val) = env_override("DEIDENTIFY", "HASH_LENGTH") {
        config.deidentify.hash_length = parse_override("DEIDENTIFY", "HASH_LENGTH", &val)?;
    }
    if let Some(val) = env_override("DEIDENTIFY", "SALT") {
        config.deidentify.salt = Some(secret_string(val));
    }
    if let Some(val) = env_override("DEIDENTIFY", "SALT_FILE") {
        config.deidentify.salt_file = Some(PathBuf::from(val));
    }
    if let Some(val) = env_override("DEIDENTIFY", "POLICY_FILE") {
        config.deidentify.policy_file = Some(PathBuf::from(val));
    }
    if let Some(val) = env_override("DEIDENTIFY", "HASHED_IDENTIFIER_SYSTEMS") {
        config.deidentify.hashed_identifier_systems = val
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    // Logging overrides
    if let Some(val) = env_override("LOGGING", "LOCAL_ENABLED") {
        config.logging.local_enabled = parse_override("LOGGING", "LOCAL_ENABLED", &val)?;
    }
    if let Some(val) = env_override("LOGGING", "LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Some(val) = env_override("LOGGING", "LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    // Audit overrides
    if let Some(val) = env_override("AUDIT", "ENABLED") {
        config.audit.enabled = parse_override("AUDIT", "ENABLED", &val)?;
    }
    if let Some(val) = env_override("AUDIT", "LOG_PATH") {
        config.audit.log_path = PathBuf::from(val);
    }
    if let Some(val) = env_override("AUDIT", "JSON_FORMAT") {
        config.audit.json_format = parse_override("AUDIT", "JSON_FORMAT", &val)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deidentify::ComplianceMode;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_substitute_env_vars() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::set_var("FHIR_DEID_TEST_SUBST", "test_value");
        let result = substitute_env_vars("salt = \"${FHIR_DEID_TEST_SUBST}\"").unwrap();
        assert_eq!(result, "salt = \"test_value\"\n");
        std::env::remove_var("FHIR_DEID_TEST_SUBST");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::remove_var("FHIR_DEID_TEST_MISSING");
        let result = substitute_env_vars("salt = \"${FHIR_DEID_TEST_MISSING}\"");
        assert!(matches!(result, Err(DeidError::Configuration(msg)) if msg.contains("FHIR_DEID_TEST_MISSING")));
    }

    #[test]
    fn test_substitute_skips_comments() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::remove_var("FHIR_DEID_TEST_COMMENTED");
        let input = "# salt = \"${FHIR_DEID_TEST_COMMENTED}\"\nhash_length = 16";
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains("${FHIR_DEID_TEST_COMMENTED}"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(matches!(result, Err(DeidError::Configuration(_))));
    }

    #[test]
    fn test_load_config_valid() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let toml_content = r#"
[application]
log_level = "info"

[deidentify]
mode = "date_shift"
shift_days = 14
hash_length = 24

[audit]
enabled = true
log_path = "audit/run.log"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.application.log_level, "info");
        assert_eq!(config.deidentify.shift_days, Some(14));
        assert_eq!(config.deidentify.hash_length, 24);
        assert!(config.audit.enabled);
        assert_eq!(config.audit.log_path, PathBuf::from("audit/run.log"));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let result = load_config_from_str("[deidentify\nmode = ");
        assert!(matches!(result, Err(DeidError::Configuration(_))));
    }

    #[test]
    fn test_validation_failure_is_config_error() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let result = load_config_from_str("[deidentify]\nhash_length = 0\n");
        assert!(matches!(result, Err(DeidError::Configuration(msg)) if msg.contains("hash_length")));
    }

    #[test]
    fn test_env_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::set_var("FHIR_DEID_DEIDENTIFY_MODE", "safe_harbor");
        std::env::set_var("FHIR_DEID_DEIDENTIFY_HASH_LENGTH", "32");
        std::env::set_var("FHIR_DEID_AUDIT_ENABLED", "true");

        let config = load_optional_config(None);

        std::env::remove_var("FHIR_DEID_DEIDENTIFY_MODE");
        std::env::remove_var("FHIR_DEID_DEIDENTIFY_HASH_LENGTH");
        std::env::remove_var("FHIR_DEID_AUDIT_ENABLED");

        let config = config.unwrap();
        assert_eq!(config.deidentify.mode, ComplianceMode::HipaaSafeHarbor);
        assert_eq!(config.deidentify.hash_length, 32);
        assert!(config.audit.enabled);
    }

    #[test]
    fn test_invalid_env_override() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::set_var("FHIR_DEID_DEIDENTIFY_SHIFT_DAYS", "a week");
        let result = load_optional_config(None);
        std::env::remove_var("FHIR_DEID_DEIDENTIFY_SHIFT_DAYS");

        assert!(matches!(result, Err(DeidError::Configuration(msg)) if msg.contains("SHIFT_DAYS")));
    }
}
