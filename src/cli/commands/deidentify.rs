//! Deidentify command implementation
//!
//! This module implements the `deidentify` command: read one or more FHIR
//! JSON documents, de-identify each one and write the results.

use crate::config::schema::MAX_CONFIGURED_SHIFT_DAYS;
use crate::config::{load_optional_config, resolve_salt, DeidConfig};
use crate::deidentify::{AuditLogger, ComplianceMode, DeidReport, Deidentifier};
use crate::domain::{DeidError, Result};
use clap::Args;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Input/output name meaning stdin or stdout
pub const STDIO_MARKER: &str = "-";

/// Suffix appended to the input stem for default output names
const OUTPUT_SUFFIX: &str = "_deid";

/// Arguments for the deidentify command
#[derive(Args, Debug, Default)]
pub struct DeidentifyArgs {
    /// FHIR JSON file(s) to de-identify (`-` reads stdin)
    #[arg(required = true, value_name = "INPUT")]
    pub inputs: Vec<String>,

    /// Output file (`-` for stdout), or output directory for several inputs
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<String>,

    /// Secret salt for hashing and offsets (prefer --salt-file or DEID_SALT)
    #[arg(long, env = "DEID_SALT", hide_env_values = true)]
    pub salt: Option<String>,

    /// File containing the secret salt (takes precedence over --salt)
    #[arg(long, value_name = "FILE")]
    pub salt_file: Option<PathBuf>,

    /// Shift every date by N days instead of the per-subject offset
    #[arg(long, value_name = "DAYS", allow_negative_numbers = true)]
    pub shift_days: Option<i64>,

    /// JSON file overriding entries of the built-in PHI policy
    #[arg(long, value_name = "POLICY_JSON")]
    pub policy: Option<PathBuf>,

    /// HIPAA Safe Harbor: collapse dates to the year, aggregate ages 90+
    #[arg(long)]
    pub safe_harbor: bool,

    /// Pseudonym length in hex characters (1-64)
    #[arg(long, value_name = "N")]
    pub hash_length: Option<usize>,

    /// Print a summary of each document and the run to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Write a JSON run report to PATH
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

/// Where a de-identified document goes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    Stdout,
    File(PathBuf),
}

impl Destination {
    fn label(&self) -> String {
        match self {
            Destination::Stdout => "stdout".to_string(),
            Destination::File(path) => path.display().to_string(),
        }
    }
}

/// Run-wide settings resolved from flags and configuration
struct RunSettings {
    fixed_offset: Option<i64>,
    safe_harbor: bool,
}

impl DeidentifyArgs {
    /// Execute the deidentify command
    pub fn execute(&self, config_path: Option<&Path>) -> anyhow::Result<i32> {
        tracing::info!(inputs = self.inputs.len(), "Starting deidentify command");

        let config = match load_optional_config(config_path) {
            Ok(config) => config,
            Err(e) => return Ok(fail(&e, "Failed to load configuration")),
        };

        let mut report = DeidReport::new(ComplianceMode::DateShift);

        let (engine, settings) = match self.prepare(&config, &mut report) {
            Ok(prepared) => prepared,
            Err(e) => return Ok(fail(&e, "Invalid de-identification settings")),
        };
        report.mode = ComplianceMode::from_safe_harbor(settings.safe_harbor);

        let audit = if config.audit.enabled {
            match AuditLogger::new(
                config.audit.log_path.clone(),
                config.audit.json_format,
                true,
            ) {
                Ok(logger) => logger,
                Err(e) => {
                    let error = DeidError::Output(format!("{e:#}"));
                    return Ok(fail(&error, "Failed to open audit log"));
                }
            }
        } else {
            AuditLogger::disabled()
        };

        let destinations = match plan_destinations(&self.inputs, self.output.as_deref()) {
            Ok(destinations) => destinations,
            Err(e) => return Ok(fail(&e, "Invalid output selection")),
        };

        let mut exit_code = 0;
        for (input, destination) in self.inputs.iter().zip(&destinations) {
            let processed =
                self.process_one(&engine, &settings, &audit, &mut report, input, destination);
            if let Err(e) = processed {
                crate::log_error_with_context!(&e, format!("Processing {}", source_label(input)));
                eprintln!("❌ {}: {}", source_label(input), e);
                if exit_code == 0 {
                    exit_code = e.exit_code();
                }
            }
        }

        if self.verbose {
            eprint!("{}", report.format_console());
        }

        if let Some(path) = &self.report {
            if let Err(e) = report.write_to_file(path) {
                let error = DeidError::Output(format!(
                    "Failed to write report {}: {}",
                    path.display(),
                    e
                ));
                eprintln!("❌ {error}");
                if exit_code == 0 {
                    exit_code = error.exit_code();
                }
            }
        }

        tracing::info!(
            resources = report.total_resources,
            exit_code,
            "Deidentify command finished"
        );
        Ok(exit_code)
    }

    /// Resolve salt, policy and date settings into an engine
    fn prepare(
        &self,
        config: &DeidConfig,
        report: &mut DeidReport,
    ) -> Result<(Deidentifier, RunSettings)> {
        let salt = resolve_salt(
            self.salt_file.as_deref(),
            self.salt.as_deref(),
            &config.deidentify,
        )?;
        if salt.is_weak() {
            crate::log_weak_salt!(salt.source);
            eprintln!(
                "⚠️  Using a weak or default salt. Provide a strong secret via --salt-file, --salt or DEID_SALT."
            );
            report.add_warning("A weak or default salt was used");
        }

        let policy = config.build_policy(self.policy.as_deref())?;

        let safe_harbor = self.safe_harbor || config.deidentify.mode.is_safe_harbor();
        let fixed_offset = self.shift_days.or(config.deidentify.shift_days);
        match fixed_offset {
            Some(_) if safe_harbor => {
                tracing::warn!("Fixed shift ignored in Safe Harbor mode");
                report.add_warning("Fixed shift ignored in Safe Harbor mode");
            }
            Some(days)
                if !(-MAX_CONFIGURED_SHIFT_DAYS..=MAX_CONFIGURED_SHIFT_DAYS).contains(&days) =>
            {
                return Err(DeidError::Validation(format!(
                    "--shift-days must be within ±{MAX_CONFIGURED_SHIFT_DAYS}, got {days}"
                )));
            }
            _ => {}
        }

        let engine = Deidentifier::builder_with_secret(salt.salt)
            .policy(policy)
            .hashed_systems(config.hashed_systems())
            .hash_length(self.hash_length.unwrap_or(config.deidentify.hash_length))
            .build()?;

        tracing::debug!(
            safe_harbor,
            fixed_offset = fixed_offset.is_some(),
            policy_entries = engine.policy().len(),
            hashed_systems = engine.hashed_systems().len(),
            "De-identification engine ready"
        );

        Ok((
            engine,
            RunSettings {
                fixed_offset,
                safe_harbor,
            },
        ))
    }

    fn process_one(
        &self,
        engine: &Deidentifier,
        settings: &RunSettings,
        audit: &AuditLogger,
        report: &mut DeidReport,
        input: &str,
        destination: &Destination,
    ) -> Result<()> {
        let document = read_document(input)?;

        let result = engine.deidentify(&document, settings.fixed_offset, settings.safe_harbor);
        write_document(destination, &result.document)?;

        let source = source_label(input);
        audit
            .log_deidentification(&result, &source)
            .map_err(|e| DeidError::Output(format!("Failed to write audit entry: {e:#}")))?;

        if self.verbose {
            let removed = engine
                .policy()
                .removed_fields(result.resource_type.as_deref());
            eprintln!("[INFO] De-identified {} → {}", source, destination.label());
            eprintln!("[INFO] Policy removed fields: {:?}", removed);
        }

        report.add_resource(&result);
        Ok(())
    }
}

/// Print a command failure and map it to its exit code
fn fail(error: &DeidError, context: &str) -> i32 {
    crate::log_error_with_context!(error, context);
    eprintln!("❌ {context}");
    eprintln!("   Error: {error}");
    error.exit_code()
}

/// Display name of an input for messages and the audit trail
pub fn source_label(input: &str) -> String {
    if input == STDIO_MARKER {
        return "stdin".to_string();
    }
    Path::new(input)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.to_string())
}

/// Default output path: `<stem>_deid.<ext>` next to the input
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_file_name(output_file_name(input))
}

fn output_file_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stdin".to_string());
    let extension = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "json".to_string());
    format!("{stem}{OUTPUT_SUFFIX}.{extension}")
}

/// Decide where each input's output goes
///
/// One input: `-o -` is stdout, `-o PATH` is that file, no `-o` is stdout
/// for stdin and `<stem>_deid.json` otherwise. Several inputs: `-o` names
/// a directory (created if missing), otherwise outputs sit next to their
/// inputs; stdout and stdin cannot be shared between documents.
pub fn plan_destinations(inputs: &[String], output: Option<&str>) -> Result<Vec<Destination>> {
    if inputs.len() == 1 {
        let input = inputs[0].as_str();
        let destination = match output {
            Some(STDIO_MARKER) => Destination::Stdout,
            Some(path) => Destination::File(PathBuf::from(path)),
            None if input == STDIO_MARKER => Destination::Stdout,
            None => Destination::File(default_output_path(Path::new(input))),
        };
        return Ok(vec![destination]);
    }

    if inputs.iter().any(|input| input == STDIO_MARKER) {
        return Err(DeidError::Validation(
            "stdin can only be used with a single input".to_string(),
        ));
    }

    let destinations: Vec<Destination> = match output {
        Some(STDIO_MARKER) => {
            return Err(DeidError::Validation(
                "several documents cannot be written to stdout; use -o <directory>".to_string(),
            ))
        }
        Some(dir) => {
            let dir = PathBuf::from(dir);
            inputs
                .iter()
                .map(|input| Destination::File(dir.join(output_file_name(Path::new(input)))))
                .collect()
        }
        None => inputs
            .iter()
            .map(|input| Destination::File(default_output_path(Path::new(input))))
            .collect(),
    };

    reject_shared_destinations(inputs, &destinations)?;

    if let Some(dir) = output {
        std::fs::create_dir_all(dir).map_err(|e| {
            DeidError::Output(format!("Failed to create output directory {dir}: {e}"))
        })?;
    }

    Ok(destinations)
}

/// Fail when two inputs would be written to the same file
fn reject_shared_destinations(inputs: &[String], destinations: &[Destination]) -> Result<()> {
    let mut seen: HashMap<&Destination, &str> = HashMap::new();
    for (input, destination) in inputs.iter().zip(destinations) {
        if let Some(first) = seen.insert(destination, input.as_str()) {
            return Err(DeidError::Validation(format!(
                "{first} and {input} would both be written to {}",
                destination.label()
            )));
        }
    }
    Ok(())
}

/// Read and parse one JSON document (`-` reads stdin)
pub fn read_document(input: &str) -> Result<Value> {
    if input == STDIO_MARKER {
        let mut content = String::new();
        io::stdin()
            .lock()
            .read_to_string(&mut content)
            .map_err(|e| DeidError::Input(format!("Cannot read stdin: {e}")))?;
        return serde_json::from_str(&content)
            .map_err(|e| DeidError::Input(format!("Cannot read stdin: {e}")));
    }

    let file =
        File::open(input).map_err(|e| DeidError::Input(format!("Cannot read {input}: {e}")))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| DeidError::Input(format!("Cannot read {input}: {e}")))
}

/// Serialize a document as two-space-indented JSON with a trailing newline
pub fn render_document(document: &Value) -> Result<Vec<u8>> {
    let mut buffer = serde_json::to_vec_pretty(document)?;
    buffer.push(b'\n');
    Ok(buffer)
}

/// Write one document to its destination
pub fn write_document(destination: &Destination, document: &Value) -> Result<()> {
    let rendered = render_document(document)?;
    let label = destination.label();
    let to_output_error = |e: io::Error| DeidError::Output(format!("Cannot write {label}: {e}"));

    match destination {
        Destination::Stdout => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(&rendered).map_err(to_output_error)?;
            handle.flush().map_err(to_output_error)
        }
        Destination::File(path) => {
            let file = File::create(path).map_err(to_output_error)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(&rendered).map_err(to_output_error)?;
            writer.flush().map_err(to_output_error)
        }
    }
}
