//! End-to-end tests for the deidentify command on real files

use fhir_deid::cli::commands::deidentify::DeidentifyArgs;
use fhir_deid::cli::commands::init::InitArgs;
use fhir_deid::cli::commands::validate::ValidateArgs;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

const SALT: &str = "cli-test-salt";

fn write_json(dir: &TempDir, name: &str, value: &Value) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
    path
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn patient() -> Value {
    json!({
        "resourceType": "Patient",
        "id": "p-100",
        "identifier": [{"system": "urn:system:mrn", "value": "MRN-100"}],
        "name": [{"family": "Roe"}],
        "birthDate": "1931-02-03",
        "deceasedDateTime": "2024-01-01T00:00:00Z"
    })
}

fn args(inputs: Vec<String>) -> DeidentifyArgs {
    DeidentifyArgs {
        inputs,
        salt: Some(SALT.to_string()),
        ..Default::default()
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[test]
fn test_default_output_next_to_input() {
    let dir = tempdir().unwrap();
    let input = write_json(&dir, "patient.json", &patient());

    let code = DeidentifyArgs {
        shift_days: Some(10),
        ..args(vec![path_arg(&input)])
    }
    .execute(None)
    .unwrap();
    assert_eq!(code, 0);

    let output_path = dir.path().join("patient_deid.json");
    let raw = fs::read_to_string(&output_path).unwrap();
    assert!(raw.ends_with("}\n"));
    assert!(raw.contains("\n  \"resourceType\""));

    let output = read_json(&output_path);
    assert!(output.get("name").is_none());
    assert!(output.get("birthDate").is_none());
    assert_eq!(output["deceasedDateTime"], "2024-01-11T00:00:00Z");
    assert_ne!(output["identifier"][0]["value"], "MRN-100");

    // Input untouched
    assert_eq!(read_json(&input), patient());
}

#[test]
fn test_explicit_output_and_safe_harbor() {
    let dir = tempdir().unwrap();
    let input = write_json(&dir, "patient.json", &patient());
    let output = dir.path().join("out.json");

    let code = DeidentifyArgs {
        output: Some(path_arg(&output)),
        safe_harbor: true,
        ..args(vec![path_arg(&input)])
    }
    .execute(None)
    .unwrap();
    assert_eq!(code, 0);

    let document = read_json(&output);
    assert_eq!(document["birthDate"], "1900");
    assert_eq!(document["deceasedDateTime"], "2024");
}

#[test]
fn test_runs_are_reproducible_with_same_salt() {
    let dir = tempdir().unwrap();
    let input = write_json(&dir, "patient.json", &patient());
    let first = dir.path().join("first.json");
    let second = dir.path().join("second.json");

    for output in [&first, &second] {
        let code = DeidentifyArgs {
            output: Some(path_arg(output)),
            ..args(vec![path_arg(&input)])
        }
        .execute(None)
        .unwrap();
        assert_eq!(code, 0);
    }

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn test_missing_input_continues_with_others() {
    let dir = tempdir().unwrap();
    let good = write_json(&dir, "good.json", &patient());
    let missing = dir.path().join("missing.json");
    let out_dir = dir.path().join("out");

    let code = DeidentifyArgs {
        output: Some(path_arg(&out_dir)),
        ..args(vec![path_arg(&missing), path_arg(&good)])
    }
    .execute(None)
    .unwrap();

    assert_eq!(code, 3);
    assert!(out_dir.join("good_deid.json").exists());
    assert!(!out_dir.join("missing_deid.json").exists());
}

#[test]
fn test_invalid_json_is_input_error() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("broken.json");
    fs::write(&input, "{ not json").unwrap();

    let code = args(vec![path_arg(&input)]).execute(None).unwrap();
    assert_eq!(code, 3);
}

#[test]
fn test_unwritable_output_is_output_error() {
    let dir = tempdir().unwrap();
    let input = write_json(&dir, "patient.json", &patient());
    let output = dir.path().join("no-such-dir").join("out.json");

    let code = DeidentifyArgs {
        output: Some(path_arg(&output)),
        ..args(vec![path_arg(&input)])
    }
    .execute(None)
    .unwrap();
    assert_eq!(code, 4);
}

#[test]
fn test_settings_errors_are_config_errors() {
    let dir = tempdir().unwrap();
    let input = write_json(&dir, "patient.json", &patient());

    let bad_policy = DeidentifyArgs {
        policy: Some(dir.path().join("missing-policy.json")),
        ..args(vec![path_arg(&input)])
    };
    assert_eq!(bad_policy.execute(None).unwrap(), 2);

    let bad_hash = DeidentifyArgs {
        hash_length: Some(0),
        ..args(vec![path_arg(&input)])
    };
    assert_eq!(bad_hash.execute(None).unwrap(), 2);

    let bad_shift = DeidentifyArgs {
        shift_days: Some(1_000_000),
        ..args(vec![path_arg(&input)])
    };
    assert_eq!(bad_shift.execute(None).unwrap(), 2);

    // Nothing was written
    assert!(!dir.path().join("patient_deid.json").exists());
}

#[test]
fn test_out_of_range_shift_ignored_under_safe_harbor() {
    let dir = tempdir().unwrap();
    let input = write_json(&dir, "patient.json", &patient());
    let output = dir.path().join("out.json");

    let code = DeidentifyArgs {
        output: Some(path_arg(&output)),
        safe_harbor: true,
        shift_days: Some(99_999),
        ..args(vec![path_arg(&input)])
    }
    .execute(None)
    .unwrap();
    assert_eq!(code, 0);
    assert_eq!(read_json(&output)["deceasedDateTime"], "2024");
}

#[test]
fn test_inputs_sharing_a_file_name_are_rejected() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("a")).unwrap();
    fs::create_dir_all(dir.path().join("b")).unwrap();
    let first = write_json(&dir, "a/patient.json", &patient());
    let second = write_json(&dir, "b/patient.json", &patient());
    let out_dir = dir.path().join("out");

    let code = DeidentifyArgs {
        output: Some(path_arg(&out_dir)),
        ..args(vec![path_arg(&first), path_arg(&second)])
    }
    .execute(None)
    .unwrap();

    assert_eq!(code, 2);
    assert!(!out_dir.join("patient_deid.json").exists());
}

#[test]
fn test_policy_override_file() {
    let dir = tempdir().unwrap();
    let input = write_json(&dir, "patient.json", &patient());
    let policy = write_json(&dir, "policy.json", &json!({"Patient": ["name"]}));
    let output = dir.path().join("out.json");

    let code = DeidentifyArgs {
        policy: Some(policy),
        output: Some(path_arg(&output)),
        shift_days: Some(0),
        ..args(vec![path_arg(&input)])
    }
    .execute(None)
    .unwrap();
    assert_eq!(code, 0);

    let document = read_json(&output);
    assert!(document.get("name").is_none());
    assert_eq!(document["birthDate"], "1931-02-03");
    // The wildcard still pseudonymizes identifiers
    assert_ne!(document["identifier"][0]["value"], "MRN-100");
}

#[test]
fn test_report_and_audit_written_without_phi() {
    let dir = tempdir().unwrap();
    let input = write_json(&dir, "patient.json", &patient());
    let report = dir.path().join("report.json");
    let audit_log = dir.path().join("audit").join("deid.log");

    let config_path = dir.path().join("fhir-deid.toml");
    fs::write(
        &config_path,
        format!(
            "[audit]\nenabled = true\nlog_path = \"{}\"\n",
            audit_log.display()
        ),
    )
    .unwrap();

    let code = DeidentifyArgs {
        report: Some(report.clone()),
        ..args(vec![path_arg(&input)])
    }
    .execute(Some(&config_path))
    .unwrap();
    assert_eq!(code, 0);

    let report_json = read_json(&report);
    assert_eq!(report_json["total_resources"], 1);
    assert_eq!(report_json["resources_by_type"]["Patient"], 1);

    let audit = fs::read_to_string(&audit_log).unwrap();
    assert_eq!(audit.lines().count(), 1);
    let entry: Value = serde_json::from_str(audit.lines().next().unwrap()).unwrap();
    assert_eq!(entry["resource_type"], "Patient");
    assert_eq!(entry["source"], "patient.json");

    for text in [&audit, &fs::read_to_string(&report).unwrap()] {
        for phi in ["MRN-100", "Roe", "p-100", "1931-02-03", SALT] {
            assert!(!text.contains(phi), "{phi} leaked");
        }
    }
}

#[test]
fn test_init_then_validate() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("fhir-deid.toml");

    let init = InitArgs {
        output: path_arg(&config_path),
        force: false,
    };
    assert_eq!(init.execute().unwrap(), 0);
    assert_eq!(ValidateArgs {}.execute(Some(&config_path)).unwrap(), 0);
}
