//! HIPAA Safe Harbor compliance tests

use fhir_deid::deidentify::{ComplianceMode, Deidentifier, PolicyTable};
use serde_json::json;
use test_case::test_case;

fn engine(reference_year: i32) -> Deidentifier {
    Deidentifier::builder("safe-harbor-salt")
        .reference_year(reference_year)
        .build()
        .expect("Failed to create engine")
}

#[test_case("1920-04-12", "1900" ; "ninety plus aggregated")]
#[test_case("1935-12-31", "1900" ; "exactly ninety aggregated")]
#[test_case("1936-01-01", "1936" ; "eighty nine kept")]
#[test_case("1985-07", "1985" ; "month precision collapsed")]
#[test_case("2001", "2001" ; "year precision kept")]
fn test_birth_date_binning(birth_date: &str, expected: &str) {
    let patient = json!({"resourceType": "Patient", "id": "p1", "birthDate": birth_date});
    let result = engine(2025).deidentify(&patient, None, true);
    assert_eq!(result.document["birthDate"], expected);
}

#[test]
fn test_all_dates_collapse_to_year() {
    let encounter = json!({
        "resourceType": "Encounter",
        "subject": {"reference": "Patient/p1"},
        "period": {"start": "2024-12-31T23:30:00-05:00", "end": "2025-01-01T01:00:00Z"},
        "extension": [{"url": "urn:x", "valueDate": "2019-03-04"}]
    });

    let result = engine(2025).deidentify(&encounter, None, true);
    let doc = &result.document;

    assert_eq!(doc["period"]["start"], "2024");
    assert_eq!(doc["period"]["end"], "2025");
    assert_eq!(doc["extension"][0]["valueDate"], "2019");
    assert_eq!(result.offset_days, 0);
    assert_eq!(result.mode, ComplianceMode::HipaaSafeHarbor);
    assert_eq!(result.date_handling(), "collapsed");
    assert_eq!(result.stats.dates_collapsed, 3);
    assert_eq!(result.stats.dates_shifted, 0);
}

#[test]
fn test_fixed_offset_ignored_under_safe_harbor() {
    let observation = json!({"resourceType": "Observation", "effectiveDateTime": "2024-06-01"});
    let result = engine(2025).deidentify(&observation, Some(30), true);
    assert_eq!(result.document["effectiveDateTime"], "2024");
    assert_eq!(result.offset_days, 0);
}

#[test]
fn test_birth_date_kept_but_other_phi_stripped() {
    let patient = json!({
        "resourceType": "Patient",
        "id": "p1",
        "name": [{"family": "Old"}],
        "birthDate": "1930-01-01",
        "address": [{"city": "Springfield"}]
    });

    let result = engine(2025).deidentify(&patient, None, true);
    assert_eq!(result.document["birthDate"], "1900");
    assert!(result.document.get("name").is_none());
    assert!(result.document.get("address").is_none());
    assert_eq!(result.stats.ages_binned, 1);
}

#[test]
fn test_policy_carve_out_only_in_safe_harbor() {
    let policy = PolicyTable::builtin();
    let shift = policy.fields_to_strip(Some("Patient"), false);
    let harbor = policy.fields_to_strip(Some("Patient"), true);

    assert!(shift.iter().any(|f| f == "birthDate"));
    assert!(!harbor.iter().any(|f| f == "birthDate"));
    assert_eq!(shift.len(), harbor.len() + 1);
}

#[test]
fn test_birth_date_binned_on_any_resource_type() {
    // RelatedPerson is not in the built-in table: only identifiers are stripped
    let related = json!({
        "resourceType": "RelatedPerson",
        "patient": {"reference": "Patient/p1"},
        "birthDate": "1920-01-01"
    });

    let result = engine(2025).deidentify(&related, None, true);
    assert_eq!(result.document["birthDate"], "1900");
}

#[test]
fn test_reference_year_moves_the_boundary() {
    let patient = json!({"resourceType": "Patient", "id": "p1", "birthDate": "1940-05-05"});
    assert_eq!(engine(2029).deidentify(&patient, None, true).document["birthDate"], "1940");
    assert_eq!(engine(2030).deidentify(&patient, None, true).document["birthDate"], "1900");
}
