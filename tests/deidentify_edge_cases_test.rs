//! Edge case tests for the de-identification engine

use fake::faker::lorem::en::Sentence;
use fake::Fake;
use fhir_deid::deidentify::{shift_date, Deidentifier, HashedSystems};
use serde_json::{json, Value};
use test_case::test_case;

fn engine() -> Deidentifier {
    Deidentifier::builder("edge-salt")
        .reference_year(2025)
        .build()
        .expect("Failed to create engine")
}

#[test]
fn test_empty_document() {
    let result = engine().deidentify(&json!({}), None, false);
    assert_eq!(result.document, json!({}));
    assert!(result.resource_type.is_none());
    assert!(result.subject_pseudonym.is_none());
    assert!(result.stats.is_untouched());
}

#[test_case(json!(null) ; "null")]
#[test_case(json!(42) ; "number")]
#[test_case(json!("2024-01-01") ; "bare date string")]
#[test_case(json!(["2024-01-01", {"x": 1}]) ; "array")]
fn test_non_object_roots_pass_through(root: Value) {
    let result = engine().deidentify(&root, Some(10), false);
    assert_eq!(result.document, root);
}

#[test]
fn test_strings_inside_arrays_are_not_dates() {
    let observation = json!({
        "resourceType": "Observation",
        "note": ["2024-01-01", "2024-01-01T10:00:00Z"],
        "effectiveDateTime": "2024-01-01"
    });

    let result = engine().deidentify(&observation, Some(5), false);
    assert_eq!(result.document["note"], json!(["2024-01-01", "2024-01-01T10:00:00Z"]));
    assert_eq!(result.document["effectiveDateTime"], "2024-01-06");
}

#[test_case("2024-02-28", 1, "2024-02-29" ; "into leap day")]
#[test_case("2023-12-31T23:59:59Z", 1, "2024-01-01T23:59:59Z" ; "across year")]
#[test_case("2024-01-05", -10, "2023-12-26" ; "negative offset")]
#[test_case("2024-03-10T08:15:30.123+05:30", 2, "2024-03-12T08:15:30.123+05:30" ; "fraction and offset kept")]
#[test_case("2024-07", 40, "2024-08" ; "month precision")]
#[test_case("9999-12-31", 10, "9999-12-31" ; "out of range unchanged")]
fn test_shift_shapes(input: &str, offset: i64, expected: &str) {
    let resource = json!({"resourceType": "Condition", "recordedDate": input});
    let result = engine().deidentify(&resource, Some(offset), false);
    assert_eq!(result.document["recordedDate"], expected);
    assert_eq!(shift_date(input, offset, false), expected);
}

#[test_case("2024-13-01" ; "invalid month")]
#[test_case("2023-02-29" ; "invalid leap day")]
#[test_case("yesterday" ; "free text")]
#[test_case("" ; "empty")]
fn test_unparseable_dates_left_unchanged(value: &str) {
    let resource = json!({"resourceType": "Condition", "onsetDateTime": value});
    let result = engine().deidentify(&resource, Some(10), false);
    assert_eq!(result.document["onsetDateTime"], value);
}

#[test]
fn test_free_text_is_untouched() {
    for _ in 0..20 {
        let text: String = Sentence(3..12).fake();
        let resource = json!({"resourceType": "Observation", "valueString": text});
        let result = engine().deidentify(&resource, Some(30), false);
        assert_eq!(result.document["valueString"], text.as_str());
    }
}

#[test]
fn test_unicode_content_preserved() {
    let resource = json!({
        "resourceType": "Observation",
        "code": {"text": "Blutdruck – 血圧 – ضغط الدم"},
        "issued": "2024-01-01T00:00:00Z"
    });
    let result = engine().deidentify(&resource, Some(1), false);
    assert_eq!(result.document["code"]["text"], "Blutdruck – 血圧 – ضغط الدم");
    assert_eq!(result.document["issued"], "2024-01-02T00:00:00Z");
}

#[test]
fn test_deeply_nested_document() {
    let mut node = json!({"identifier": [{"system": "urn:x", "value": "deep"}], "start": "2024-01-01"});
    for _ in 0..64 {
        node = json!({"child": node});
    }
    let document = json!({"resourceType": "Basic", "nested": node});

    let result = engine().deidentify(&document, Some(1), false);
    let rendered = serde_json::to_string(&result.document).unwrap();
    assert!(!rendered.contains("deep"));
    assert!(rendered.contains("2024-01-02"));
}

#[test]
fn test_identifier_edge_cases() {
    let engine = Deidentifier::builder("edge-salt")
        .hashed_systems(HashedSystems::new(["urn:mrn"]))
        .build()
        .unwrap();

    let patient = json!({
        "resourceType": "Patient",
        "id": "p1",
        "identifier": [
            {"system": "urn:mrn", "value": 12345},
            {"system": "urn:mrn"},
            {"system": "urn:mrn", "value": null},
            "urn:mrn",
            {"system": "urn:other", "value": "x"}
        ]
    });

    let result = engine.deidentify(&patient, None, false);
    let kept = result.document["identifier"].as_array().unwrap();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0]["system"], "urn:mrn");
    assert_eq!(kept[0]["value"].as_str().unwrap().len(), 16);
    assert_eq!(result.stats.identifiers_dropped, 4);
}

#[test_case(1 ; "shortest")]
#[test_case(32 ; "half")]
#[test_case(64 ; "full digest")]
fn test_hash_length(length: usize) {
    let engine = Deidentifier::builder("edge-salt")
        .hash_length(length)
        .build()
        .unwrap();
    let patient = json!({
        "resourceType": "Patient",
        "id": "p1",
        "identifier": [{"system": "urn:system:mrn", "value": "A"}]
    });

    let result = engine.deidentify(&patient, None, false);
    let value = result.document["identifier"][0]["value"].as_str().unwrap();
    assert_eq!(value.len(), length);
    assert!(value.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(result.subject_pseudonym.unwrap().len(), length);
}

#[test]
fn test_falsy_subject_falls_back_to_patient() {
    let claim = json!({
        "resourceType": "Claim",
        "subject": {},
        "patient": {"reference": "Patient/p9"}
    });
    let with_patient = engine().deidentify(&claim, None, false);
    let direct = engine().deidentify(
        &json!({"resourceType": "Claim", "patient": "Patient/p9"}),
        None,
        false,
    );
    assert_eq!(with_patient.offset_days, direct.offset_days);
    assert_eq!(with_patient.subject_pseudonym, direct.subject_pseudonym);
}

#[test]
fn test_different_salts_give_different_pseudonyms() {
    let patient = json!({
        "resourceType": "Patient",
        "id": "p1",
        "identifier": [{"system": "urn:system:mrn", "value": "A"}]
    });
    let a = Deidentifier::builder("salt-a").build().unwrap().deidentify(&patient, None, false);
    let b = Deidentifier::builder("salt-b").build().unwrap().deidentify(&patient, None, false);
    assert_ne!(a.document["identifier"], b.document["identifier"]);
}
