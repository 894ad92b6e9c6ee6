mod common;

use common::{definition, hasher, personal_data_sd_jwt, typed_credential, typed_descriptor};
use presentation_exchange::{
    config::{EvaluationOptions, SubmissionLocation},
    core::{credential_format::ClaimFormatDesignation, wrapped_credential::WrappedCredential},
    evaluation::Status,
    EvaluationError, Evaluator, JsonPath,
};
use serde_json::json;

fn external() -> Evaluator {
    Evaluator::builder()
        .with_options(EvaluationOptions {
            submission_location: SubmissionLocation::External,
            ..Default::default()
        })
        .build()
}

#[test]
fn selection_is_described_by_the_submission() {
    let definition = definition(json!({
        "id": "employment",
        "submission_requirements": [{ "rule": "all", "from": "A" }],
        "input_descriptors": [
            typed_descriptor("degree", &["A"], "UniversityDegree"),
            typed_descriptor("employee", &["A"], "EmployeeId"),
        ]
    }));
    let held = [
        typed_credential(0, "DriversLicense"),
        typed_credential(1, "EmployeeId"),
        typed_credential(2, "UniversityDegree"),
    ];
    let holder = ["did:example:holder".to_owned()];
    let evaluator = Evaluator::default();

    let selection = evaluator.select(&definition, &held, &holder, &[]).unwrap();
    assert_eq!(selection.status, Status::Info);
    let indices: Vec<usize> = selection
        .selected_credentials
        .iter()
        .map(WrappedCredential::original_index)
        .collect();
    assert_eq!(indices, [1, 2]);

    let submission = evaluator
        .build_submission(&definition, &selection.selected_credentials)
        .unwrap();
    assert_eq!(submission.definition_id(), "employment");

    let paths = submission.descriptor_map_by_id();
    assert_eq!(
        paths["degree"][0].path,
        JsonPath::parse("$.verifiableCredential[1]").unwrap()
    );
    assert_eq!(
        paths["employee"][0].path,
        JsonPath::parse("$.verifiableCredential[0]").unwrap()
    );
    assert_eq!(paths["degree"][0].format, ClaimFormatDesignation::LdpVc);

    let submission = external()
        .build_submission(&definition, &selection.selected_credentials)
        .unwrap();
    let paths = submission.descriptor_map_by_id();
    assert_eq!(paths["degree"][0].path, JsonPath::parse("$[1]").unwrap());
    assert_eq!(paths["employee"][0].path, JsonPath::parse("$[0]").unwrap());
}

#[test]
fn lone_sd_jwt_is_the_whole_external_presentation() {
    let definition = definition(json!({
        "id": "identity",
        "input_descriptors": [{
            "id": "email",
            "constraints": {
                "limit_disclosure": "required",
                "fields": [{ "path": ["$.email"] }]
            }
        }]
    }));
    let credential = WrappedCredential::from_json(
        0,
        ClaimFormatDesignation::VcSdJwt,
        json!(personal_data_sd_jwt()),
        Some(hasher()),
    )
    .unwrap();
    let evaluator = external();

    let selection = evaluator
        .select(&definition, &[credential], &["did:example:holder".to_owned()], &[])
        .unwrap();
    let submission = evaluator
        .build_submission(&definition, &selection.selected_credentials)
        .unwrap();

    let entry = &submission.descriptor_map()[0];
    assert_eq!(entry.id, "email");
    assert_eq!(entry.format, ClaimFormatDesignation::VcSdJwt);
    assert_eq!(entry.path, JsonPath::parse("$").unwrap());
}

#[test]
fn submissions_serialize_as_presentation_exchange_json() {
    let definition = definition(json!({
        "id": "degree",
        "input_descriptors": [typed_descriptor("degree", &[], "UniversityDegree")]
    }));

    let submission = Evaluator::default()
        .build_submission(&definition, &[typed_credential(5, "UniversityDegree")])
        .unwrap();
    let value = serde_json::to_value(&submission).unwrap();

    assert!(value["id"].as_str().is_some_and(|id| uuid::Uuid::parse_str(id).is_ok()));
    assert_eq!(value["definition_id"], json!("degree"));
    assert_eq!(value["descriptor_map"][0]["id"], json!("degree"));
    assert_eq!(value["descriptor_map"][0]["format"], json!("ldp_vc"));
    assert_eq!(
        value["descriptor_map"][0]["path"],
        json!(JsonPath::parse("$.verifiableCredential[0]").unwrap().to_string())
    );
}

#[test]
fn unsatisfied_selections_have_no_submission() {
    let definition = definition(json!({
        "id": "degree",
        "input_descriptors": [typed_descriptor("degree", &[], "UniversityDegree")]
    }));

    let Err(EvaluationError::Unsatisfied(reason)) =
        Evaluator::default().build_submission(&definition, &[typed_credential(0, "EmployeeId")])
    else {
        panic!("expected an unsatisfied definition");
    };
    assert!(reason.contains("degree"));
}
