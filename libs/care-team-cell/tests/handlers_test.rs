use std::sync::Arc;

use axum::extract::{Extension, Path, State};
use axum::Json;
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use care_team_cell::handlers;
use care_team_cell::models::{ConnectDoctorRequest, UpdatePatientProfileRequest};
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, MockStoreRows, TestConfig, TestUser};

fn state_for(server: &MockServer) -> Arc<AppConfig> {
    TestConfig::with_store_url(&server.uri()).to_arc()
}

fn auth_for(user: &TestUser) -> TypedHeader<Authorization<Bearer>> {
    let token = JwtTestUtils::create_test_token(
        user,
        "test-secret-key-for-jwt-validation-must-be-long-enough",
        Some(1),
    );
    TypedHeader(Authorization::bearer(&token).unwrap())
}

fn extension_for(user: &TestUser) -> Extension<User> {
    Extension(user.to_user())
}

#[tokio::test]
async fn patient_profile_missing_row_is_not_found() {
    let server = MockServer::start().await;
    let patient = TestUser::patient("pat@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let result = handlers::get_patient_profile(
        State(state_for(&server)),
        auth_for(&patient),
        extension_for(&patient),
    )
    .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn patient_profile_update_nulls_absent_fields() {
    let server = MockServer::start().await;
    let patient = TestUser::patient("pat@example.com");

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/patients"))
        .and(wiremock::matchers::body_partial_json(json!({
            "mrn": "MRN-9",
            "blood_type": null,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "mrn": "MRN-9", "blood_type": null, "height_cm": null, "weight_kg": 70.0 }
        ])))
        .mount(&server)
        .await;

    let Json(body) = handlers::update_patient_profile(
        State(state_for(&server)),
        auth_for(&patient),
        extension_for(&patient),
        Json(UpdatePatientProfileRequest {
            mrn: Some("MRN-9".to_string()),
            blood_type: None,
            height_cm: None,
            weight_kg: Some(70.0),
        }),
    )
    .await
    .unwrap();

    assert_eq!(body["message"], "Profile updated successfully");
    assert_eq!(body["profile"]["mrn"], "MRN-9");
}

#[tokio::test]
async fn connect_doctor_requires_doctor_id() {
    let server = MockServer::start().await;
    let patient = TestUser::patient("pat@example.com");

    let result = handlers::connect_doctor(
        State(state_for(&server)),
        auth_for(&patient),
        extension_for(&patient),
        Json(ConnectDoctorRequest { doctor_id: None }),
    )
    .await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn connect_doctor_with_unknown_doctor_is_not_found() {
    let server = MockServer::start().await;
    let patient = TestUser::patient("pat@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let result = handlers::connect_doctor(
        State(state_for(&server)),
        auth_for(&patient),
        extension_for(&patient),
        Json(ConnectDoctorRequest {
            doctor_id: Some(Uuid::new_v4()),
        }),
    )
    .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn roster_sorts_by_alert_load_then_name() {
    let server = MockServer::start().await;
    let doctor = TestUser::doctor("doc@example.com");
    let doctor_table_id = Uuid::new_v4();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("user_id", format!("eq.{}", doctor.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "doctor_id": doctor_table_id }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_table_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "user_id": alice },
            { "user_id": bob },
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreRows::user_row(&alice.to_string(), "Alice", "Adams", "patient"),
            MockStoreRows::user_row(&bob.to_string(), "Bob", "Brown", "patient"),
        ])))
        .mount(&server)
        .await;

    // two active alerts for Bob, none for Alice
    Mock::given(method("GET"))
        .and(path("/rest/v1/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "user_id": bob },
            { "user_id": bob },
        ])))
        .mount(&server)
        .await;

    let Json(body) = handlers::get_doctor_patients(
        State(state_for(&server)),
        auth_for(&doctor),
        extension_for(&doctor),
    )
    .await
    .unwrap();

    let patients = body.as_array().unwrap();
    assert_eq!(patients.len(), 2);
    assert_eq!(patients[0]["first_name"], "Bob");
    assert_eq!(patients[0]["alert_count"], 2);
    assert_eq!(patients[1]["first_name"], "Alice");
    assert_eq!(patients[1]["alert_count"], 0);
}

#[tokio::test]
async fn patient_details_for_foreign_patient_is_forbidden() {
    let server = MockServer::start().await;
    let doctor = TestUser::doctor("doc@example.com");
    let doctor_table_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "doctor_id": doctor_table_id }
        ])))
        .mount(&server)
        .await;

    // ownership probe comes back empty
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let result = handlers::get_patient_details(
        State(state_for(&server)),
        Path(Uuid::new_v4()),
        auth_for(&doctor),
        extension_for(&doctor),
    )
    .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}
