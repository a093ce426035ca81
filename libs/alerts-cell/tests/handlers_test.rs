use std::sync::Arc;

use axum::extract::{Extension, Path, State};
use axum::Json;
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use alerts_cell::handlers;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, MockStoreRows, TestConfig, TestUser};

const GEMINI_PATH: &str = "/v1beta/models/gemini:generateContent";

fn state_for(server: &MockServer) -> Arc<AppConfig> {
    TestConfig {
        supabase_url: server.uri(),
        gemini_api_url: format!("{}{}", server.uri(), GEMINI_PATH),
        ..TestConfig::default()
    }
    .to_arc()
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

async fn mount_empty_health_series(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/health_realtime"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/health_aggregated"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

async fn mount_assigned_doctor(server: &MockServer, doctor_id: &Uuid) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "doctor_id": doctor_id }
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn generate_persists_model_candidates_best_effort() {
    let server = MockServer::start().await;
    let patient = TestUser::patient("pat@example.com");
    let doctor_id = Uuid::new_v4();

    mount_assigned_doctor(&server, &doctor_id).await;
    mount_empty_health_series(&server).await;

    let reply = "```json\n[\n  {\"alert_type\": \"heart_rate\", \"title\": \"Elevated Heart Rate\", \"severity\": \"high\"},\n  {}\n]\n```";
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(MockStoreRows::gemini_response(reply)),
        )
        .mount(&server)
        .await;

    // first insert blows up, second succeeds: the batch must not abort
    Mock::given(method("POST"))
        .and(path("/rest/v1/alerts"))
        .respond_with(ResponseTemplate::new(500).set_body_string("insert failed"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/alerts"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreRows::alert_row(&patient.id, &doctor_id.to_string(), "medium")
        ])))
        .mount(&server)
        .await;

    let Json(body) = handlers::generate_alerts(
        State(state_for(&server)),
        auth_for(&patient),
        extension_for(&patient),
    )
    .await
    .unwrap();

    assert_eq!(body["alerts_created"], 1);
    assert_eq!(body["message"], "Generated 1 health alerts");

    let alerts = body["alerts"].as_array().unwrap();
    assert_eq!(alerts.len(), 2);
    // explicit fields kept, absent fields defaulted
    assert_eq!(alerts[0]["alert_type"], "heart_rate");
    assert_eq!(alerts[0]["message"], "Abnormal health pattern detected");
    assert_eq!(alerts[1]["alert_type"], "general");
    assert_eq!(alerts[1]["title"], "Health Alert");
    assert_eq!(alerts[1]["severity"], "medium");
    assert_eq!(alerts[1]["metadata"], json!({}));
}

#[tokio::test]
async fn generate_without_assigned_doctor_is_bad_request() {
    let server = MockServer::start().await;
    let patient = TestUser::patient("pat@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "doctor_id": null }
        ])))
        .mount(&server)
        .await;

    let result = handlers::generate_alerts(
        State(state_for(&server)),
        auth_for(&patient),
        extension_for(&patient),
    )
    .await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn generate_with_failing_model_is_internal_error() {
    let server = MockServer::start().await;
    let patient = TestUser::patient("pat@example.com");
    let doctor_id = Uuid::new_v4();

    mount_assigned_doctor(&server, &doctor_id).await;
    mount_empty_health_series(&server).await;

    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let result = handlers::generate_alerts(
        State(state_for(&server)),
        auth_for(&patient),
        extension_for(&patient),
    )
    .await;

    assert!(matches!(result, Err(AppError::Internal(_))));
}

#[tokio::test]
async fn generate_with_prose_reply_creates_nothing() {
    let server = MockServer::start().await;
    let patient = TestUser::patient("pat@example.com");
    let doctor_id = Uuid::new_v4();

    mount_assigned_doctor(&server, &doctor_id).await;
    mount_empty_health_series(&server).await;

    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockStoreRows::gemini_response("All metrics look normal, no alerts needed."),
        ))
        .mount(&server)
        .await;

    let Json(body) = handlers::generate_alerts(
        State(state_for(&server)),
        auth_for(&patient),
        extension_for(&patient),
    )
    .await
    .unwrap();

    assert_eq!(body["alerts_created"], 0);
    assert_eq!(body["alerts"], json!([]));
}

#[tokio::test]
async fn active_alerts_listing_returns_rows() {
    let server = MockServer::start().await;
    let patient = TestUser::patient("pat@example.com");
    let doctor_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreRows::alert_row(&patient.id, &doctor_id, "high"),
            MockStoreRows::alert_row(&patient.id, &doctor_id, "low"),
        ])))
        .mount(&server)
        .await;

    let Json(body) = handlers::get_alerts(
        State(state_for(&server)),
        auth_for(&patient),
        extension_for(&patient),
    )
    .await
    .unwrap();

    let alerts = body.as_array().unwrap();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0]["severity"], "high");
}

#[tokio::test]
async fn dismiss_flags_alert_without_touching_read_state() {
    let server = MockServer::start().await;
    let patient = TestUser::patient("pat@example.com");

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/alerts"))
        .and(wiremock::matchers::body_json(json!({ "is_dismissed": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let Json(body) = handlers::dismiss_alert(
        State(state_for(&server)),
        Path(Uuid::new_v4()),
        auth_for(&patient),
        extension_for(&patient),
    )
    .await
    .unwrap();

    assert_eq!(body["message"], "Alert dismissed");
}

#[tokio::test]
async fn mark_read_sets_only_the_read_flag() {
    let server = MockServer::start().await;
    let doctor = TestUser::doctor("doc@example.com");

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/alerts"))
        .and(wiremock::matchers::body_json(json!({ "is_read": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let Json(body) = handlers::mark_alert_read(
        State(state_for(&server)),
        Path(Uuid::new_v4()),
        auth_for(&doctor),
        extension_for(&doctor),
    )
    .await
    .unwrap();

    assert_eq!(body["message"], "Alert marked as read");
}
