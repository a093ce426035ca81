use std::sync::Arc;

use axum::extract::{Extension, Path, State};
use axum::Json;
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use messaging_cell::handlers;
use messaging_cell::models::SendMessageRequest;
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

fn message_row(
    sender: &str,
    receiver: &str,
    content: &str,
    is_read: bool,
    created_at: &str,
) -> serde_json::Value {
    json!({
        "message_id": Uuid::new_v4(),
        "sender_id": sender,
        "receiver_id": receiver,
        "content": content,
        "is_read": is_read,
        "created_at": created_at
    })
}

#[tokio::test]
async fn conversations_digest_thread_and_count_unread() {
    let server = MockServer::start().await;
    let patient = TestUser::patient("pat@example.com");
    let doctor_user_id = Uuid::new_v4().to_string();
    let doctor_table_id = Uuid::new_v4().to_string();

    // newest first: an unread incoming message, then an older outgoing one
    Mock::given(method("GET"))
        .and(path("/rest/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            message_row(&doctor_user_id, &patient.id, "See you tomorrow", false,
                        "2025-06-18T10:00:00Z"),
            message_row(&patient.id, &doctor_user_id, "Thanks doctor", true,
                        "2025-06-18T09:00:00Z"),
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreRows::user_row(&doctor_user_id, "Greg", "House", "doctor")
        ])))
        .mount(&server)
        .await;

    // specialization lookup for thread peers
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("user_id", format!("in.({})", doctor_user_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "user_id": doctor_user_id, "specialization": "Diagnostics" }
        ])))
        .mount(&server)
        .await;

    // connected doctor resolves to the same peer: no duplicate row
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("user_id", format!("eq.{}", patient.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "doctor_id": doctor_table_id }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_table_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "user_id": doctor_user_id, "specialization": "Diagnostics" }
        ])))
        .mount(&server)
        .await;

    // the caller is not a doctor
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("user_id", format!("eq.{}", patient.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let Json(body) = handlers::get_conversations(
        State(state_for(&server)),
        auth_for(&patient),
        extension_for(&patient),
    )
    .await
    .unwrap();

    let conversations = body.as_array().unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0]["last_message"], "See you tomorrow");
    assert_eq!(conversations[0]["unread_count"], 1);
    assert_eq!(conversations[0]["specialization"], "Diagnostics");
    assert_eq!(conversations[0]["first_name"], "Greg");
}

#[tokio::test]
async fn connected_doctor_without_thread_gets_placeholder_row() {
    let server = MockServer::start().await;
    let patient = TestUser::patient("pat@example.com");
    let doctor_user_id = Uuid::new_v4().to_string();
    let doctor_table_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("user_id", format!("eq.{}", patient.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "doctor_id": doctor_table_id }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_table_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "user_id": doctor_user_id, "specialization": "Cardiology" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreRows::user_row(&doctor_user_id, "Lisa", "Cuddy", "doctor")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("user_id", format!("eq.{}", patient.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let Json(body) = handlers::get_conversations(
        State(state_for(&server)),
        auth_for(&patient),
        extension_for(&patient),
    )
    .await
    .unwrap();

    let conversations = body.as_array().unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(
        conversations[0]["last_message"],
        "Start a conversation with your doctor"
    );
    assert_eq!(conversations[0]["unread_count"], 0);
    assert_eq!(
        conversations[0]["last_message_time"],
        serde_json::Value::Null
    );
}

#[tokio::test]
async fn send_requires_content_and_receiver() {
    let server = MockServer::start().await;
    let patient = TestUser::patient("pat@example.com");

    let result = handlers::send_message(
        State(state_for(&server)),
        auth_for(&patient),
        extension_for(&patient),
        Json(SendMessageRequest {
            content: Some("hello".to_string()),
            receiver_id: None,
        }),
    )
    .await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn deleting_someone_elses_message_is_not_found() {
    let server = MockServer::start().await;
    let patient = TestUser::patient("pat@example.com");

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let result = handlers::delete_message(
        State(state_for(&server)),
        Path(Uuid::new_v4()),
        auth_for(&patient),
        extension_for(&patient),
    )
    .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn thread_marks_incoming_messages_read() {
    let server = MockServer::start().await;
    let patient = TestUser::patient("pat@example.com");
    let peer = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/messages"))
        .and(query_param("sender_id", format!("eq.{}", peer)))
        .and(query_param("is_read", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            message_row(&peer.to_string(), &patient.id, "hi", true, "2025-06-18T09:00:00Z"),
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreRows::user_row(&patient.id, "Pat", "Smith", "patient"),
            MockStoreRows::user_row(&peer.to_string(), "Greg", "House", "doctor"),
        ])))
        .mount(&server)
        .await;

    let Json(body) = handlers::get_messages(
        State(state_for(&server)),
        Path(peer),
        auth_for(&patient),
        extension_for(&patient),
    )
    .await
    .unwrap();

    let messages = body.as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["sender_first_name"], "Greg");
    assert_eq!(messages[0]["receiver_first_name"], "Pat");
}
