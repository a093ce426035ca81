// libs/assistant-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{AssistantError, Audience, ChatRequest};
use crate::services::chat::ChatService;

fn user_uuid(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id).map_err(|_| AppError::BadRequest("Invalid user ID".to_string()))
}

fn map_error(e: AssistantError, fallback: &str) -> AppError {
    match e {
        AssistantError::EmptyMessage => AppError::BadRequest("Message is required".to_string()),
        AssistantError::DatabaseError(_) => AppError::Internal(fallback.to_string()),
    }
}

async fn conversations(
    state: Arc<AppConfig>,
    token: &str,
    user: &User,
    audience: Audience,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(user)?;
    let service = ChatService::new(&state);

    let messages = service
        .conversations(user_id, audience, token)
        .await
        .map_err(|e| map_error(e, "Failed to fetch AI conversations"))?;

    Ok(Json(json!(messages)))
}

async fn chat(
    state: Arc<AppConfig>,
    token: &str,
    user: &User,
    request: ChatRequest,
    audience: Audience,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(user)?;
    let message = request.message.unwrap_or_default();
    let service = ChatService::new(&state);

    let response = service
        .chat(user_id, &message, audience, token)
        .await
        .map_err(|e| map_error(e, "Failed to process AI chat"))?;

    Ok(Json(json!({
        "message": "AI response generated",
        "response": response
    })))
}

#[axum::debug_handler]
pub async fn get_patient_conversations(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    conversations(state, auth.token(), &user, Audience::Patient).await
}

#[axum::debug_handler]
pub async fn patient_chat(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Value>, AppError> {
    chat(state, auth.token(), &user, request, Audience::Patient).await
}

#[axum::debug_handler]
pub async fn get_doctor_conversations(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    conversations(state, auth.token(), &user, Audience::Doctor).await
}

#[axum::debug_handler]
pub async fn doctor_chat(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Value>, AppError> {
    chat(state, auth.token(), &user, request, Audience::Doctor).await
}
