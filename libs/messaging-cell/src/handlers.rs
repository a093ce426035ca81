// libs/messaging-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{MessagingError, SendMessageRequest};
use crate::services::messaging::MessagingService;

fn user_uuid(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id).map_err(|_| AppError::BadRequest("Invalid user ID".to_string()))
}

fn map_error(e: MessagingError, fallback: &str) -> AppError {
    match e {
        MessagingError::ValidationError(msg) => AppError::BadRequest(msg),
        MessagingError::NotFound => {
            AppError::NotFound("Message not found or unauthorized".to_string())
        }
        MessagingError::DatabaseError(_) => AppError::Internal(fallback.to_string()),
    }
}

#[axum::debug_handler]
pub async fn get_conversations(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let service = MessagingService::new(&state);

    let conversations = service
        .conversations(user_id, auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to fetch conversations"))?;

    Ok(Json(json!(conversations)))
}

#[axum::debug_handler]
pub async fn get_messages(
    State(state): State<Arc<AppConfig>>,
    Path(peer_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let service = MessagingService::new(&state);

    let messages = service
        .thread(user_id, peer_id, auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to fetch messages"))?;

    Ok(Json(json!(messages)))
}

#[axum::debug_handler]
pub async fn send_message(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<Value>, AppError> {
    let sender_id = user_uuid(&user)?;
    let service = MessagingService::new(&state);

    let message = service
        .send(sender_id, request, auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to send message"))?;

    Ok(Json(json!({
        "message": "Message sent successfully",
        "data": message
    })))
}

#[axum::debug_handler]
pub async fn delete_message(
    State(state): State<Arc<AppConfig>>,
    Path(message_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let service = MessagingService::new(&state);

    service
        .delete(user_id, message_id, auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to delete message"))?;

    Ok(Json(json!({ "message": "Message deleted successfully" })))
}
