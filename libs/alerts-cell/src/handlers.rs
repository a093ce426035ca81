// libs/alerts-cell/src/handlers.rs
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

use crate::models::AlertsError;
use crate::services::alerts::AlertsService;

fn user_uuid(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id).map_err(|_| AppError::BadRequest("Invalid user ID".to_string()))
}

fn map_error(e: AlertsError, fallback: &str) -> AppError {
    match e {
        AlertsError::NoAssignedDoctor => {
            AppError::BadRequest("Patient is not assigned to a doctor".to_string())
        }
        AlertsError::AiNotConfigured => AppError::Internal("AI service not configured".to_string()),
        AlertsError::AiFailed(_) => AppError::Internal("AI analysis failed".to_string()),
        AlertsError::AiUnavailable(_) => AppError::Internal("AI service unavailable".to_string()),
        AlertsError::DatabaseError(_) => AppError::Internal(fallback.to_string()),
    }
}

#[axum::debug_handler]
pub async fn generate_alerts(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let service = AlertsService::new(&state);

    let (inserted, alerts) = service
        .generate_alerts(user_id, auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to generate alerts"))?;

    Ok(Json(json!({
        "message": format!("Generated {} health alerts", inserted),
        "alerts_created": inserted,
        "alerts": alerts
    })))
}

#[axum::debug_handler]
pub async fn get_alerts(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let service = AlertsService::new(&state);

    let alerts = service
        .active_alerts(user_id, auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to fetch alerts"))?;

    Ok(Json(json!(alerts)))
}

#[axum::debug_handler]
pub async fn mark_alert_read(
    State(state): State<Arc<AppConfig>>,
    Path(alert_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let service = AlertsService::new(&state);

    service
        .mark_read(alert_id, user_id, auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to update alert"))?;

    Ok(Json(json!({ "message": "Alert marked as read" })))
}

#[axum::debug_handler]
pub async fn dismiss_alert(
    State(state): State<Arc<AppConfig>>,
    Path(alert_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let service = AlertsService::new(&state);

    service
        .dismiss(alert_id, user_id, auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to dismiss alert"))?;

    Ok(Json(json!({ "message": "Alert dismissed" })))
}
