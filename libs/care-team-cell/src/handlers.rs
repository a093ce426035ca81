// libs/care-team-cell/src/handlers.rs
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

use crate::models::{
    CareTeamError, ConnectDoctorRequest, UpdateDoctorProfileRequest, UpdatePatientProfileRequest,
};
use crate::services::profile::ProfileService;
use crate::services::roster::RosterService;

fn user_uuid(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id).map_err(|_| AppError::BadRequest("Invalid user ID".to_string()))
}

fn map_error(e: CareTeamError, fallback: &str) -> AppError {
    match e {
        CareTeamError::ValidationError(msg) => AppError::BadRequest(msg),
        CareTeamError::NotFound(msg) => AppError::NotFound(msg),
        CareTeamError::AccessDenied => {
            AppError::Forbidden("Access denied to this patient".to_string())
        }
        CareTeamError::DatabaseError(_) => AppError::Internal(fallback.to_string()),
    }
}

// ==============================================================================
// PROFILE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_patient_profile(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let service = ProfileService::new(&state);

    let profile = service
        .patient_profile(user_id, auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to fetch profile"))?;

    Ok(Json(json!(profile)))
}

#[axum::debug_handler]
pub async fn update_patient_profile(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdatePatientProfileRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let service = ProfileService::new(&state);

    let profile = service
        .update_patient_profile(user_id, request, auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to update profile"))?;

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "profile": profile
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_profile(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let service = ProfileService::new(&state);

    let profile = service
        .doctor_profile(user_id, auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to fetch profile"))?;

    Ok(Json(json!(profile)))
}

#[axum::debug_handler]
pub async fn update_doctor_profile(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateDoctorProfileRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let service = ProfileService::new(&state);

    let profile = service
        .update_doctor_profile(user_id, request, auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to update profile"))?;

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "profile": profile
    })))
}

// ==============================================================================
// CONNECTION HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_doctors(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = ProfileService::new(&state);

    let doctors = service
        .available_doctors(auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to fetch doctors"))?;

    Ok(Json(json!({ "doctors": doctors })))
}

#[axum::debug_handler]
pub async fn get_connected_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let service = ProfileService::new(&state);

    let doctor = service
        .connected_doctor(user_id, auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to fetch connected doctor"))?;

    Ok(Json(json!({ "doctor": doctor })))
}

#[axum::debug_handler]
pub async fn connect_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ConnectDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let doctor_user_id = request
        .doctor_id
        .ok_or_else(|| AppError::BadRequest("Doctor ID is required".to_string()))?;

    let service = ProfileService::new(&state);

    let connection = service
        .connect_doctor(user_id, doctor_user_id, auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to connect to doctor"))?;

    Ok(Json(json!({
        "message": "Successfully connected to doctor",
        "connection": connection
    })))
}

#[axum::debug_handler]
pub async fn get_user(
    State(state): State<Arc<AppConfig>>,
    Path(user_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = ProfileService::new(&state);

    let identity = service
        .user_identity(user_id, auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to fetch user"))?;

    Ok(Json(json!(identity)))
}

// ==============================================================================
// DOCTOR ROSTER HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_doctor_patients(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor_user_id = user_uuid(&user)?;
    let service = RosterService::new(&state);

    let patients = service
        .patients(doctor_user_id, auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to fetch patients"))?;

    Ok(Json(json!(patients)))
}

#[axum::debug_handler]
pub async fn get_patient_details(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor_user_id = user_uuid(&user)?;
    let service = RosterService::new(&state);

    let details = service
        .patient_details(doctor_user_id, patient_id, auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to fetch patient details"))?;

    Ok(Json(json!(details)))
}
