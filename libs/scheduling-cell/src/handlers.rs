// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{BookAppointmentRequest, CreateAvailabilityRequest, UpdateStatusRequest};
use crate::services::availability::AvailabilityService;
use crate::services::booking::BookingService;
use crate::models::SchedulingError;

fn user_uuid(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id).map_err(|_| AppError::BadRequest("Invalid user ID".to_string()))
}

fn map_error(e: SchedulingError, fallback: &str) -> AppError {
    match e {
        SchedulingError::InvalidTime(t) => AppError::BadRequest(format!("Invalid time: {}", t)),
        SchedulingError::ValidationError(msg) => AppError::BadRequest(msg),
        SchedulingError::ConflictDetected => {
            AppError::Conflict("Time slot is no longer available".to_string())
        }
        SchedulingError::NotFound => AppError::NotFound("Not found".to_string()),
        SchedulingError::DatabaseError(_) => AppError::Internal(fallback.to_string()),
    }
}

// ==============================================================================
// AVAILABILITY HANDLERS (doctor-facing weekly schedule)
// ==============================================================================

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = user_uuid(&user)?;
    let service = AvailabilityService::new(&state);

    let windows = service
        .list_for_doctor(doctor_id, auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to fetch availability"))?;

    Ok(Json(json!(windows)))
}

#[axum::debug_handler]
pub async fn add_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = user_uuid(&user)?;
    let service = AvailabilityService::new(&state);

    let availability = service
        .create(doctor_id, request, auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to add availability"))?;

    Ok(Json(json!({
        "message": "Availability added successfully",
        "availability": availability
    })))
}

#[axum::debug_handler]
pub async fn delete_availability(
    State(state): State<Arc<AppConfig>>,
    Path(availability_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = user_uuid(&user)?;
    let service = AvailabilityService::new(&state);

    service
        .delete(doctor_id, availability_id, auth.token())
        .await
        .map_err(|e| match e {
            SchedulingError::NotFound => {
                AppError::NotFound("Availability not found".to_string())
            }
            other => map_error(other, "Failed to delete availability"),
        })?;

    Ok(Json(json!({ "message": "Availability deleted successfully" })))
}

// ==============================================================================
// SLOT AND BOOKING HANDLERS
// ==============================================================================

/// Public: derived free slots for a doctor and date. Uses the anon key
/// against the store since no caller token is present.
#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    Path((doctor_id, date)): Path<(Uuid, NaiveDate)>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);

    let slots = service
        .available_slots(doctor_id, date, &state.supabase_anon_key)
        .await
        .map_err(|e| map_error(e, "Failed to fetch available slots"))?;

    Ok(Json(json!(slots)))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let patient_id = user_uuid(&user)?;
    let service = BookingService::new(&state);

    let appointment = service
        .book(patient_id, request, auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to create appointment"))?;

    Ok(Json(json!({
        "message": "Appointment booked successfully",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = user_uuid(&user)?;
    let service = BookingService::new(&state);

    let appointments = service
        .patient_appointments(patient_id, auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to fetch appointments"))?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = user_uuid(&user)?;
    let service = BookingService::new(&state);

    let appointments = service
        .doctor_appointments(doctor_id, auth.token())
        .await
        .map_err(|e| map_error(e, "Failed to fetch appointments"))?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let status = request
        .status
        .ok_or_else(|| AppError::BadRequest("Invalid status".to_string()))?;

    let service = BookingService::new(&state);

    let appointment = service
        .update_status(appointment_id, user_id, &status, auth.token())
        .await
        .map_err(|e| match e {
            SchedulingError::NotFound => {
                AppError::NotFound("Appointment not found or access denied".to_string())
            }
            other => map_error(other, "Failed to update appointment status"),
        })?;

    Ok(Json(json!({
        "message": "Appointment status updated successfully",
        "appointment": appointment
    })))
}
