// libs/care-team-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// PROFILE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientProfile {
    pub mrn: Option<String>,
    pub blood_type: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePatientProfileRequest {
    pub mrn: Option<String>,
    pub blood_type: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub license_no: Option<String>,
    pub specialization: Option<String>,
    pub npi: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDoctorProfileRequest {
    pub license_no: Option<String>,
    pub specialization: Option<String>,
    pub npi: Option<String>,
}

// ==============================================================================
// DIRECTORY / CONNECTION MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct AvailableDoctor {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub specialization: Option<String>,
    pub license_no: Option<String>,
    pub npi: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectedDoctor {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub specialization: Option<String>,
    pub license_no: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectDoctorRequest {
    /// The doctor's user id as the frontend knows them.
    #[serde(rename = "doctorId")]
    pub doctor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
}

// ==============================================================================
// DOCTOR ROSTER MODELS
// ==============================================================================

/// A patient on a doctor's roster with their active alert load; the roster
/// is sorted most-alerted first.
#[derive(Debug, Clone, Serialize)]
pub struct PatientSummary {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub alert_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientAverages {
    pub heart_rate: Option<f64>,
    pub respiratory_rate: Option<f64>,
    pub active_energy: Option<f64>,
    pub spo2: Option<f64>,
    pub hrv: Option<f64>,
    pub wrist_temp: Option<f64>,
    pub sleep_hours: Option<f64>,
}

/// An active alert rendered as an anomaly line in the patient detail view.
#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    pub metric: String,
    pub severity: String,
    pub description: String,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientDetails {
    pub averages: PatientAverages,
    pub anomalies: Vec<Anomaly>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum CareTeamError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access denied")]
    AccessDenied,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
