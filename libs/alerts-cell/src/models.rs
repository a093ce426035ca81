// libs/alerts-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A persisted clinical alert. Read/dismiss are independent flags with
/// independent owners: `is_read` is the doctor-facing acknowledgement,
/// `is_dismissed` the patient-facing one; neither resets the other.
/// Dismissed alerts leave the active list but are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: Uuid,
    pub user_id: Uuid,
    pub doctor_id: Uuid,
    pub alert_type: String,
    pub title: String,
    pub message: String,
    pub severity: String,
    #[serde(default)]
    pub metadata: Value,
    pub is_read: bool,
    pub is_dismissed: bool,
    pub created_at: DateTime<Utc>,
}

/// A candidate as produced by the model - every field optional, nothing
/// trusted until it passes through the assembler.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertCandidate {
    pub alert_type: Option<String>,
    pub title: Option<String>,
    pub message: Option<String>,
    pub severity: Option<String>,
    pub metadata: Option<Value>,
}

/// A candidate after validation/defaulting, ready to persist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedAlert {
    pub alert_type: String,
    pub title: String,
    pub message: String,
    pub severity: String,
    pub metadata: Value,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AlertsError {
    #[error("Patient is not assigned to a doctor")]
    NoAssignedDoctor,

    #[error("AI service not configured")]
    AiNotConfigured,

    #[error("AI analysis failed: {0}")]
    AiFailed(String),

    #[error("AI service unavailable: {0}")]
    AiUnavailable(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
