// libs/messaging-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// A message with both parties' names resolved, as the thread view renders
/// it.
#[derive(Debug, Clone, Serialize)]
pub struct MessageWithNames {
    #[serde(flatten)]
    pub message: Message,
    pub sender_first_name: String,
    pub sender_last_name: String,
    pub receiver_first_name: String,
    pub receiver_last_name: String,
}

/// One row in the conversation list: the peer plus thread digest. Peers
/// from the care-team relationship appear even before any message exists.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    pub last_message: String,
    pub last_message_time: Option<DateTime<Utc>>,
    pub unread_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub content: Option<String>,
    pub receiver_id: Option<Uuid>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MessagingError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found")]
    NotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
