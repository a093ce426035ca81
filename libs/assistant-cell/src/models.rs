// libs/assistant-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One message in an AI thread. The assistant's identity is the nil UUID
/// on both sides of the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiMessage {
    pub message_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
}

/// Which voice the assistant answers in; each audience has its own thread
/// table and prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Patient,
    Doctor,
}

impl Audience {
    pub fn table(&self) -> &'static str {
        match self {
            Audience::Patient => "ai_messages",
            Audience::Doctor => "doctor_ai_messages",
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AssistantError {
    #[error("Message is required")]
    EmptyMessage,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
