pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{AiMessage, AssistantError, Audience, ChatRequest};
pub use router::{assistant_routes, doctor_assistant_routes};
