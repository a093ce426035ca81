pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{ConversationSummary, Message, MessagingError, SendMessageRequest};
pub use router::message_routes;
