pub mod chat;
pub mod context;
