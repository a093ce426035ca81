// libs/assistant-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// Patient-facing assistant thread.
pub fn assistant_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/conversations", get(handlers::get_patient_conversations))
        .route("/chat", post(handlers::patient_chat))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

/// Clinician-voice assistant thread, mounted under the doctor surface.
pub fn doctor_assistant_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/conversations", get(handlers::get_doctor_conversations))
        .route("/chat", post(handlers::doctor_chat))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
