// libs/care-team-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// Settings surface: profiles, the doctor directory, and the
/// patient-doctor connection.
pub fn settings_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/patients/profile", get(handlers::get_patient_profile))
        .route("/patients/profile", put(handlers::update_patient_profile))
        .route("/doctors/profile", get(handlers::get_doctor_profile))
        .route("/doctors/profile", put(handlers::update_doctor_profile))
        .route("/doctors/available", get(handlers::get_available_doctors))
        .route("/patients/connected-doctor", get(handlers::get_connected_doctor))
        .route("/patients/connect-doctor", post(handlers::connect_doctor))
        .route("/users/{user_id}", get(handlers::get_user))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

/// Doctor surface: roster and per-patient detail.
pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/patients", get(handlers::get_doctor_patients))
        .route("/patient/{patient_id}/details", get(handlers::get_patient_details))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
