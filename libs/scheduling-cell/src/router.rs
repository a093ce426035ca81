// libs/scheduling-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        // Doctor weekly schedule
        .route("/availability", get(handlers::get_availability))
        .route("/availability", post(handlers::add_availability))
        .route("/availability/{availability_id}", delete(handlers::delete_availability))
        // Booking and listings
        .route("/", post(handlers::book_appointment))
        .route("/patient", get(handlers::get_patient_appointments))
        .route("/doctor", get(handlers::get_doctor_appointments))
        .route("/{appointment_id}/status", put(handlers::update_appointment_status))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Slot lookup is reachable from the public booking page
    let public_routes = Router::new().route(
        "/available-slots/{doctor_id}/{date}",
        get(handlers::get_available_slots),
    );

    Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .with_state(state)
}
