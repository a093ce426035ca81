use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::json;

use alerts_cell::router::alert_routes;
use assistant_cell::router::{assistant_routes, doctor_assistant_routes};
use care_team_cell::router::{doctor_routes, settings_routes};
use health_data_cell::router::{health_data_routes, reports_routes, trends_routes};
use messaging_cell::router::message_routes;
use scheduling_cell::router::appointment_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    // the clinician surface carries both the roster and the doctor-voice
    // assistant thread
    let doctor = Router::new()
        .nest("/ai", doctor_assistant_routes(state.clone()))
        .merge(doctor_routes(state.clone()));

    let api = Router::new()
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/health", health_data_routes(state.clone()))
        .nest("/trends", trends_routes(state.clone()))
        .nest("/reports", reports_routes(state.clone()))
        .nest("/alerts", alert_routes(state.clone()))
        .nest("/ai", assistant_routes(state.clone()))
        .nest("/messages", message_routes(state.clone()))
        .nest("/doctor", doctor)
        // profile/settings endpoints live at the api root
        .merge(settings_routes(state));

    Router::new()
        .route("/", get(|| async { "MedLink API is running!" }))
        .route(
            "/health",
            get(|| async {
                Json(json!({
                    "status": "OK",
                    "timestamp": chrono::Utc::now().to_rfc3339()
                }))
            }),
        )
        .nest("/api", api)
}
