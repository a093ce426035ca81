// libs/health-data-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// Metric reads and ingestion. These back public dashboard tiles and the
/// watch uploader, which authenticate out of band.
pub fn health_data_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/heart-rate/current", get(handlers::get_current_heart_rate))
        .route("/heart-rate/today", get(handlers::get_heart_rate_today))
        .route("/heart-rate/average-today", get(handlers::get_average_heart_rate_today))
        .route("/respiratory-rate/current", get(handlers::get_current_respiratory_rate))
        .route("/respiratory-rate/today", get(handlers::get_respiratory_rate_today))
        .route("/steps/today", get(handlers::get_steps_today))
        .route("/daylight/today", get(handlers::get_daylight_today))
        .route("/energy/today", get(handlers::get_energy_today))
        .route("/sleep/latest", get(handlers::get_sleep_latest))
        .route("/spo2/current", get(handlers::get_spo2_current))
        .route("/hrv/current", get(handlers::get_hrv_current))
        .route("/temperature/current", get(handlers::get_temperature_current))
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/data", post(handlers::ingest_health_data))
        .with_state(state)
}

pub fn trends_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::get_trends))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

pub fn reports_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/metrics", get(handlers::get_report_metrics))
        .route("/data", get(handlers::get_report_data))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
