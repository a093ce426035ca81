// libs/alerts-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn alert_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/generate", post(handlers::generate_alerts))
        .route("/", get(handlers::get_alerts))
        .route("/{alert_id}/read", put(handlers::mark_alert_read))
        .route("/{alert_id}/dismiss", put(handlers::dismiss_alert))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
