// libs/messaging-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn message_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/conversations", get(handlers::get_conversations))
        .route("/messages", post(handlers::send_message))
        // GET takes a peer id, DELETE a message id
        .route(
            "/messages/{id}",
            get(handlers::get_messages).delete(handlers::delete_message),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
