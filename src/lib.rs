pub mod auth;
pub mod client;
pub mod clock;
pub mod config;
pub mod cors;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod state;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::{check_handler, health_handler, metrics_handler, preflight_handler};
use crate::state::AppState;

pub const CHECK_PATH: &str = "/rate-limit";

// Echoed bodies are held in memory; larger ones are counted but not echoed
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(CHECK_PATH, post(check_handler).options(preflight_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(from_fn(cors::cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
