//! API module for all HTTP handlers

pub mod config;
pub mod handlers;
pub mod webhook;

use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing,
};
use std::any::Any;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::SharedState;

// Re-export handlers
pub use config::set_log_channel;
pub use handlers::{audit, root};
pub use webhook::{RelayOutcome, handle_render_webhook, relay_deploy_event};

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Unhandled error in request handler: {}", detail);
    (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
}

/// Builds the HTTP router with all routes
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", routing::get(root))
        .route("/render-webhook", routing::post(handle_render_webhook))
        .route("/audit", routing::get(audit))
        .route("/api/log-channel", routing::put(set_log_channel))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
