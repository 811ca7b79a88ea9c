//! Liveness and self-diagnostic endpoints

use axum::{
    Json,
    extract::{Query, State as AxumState},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::collections::HashMap;
use tracing::warn;

use crate::SharedState;
use crate::api::webhook::authenticate;
use crate::config::is_placeholder;
use crate::signature::AUDIT_SCOPE;

const SERVICE_NAME: &str = "render_discord_relay";

fn presence(value: Option<&str>) -> &'static str {
    if is_placeholder(value) { "MISSING" } else { "OK" }
}

/// Root health check endpoint
/// Supports ?format=json for detailed JSON response
pub async fn root(
    AxumState(state): AxumState<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if params.get("format").map(|s| s.as_str()) == Some("json") {
        Json(json!({
            "name": SERVICE_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "uptime_seconds": state.start_time.elapsed().as_secs(),
            "started_at": state.started_at.to_rfc3339(),
            "status": "healthy"
        }))
        .into_response()
    } else {
        format!("{} - healthy", SERVICE_NAME).into_response()
    }
}

/// GET /audit - configuration presence and destination reachability.
/// Requires a signature over the empty body under the audit scope.
/// Secret values are never echoed.
pub async fn audit(AxumState(state): AxumState<SharedState>, headers: HeaderMap) -> Response {
    if let Err(e) = authenticate(&state, &headers, Some(AUDIT_SCOPE), b"") {
        warn!("Rejected audit request: {}", e);
        return e.into_response();
    }

    let config = &state.config;
    let destination = state.dispatcher.destination().await;

    let reachability = match &destination {
        None => "NOT CONFIGURED",
        Some(handle) => match state.dispatcher.sink().resolve(handle).await {
            Ok(()) => "OK",
            Err(e) => {
                warn!("Audit could not resolve channel {}: {}", handle.channel_id, e);
                "FAILED"
            }
        },
    };

    Json(json!({
        "checks": {
            "webhook_secret": presence(config.webhook_secret.as_deref()),
            "log_channel": presence(config.log_channel.as_deref()),
            "discord_token": presence(config.discord.token.as_deref()),
            "render_api_key": presence(config.render_api_key.as_deref()),
            "failure_role_id": presence(config.failure_role_id.as_deref()),
        },
        "destination": {
            "channel_id": destination.as_ref().map(|d| d.channel_id.clone()),
            "source": destination.as_ref().map(|d| d.source),
            "reachable": reachability,
        },
        "silence_success": config.silence_success,
        "uptime_seconds": state.start_time.elapsed().as_secs(),
    }))
    .into_response()
}
