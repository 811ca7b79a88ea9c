//! Destination override endpoint

use axum::{
    Json,
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::SharedState;
use crate::api::webhook::authenticate;
use crate::error::RelayError;
use crate::signature::LOG_CHANNEL_SCOPE;

/// Body of `PUT /api/log-channel`. The `channel_id` key is required;
/// `null` clears the override.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogChannelRequest {
    #[serde(deserialize_with = "required_nullable")]
    pub channel_id: Option<String>,
}

/// Distinguishes an explicit `null` from a missing key, which serde would
/// otherwise both read as `None` for an `Option` field.
fn required_nullable<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)
}

/// Parses and checks the request body. Channel ids are Discord snowflakes,
/// so only ASCII digits are accepted.
fn parse_request(body: &[u8]) -> Result<Option<String>, RelayError> {
    let request: LogChannelRequest = serde_json::from_slice(body)
        .map_err(|e| RelayError::InvalidRequest(format!("Invalid request body: {}", e)))?;

    match request.channel_id.map(|c| c.trim().to_string()) {
        None => Ok(None),
        Some(id) if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) => Ok(Some(id)),
        Some(_) => Err(RelayError::InvalidRequest(
            "channel_id must be a numeric channel id".to_string(),
        )),
    }
}

/// PUT /api/log-channel - Set or clear the runtime destination override.
/// The body must be signed under the log-channel scope.
pub async fn set_log_channel(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(e) = authenticate(&state, &headers, Some(LOG_CHANNEL_SCOPE), &body) {
        warn!("Rejected log channel update: {}", e);
        return e.into_response();
    }

    let channel = match parse_request(&body) {
        Ok(channel) => channel,
        Err(e) => return e.into_response(),
    };

    match state
        .dispatcher
        .destinations()
        .set_override(channel.clone())
        .await
    {
        Ok(()) => {
            match &channel {
                Some(id) => info!("Log channel override set to {}", id),
                None => info!("Log channel override cleared"),
            }
            let effective = state.dispatcher.destination().await;
            Json(json!({
                "status": "success",
                "channel_id": channel,
                "effective_channel_id": effective.map(|d| d.channel_id),
            }))
            .into_response()
        }
        Err(e) => {
            error!("Failed to persist log channel override: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": "Failed to save log channel"
                })),
            )
                .into_response()
        }
    }
}
