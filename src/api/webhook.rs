//! Webhook handler for Render deploy notifications

use axum::{
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, info, warn};

use crate::SharedState;
use crate::error::{RelayError, Result};
use crate::notification::compose;
use crate::signature::{signature_header, verify_scoped_signature};
use crate::webhook::{NormalizedDeployEvent, StatusKey};

/// How a verified webhook was handled
#[derive(Debug)]
pub enum RelayOutcome {
    Delivered,
    Suppressed,
}

/// Checks the request signature against the configured secret. Webhooks
/// are signed without a scope; operator endpoints pass their own.
///
/// A missing secret is a server misconfiguration, not an auth failure.
pub(crate) fn authenticate(
    state: &SharedState,
    headers: &HeaderMap,
    scope: Option<&str>,
    body: &[u8],
) -> Result<()> {
    let secret = state
        .config
        .webhook_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(RelayError::SecretNotConfigured)?;

    let header = signature_header(headers).unwrap_or_default();
    if verify_scoped_signature(secret.as_bytes(), scope, body, header) {
        Ok(())
    } else {
        Err(RelayError::InvalidSignature)
    }
}

/// Runs one webhook through verification, normalization, log fetch,
/// composition and delivery.
pub async fn relay_deploy_event(
    state: &SharedState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<RelayOutcome> {
    if let Err(e) = authenticate(state, headers, None, body) {
        match &e {
            RelayError::SecretNotConfigured => {
                warn!("Webhook secret not set; rejecting webhook for safety")
            }
            _ => warn!("Invalid webhook signature, rejecting"),
        }
        return Err(e);
    }

    let event = match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(payload) => {
            debug!("{:#?}", &payload);
            NormalizedDeployEvent::from_payload(&payload)
        }
        Err(e) => {
            warn!("Could not parse JSON body, using defaults: {}", e);
            NormalizedDeployEvent::unknown()
        }
    };

    if state.config.silence_success && event.status_key == StatusKey::Succeeded {
        info!("Silencing success for {}", event.service_name);
        return Ok(RelayOutcome::Suppressed);
    }

    let Some(destination) = state.dispatcher.destination().await else {
        warn!("No log channel configured; cannot post message");
        return Err(RelayError::DestinationNotConfigured);
    };

    let logs = state
        .log_fetcher
        .fetch_excerpt(event.logs_url.as_deref())
        .await;

    let notification = compose(
        &event,
        &logs.display_text(),
        state.config.failure_role_id.as_deref(),
    );

    let delivered = state.dispatcher.dispatch(&destination, &notification).await?;
    info!(
        delivery_id = %delivered.delivery_id,
        service = %event.service_name,
        status = %event.status_key,
        "Relayed deploy event"
    );
    Ok(RelayOutcome::Delivered)
}

/// Handles the Render webhook POST request.
pub async fn handle_render_webhook(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match relay_deploy_event(&state, &headers, &body).await {
        Ok(RelayOutcome::Delivered) => (StatusCode::OK, "OK").into_response(),
        Ok(RelayOutcome::Suppressed) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}
