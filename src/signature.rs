//! Shared-secret webhook signature verification

use axum::http::HeaderMap;
use hex::decode as hex_decode;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Headers that may carry the signature, checked in this order.
pub const SIGNATURE_HEADERS: [&str; 3] = [
    "render-signature",
    "x-render-signature",
    "render-signature-sha256",
];

/// Returns the first non-empty signature header, if any.
pub fn signature_header(headers: &HeaderMap) -> Option<&str> {
    SIGNATURE_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    })
}

/// Scope for `PUT /api/log-channel` request signatures.
pub const LOG_CHANNEL_SCOPE: &str = "log-channel";

/// Scope for `GET /audit` request signatures.
pub const AUDIT_SCOPE: &str = "audit";

/// HMAC over `payload`, or over `"<scope>:" + payload` when a scope is given.
/// Webhook bodies are JSON and start with `{`, so no scoped message can
/// collide with one.
fn mac_for(secret: &[u8], scope: Option<&str>, payload: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    if let Some(scope) = scope {
        mac.update(scope.as_bytes());
        mac.update(b":");
    }
    mac.update(payload);
    Some(mac)
}

/// Computes the hex-encoded HMAC-SHA256 of `payload` keyed with `secret`.
pub fn sign(secret: &[u8], payload: &[u8]) -> String {
    sign_scoped(secret, None, payload)
}

/// Like [`sign`], bound to an operator endpoint scope.
pub fn sign_scoped(secret: &[u8], scope: Option<&str>, payload: &[u8]) -> String {
    // HMAC accepts keys of any length, so this cannot fail.
    match mac_for(secret, scope, payload) {
        Some(mac) => hex::encode(mac.finalize().into_bytes()),
        None => String::new(),
    }
}

/// Verifies a webhook signature header against the raw request body.
///
/// Accepts either `sha256=<hex>` or a bare hex digest; when a `=` is present
/// only the part after the last one is used. Every failure (missing header,
/// bad hex, wrong length, mismatch) yields `false` without saying which.
pub fn verify_signature(secret: &[u8], payload: &[u8], signature_header: &str) -> bool {
    verify_scoped_signature(secret, None, payload, signature_header)
}

/// Verifies a signature made with [`sign_scoped`]. A signature for one scope
/// (or for a plain webhook) never verifies under another.
pub fn verify_scoped_signature(
    secret: &[u8],
    scope: Option<&str>,
    payload: &[u8],
    signature_header: &str,
) -> bool {
    if signature_header.is_empty() {
        return false;
    }

    let received_hex = signature_header
        .rsplit_once('=')
        .map(|(_, hex)| hex)
        .unwrap_or(signature_header);

    let received = match hex_decode(received_hex) {
        Ok(bytes) => bytes,
        Err(_) => {
            debug!("Signature header is not valid hex");
            return false;
        }
    };

    let Some(mac) = mac_for(secret, scope, payload) else {
        return false;
    };
    let expected = mac.finalize().into_bytes();

    constant_time_eq(expected.as_slice(), &received)
}

/// Length check first (lengths are public), then a comparison whose cost does
/// not depend on where the inputs first differ.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
