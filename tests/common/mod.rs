//! Shared fixtures for end-to-end tests: a recording notification sink and
//! helpers to build signed requests against the router.

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use render_discord_relay::destination::DestinationHandle;
use render_discord_relay::dispatch::{NotificationSink, SinkError};
use render_discord_relay::notification::Notification;
use render_discord_relay::signature::{AUDIT_SCOPE, LOG_CHANNEL_SCOPE, sign_scoped};
use render_discord_relay::{AppState, RelayConfig, api};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

pub const SECRET: &str = "test-webhook-secret";
pub const CHANNEL: &str = "1000";

/// Sink that records what it is asked to do
#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingSink {
    pub fail_resolve: AtomicBool,
    pub fail_deliver: AtomicBool,
    pub resolve_calls: AtomicUsize,
    pub delivered: Mutex<Vec<(DestinationHandle, Notification)>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn deliveries(&self) -> Vec<(DestinationHandle, Notification)> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn delivery_count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn resolve(&self, _destination: &DestinationHandle) -> Result<(), SinkError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_resolve.load(Ordering::SeqCst) {
            return Err(SinkError::Status {
                status: 404,
                body: "Unknown Channel".to_string(),
            });
        }
        Ok(())
    }

    async fn deliver(
        &self,
        destination: &DestinationHandle,
        notification: &Notification,
    ) -> Result<(), SinkError> {
        if self.fail_deliver.load(Ordering::SeqCst) {
            return Err(SinkError::Other("connection reset".to_string()));
        }
        self.delivered
            .lock()
            .unwrap()
            .push((destination.clone(), notification.clone()));
        Ok(())
    }
}

/// Router plus the handles a test needs to inspect it
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub sink: Arc<RecordingSink>,
    pub runtime_dir: TempDir,
}

/// Configuration with a secret and channel set and a throwaway runtime file
pub fn test_config(runtime_dir: &TempDir) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.webhook_secret = Some(SECRET.to_string());
    config.log_channel = Some(CHANNEL.to_string());
    config.log_fetch_timeout_secs = 2;
    config.runtime_config_path = runtime_dir.path().join("runtime_config.json");
    config
}

#[allow(dead_code)]
pub fn test_app() -> TestApp {
    test_app_with(|_| {})
}

pub fn test_app_with(customize: impl FnOnce(&mut RelayConfig)) -> TestApp {
    let runtime_dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&runtime_dir);
    customize(&mut config);

    let sink = Arc::new(RecordingSink::default());
    let state = AppState::new(config, sink.clone()).unwrap();
    TestApp {
        router: api::router(Arc::new(state)),
        sink,
        runtime_dir,
    }
}

fn signed_request(method: &str, uri: &str, scope: Option<&str>, body: &str) -> Request<Body> {
    let signature = sign_scoped(SECRET.as_bytes(), scope, body.as_bytes());
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("render-signature", format!("sha256={}", signature))
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub fn signed_webhook(body: &str) -> Request<Body> {
    signed_request("POST", "/render-webhook", None, body)
}

#[allow(dead_code)]
pub fn signed_log_channel(body: &str) -> Request<Body> {
    signed_request("PUT", "/api/log-channel", Some(LOG_CHANNEL_SCOPE), body)
}

#[allow(dead_code)]
pub fn signed_audit() -> Request<Body> {
    signed_request("GET", "/audit", Some(AUDIT_SCOPE), "")
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response: Response<Body> = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}
