//! Deploy-event payload normalization and status classification

use serde_json::Value;

/// Placeholder used for any field the payload does not provide.
pub const UNKNOWN: &str = "unknown";

/// Candidate paths for each field, in priority order.
const SERVICE_NAME_PATHS: &[&[&str]] = &[&["service", "name"], &["service_name"], &["service"]];
const COMMIT_PATHS: &[&[&str]] = &[
    &["commit", "sha"],
    &["commit", "hash"],
    &["commit"],
    &["commit_hash"],
    &["revision"],
    &["sha"],
    &["commitId"],
];
const STATUS_PATHS: &[&[&str]] = &[
    &["status"],
    &["deploy", "status"],
    &["build", "status"],
    &["event"],
    &["state"],
];
const LOGS_URL_PATHS: &[&[&str]] = &[
    &["logs_url"],
    &["log_url"],
    &["build", "logs_url"],
    &["deploy", "logs_url"],
    &["logs"],
];

/// Canonical deploy outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKey {
    Succeeded,
    Failed,
    Started,
}

impl StatusKey {
    /// Classifies lower-cased status text.
    ///
    /// Success is tested before failure, so text mentioning both (for example
    /// `"success-after-fail"`) resolves to `Succeeded`. Anything unrecognized,
    /// including `"unknown"`, is `Started`.
    pub fn classify(status: &str) -> Self {
        if status == "succeeded" || status == "success" || status.contains("success") {
            StatusKey::Succeeded
        } else if status == "failed" || status.contains("fail") {
            StatusKey::Failed
        } else {
            StatusKey::Started
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKey::Succeeded => "succeeded",
            StatusKey::Failed => "failed",
            StatusKey::Started => "started",
        }
    }
}

impl std::fmt::Display for StatusKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical record extracted from a provider payload
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDeployEvent {
    pub service_name: String,
    pub commit: Option<String>,
    pub status_raw: String,
    pub status_key: StatusKey,
    pub logs_url: Option<String>,
}

impl NormalizedDeployEvent {
    /// Extracts the canonical record from an untyped payload.
    ///
    /// Never fails: missing, null or wrongly-typed fields fall back to their
    /// defaults.
    pub fn from_payload(payload: &Value) -> Self {
        let service_name =
            first_scalar(payload, SERVICE_NAME_PATHS).unwrap_or_else(|| UNKNOWN.to_string());
        let commit = first_scalar(payload, COMMIT_PATHS);
        let status_raw = first_scalar(payload, STATUS_PATHS)
            .unwrap_or_else(|| UNKNOWN.to_string())
            .to_lowercase();
        let logs_url = first_string(payload, LOGS_URL_PATHS);
        let status_key = StatusKey::classify(&status_raw);

        Self {
            service_name,
            commit,
            status_raw,
            status_key,
            logs_url,
        }
    }

    /// Record for a body that could not be parsed at all
    pub fn unknown() -> Self {
        Self::from_payload(&Value::Null)
    }
}

fn lookup<'a>(payload: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(payload, |node, key| node.as_object()?.get(*key))
}

/// First candidate holding a non-empty string or a number.
fn first_scalar(payload: &Value, paths: &[&[&str]]) -> Option<String> {
    paths.iter().find_map(|path| match lookup(payload, path)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// First candidate holding a non-empty string.
fn first_string(payload: &Value, paths: &[&[&str]]) -> Option<String> {
    paths.iter().find_map(|path| match lookup(payload, path)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    })
}
