//! Display-ready deploy notifications

use chrono::{DateTime, Utc};

use crate::webhook::{NormalizedDeployEvent, StatusKey, UNKNOWN};

pub const FOOTER_TEXT: &str = "Render Deploy Notification";

/// Number of commit characters shown in the Commit field.
const SHORT_COMMIT_LEN: usize = 12;

pub const COLOR_SUCCEEDED: u32 = 0x2ecc71;
pub const COLOR_FAILED: u32 = 0xe74c3c;
pub const COLOR_STARTED: u32 = 0xf1c40f;

impl StatusKey {
    pub fn glyph(&self) -> &'static str {
        match self {
            StatusKey::Succeeded => "✅",
            StatusKey::Failed => "❌",
            StatusKey::Started => "⚡",
        }
    }

    pub fn color(&self) -> u32 {
        match self {
            StatusKey::Succeeded => COLOR_SUCCEEDED,
            StatusKey::Failed => COLOR_FAILED,
            StatusKey::Started => COLOR_STARTED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// A composed notification, independent of any chat platform
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub color: u32,
    pub fields: Vec<NotificationField>,
    pub timestamp: DateTime<Utc>,
    pub footer: String,
    pub url: Option<String>,
    pub mention_prefix: Option<String>,
    pub body_text: Option<String>,
}

impl Notification {
    /// Plain message content: mention prefix followed by the body text.
    /// `None` when there is nothing to say outside the structured part.
    pub fn content(&self) -> Option<String> {
        let mut content = String::new();
        if let Some(mention) = &self.mention_prefix {
            content.push_str(mention);
        }
        if let Some(body) = &self.body_text {
            content.push_str(body);
        }
        if content.is_empty() { None } else { Some(content) }
    }
}

/// Builds the notification for a deploy event.
///
/// `log_text` is whatever the log fetch step produced (excerpt, placeholder
/// or diagnostic). `escalation_role` is only used for failures.
pub fn compose(
    event: &NormalizedDeployEvent,
    log_text: &str,
    escalation_role: Option<&str>,
) -> Notification {
    let status_key = event.status_key;

    let commit_value = match &event.commit {
        Some(commit) => format!(
            "`{}`",
            commit.chars().take(SHORT_COMMIT_LEN).collect::<String>()
        ),
        None => UNKNOWN.to_string(),
    };
    let status_value = if event.status_raw.is_empty() {
        UNKNOWN.to_string()
    } else {
        event.status_raw.clone()
    };

    let mention_prefix = match (status_key, escalation_role) {
        (StatusKey::Failed, Some(role)) if !role.is_empty() => Some(format!("<@&{}> ", role)),
        _ => None,
    };

    let body_text = if log_text.is_empty() {
        None
    } else {
        Some(format!("\n\n```\n{}\n```", log_text))
    };

    Notification {
        title: format!(
            "{} {} — {}",
            status_key.glyph(),
            event.service_name,
            status_key.as_str().to_uppercase()
        ),
        color: status_key.color(),
        fields: vec![
            NotificationField {
                name: "Commit".to_string(),
                value: commit_value,
                inline: true,
            },
            NotificationField {
                name: "Status".to_string(),
                value: status_value,
                inline: true,
            },
        ],
        timestamp: Utc::now(),
        footer: FOOTER_TEXT.to_string(),
        url: event.logs_url.clone(),
        mention_prefix,
        body_text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(payload: serde_json::Value) -> NormalizedDeployEvent {
        NormalizedDeployEvent::from_payload(&payload)
    }

    #[test]
    fn success_notification() {
        let ev = event(json!({"service": "web", "commit": "deadbeef1234567", "status": "succeeded"}));
        let n = compose(&ev, "No logs URL provided.", Some("999"));

        assert_eq!(n.title, "✅ web — SUCCEEDED");
        assert_eq!(n.color, COLOR_SUCCEEDED);
        assert_eq!(n.fields[0].name, "Commit");
        assert_eq!(n.fields[0].value, "`deadbeef1234`");
        assert!(n.fields[0].inline);
        assert_eq!(n.fields[1].name, "Status");
        assert_eq!(n.fields[1].value, "succeeded");
        assert_eq!(n.footer, FOOTER_TEXT);
        assert_eq!(n.url, None);
        assert_eq!(n.mention_prefix, None);
        assert_eq!(
            n.body_text.as_deref(),
            Some("\n\n```\nNo logs URL provided.\n```")
        );
    }

    #[test]
    fn failures_page_the_escalation_role() {
        let ev = event(json!({"service": "web", "status": "failed", "logs_url": "https://logs"}));
        let n = compose(&ev, "boom", Some("1234"));

        assert_eq!(n.title, "❌ web — FAILED");
        assert_eq!(n.color, COLOR_FAILED);
        assert_eq!(n.url.as_deref(), Some("https://logs"));
        assert_eq!(n.mention_prefix.as_deref(), Some("<@&1234> "));
        assert_eq!(
            n.content().as_deref(),
            Some("<@&1234> \n\n```\nboom\n```")
        );
    }

    #[test]
    fn failures_without_escalation_target_do_not_mention() {
        let ev = event(json!({"status": "failed"}));
        assert_eq!(compose(&ev, "x", None).mention_prefix, None);
        assert_eq!(compose(&ev, "x", Some("")).mention_prefix, None);
    }

    #[test]
    fn started_events_use_defaults() {
        let n = compose(&event(json!({})), "", Some("1234"));
        assert_eq!(n.title, "⚡ unknown — STARTED");
        assert_eq!(n.color, COLOR_STARTED);
        assert_eq!(n.fields[0].value, "unknown");
        assert_eq!(n.fields[1].value, "unknown");
        assert_eq!(n.mention_prefix, None);
        assert_eq!(n.body_text, None);
        assert_eq!(n.content(), None);
    }

    #[test]
    fn short_commits_are_not_padded() {
        let n = compose(&event(json!({"sha": "abc"})), "", None);
        assert_eq!(n.fields[0].value, "`abc`");
    }
}
