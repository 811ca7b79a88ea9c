//! Discord REST API notification sink

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use crate::destination::DestinationHandle;
use crate::dispatch::{NotificationSink, SinkError};
use crate::notification::Notification;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts notifications as embeds through one shared, authenticated client.
pub struct DiscordSink {
    client: Client,
    api_base: String,
    token: String,
}

impl DiscordSink {
    pub fn new(token: impl Into<String>, api_base: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!(
                "DiscordBot (",
                env!("CARGO_PKG_NAME"),
                ", ",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn channel_url(&self, channel_id: &str) -> String {
        format!("{}/channels/{}", self.api_base, channel_id)
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.token)
    }
}

/// Discord message payload for a notification
pub fn message_body(notification: &Notification) -> Value {
    let fields: Vec<Value> = notification
        .fields
        .iter()
        .map(|f| json!({"name": f.name, "value": f.value, "inline": f.inline}))
        .collect();

    let mut embed = json!({
        "title": notification.title,
        "color": notification.color,
        "fields": fields,
        "timestamp": notification.timestamp.to_rfc3339(),
        "footer": {"text": notification.footer},
    });
    if let Some(url) = &notification.url {
        embed["url"] = json!(url);
    }

    let mut body = json!({ "embeds": [embed] });
    if let Some(content) = notification.content() {
        body["content"] = json!(content);
    }
    body
}

async fn ensure_success(response: Response) -> Result<(), SinkError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(SinkError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl NotificationSink for DiscordSink {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn resolve(&self, destination: &DestinationHandle) -> Result<(), SinkError> {
        let response = self
            .client
            .get(self.channel_url(&destination.channel_id))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await?;
        ensure_success(response).await
    }

    async fn deliver(
        &self,
        destination: &DestinationHandle,
        notification: &Notification,
    ) -> Result<(), SinkError> {
        let body = message_body(notification);
        debug!("Posting to channel {}", destination.channel_id);

        let response = self
            .client
            .post(format!("{}/messages", self.channel_url(&destination.channel_id)))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&body)
            .send()
            .await?;
        ensure_success(response).await
    }
}

impl std::fmt::Debug for DiscordSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordSink")
            .field("api_base", &self.api_base)
            .field("token", &"<REDACTED>")
            .finish()
    }
}
