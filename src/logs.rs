//! Bounded retrieval of remote build/deploy logs

use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum number of characters of log text kept in an excerpt. Leaves room
/// under Discord's 2000-character message limit for code fences and the
/// mention prefix.
pub const MAX_EXCERPT_CHARS: usize = 1900;

/// Appended to an excerpt whose source was longer than the cap.
pub const TRUNCATION_MARKER: &str = "\n\n...(logs truncated)";

/// Text used when the event carries no logs URL.
pub const NO_LOGS_URL: &str = "No logs URL provided.";

/// A size-bounded prefix of log text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogExcerpt {
    pub text: String,
    pub truncated: bool,
}

impl LogExcerpt {
    /// Keeps at most [`MAX_EXCERPT_CHARS`] characters of `body`.
    pub fn from_body(body: &str) -> Self {
        match body.char_indices().nth(MAX_EXCERPT_CHARS) {
            Some((cut, _)) => Self {
                text: body[..cut].to_string(),
                truncated: true,
            },
            None => Self {
                text: body.to_string(),
                truncated: false,
            },
        }
    }

    /// Excerpt text with the truncation marker when anything was cut.
    pub fn render(&self) -> String {
        if self.truncated {
            format!("{}{}", self.text, TRUNCATION_MARKER)
        } else {
            self.text.clone()
        }
    }
}

/// Why logs could not be retrieved. The `Display` output doubles as the
/// text shown in place of the logs.
#[derive(Debug, thiserror::Error)]
pub enum LogFetchError {
    #[error("Failed to fetch logs (status {0})")]
    Status(u16),

    #[error("Error fetching logs: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Outcome of the log fetch step. None of these abort the request.
#[derive(Debug)]
pub enum LogFetch {
    /// The event had no logs URL
    NoUrl,
    Excerpt(LogExcerpt),
    /// Fetch failed; the diagnostic replaces the log text
    Unavailable(LogFetchError),
}

impl LogFetch {
    /// Text to embed in the notification body.
    pub fn display_text(&self) -> String {
        match self {
            LogFetch::NoUrl => NO_LOGS_URL.to_string(),
            LogFetch::Excerpt(excerpt) => excerpt.render(),
            LogFetch::Unavailable(err) => err.to_string(),
        }
    }
}

/// Fetches log excerpts over HTTP, optionally with a bearer token
#[derive(Clone)]
pub struct LogFetcher {
    client: Client,
    auth_token: Option<String>,
}

impl LogFetcher {
    pub fn new(timeout: Duration, auth_token: Option<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, auth_token))
    }

    pub fn with_client(client: Client, auth_token: Option<String>) -> Self {
        Self {
            client,
            auth_token: auth_token.filter(|t| !t.is_empty()),
        }
    }

    /// Retrieves the first [`MAX_EXCERPT_CHARS`] characters of the log at `url`.
    pub async fn fetch_excerpt(&self, url: Option<&str>) -> LogFetch {
        let Some(url) = url else {
            return LogFetch::NoUrl;
        };

        match self.get_text(url).await {
            Ok(body) => {
                let excerpt = LogExcerpt::from_body(&body);
                debug!(
                    "Fetched {} chars of logs (truncated: {})",
                    excerpt.text.chars().count(),
                    excerpt.truncated
                );
                LogFetch::Excerpt(excerpt)
            }
            Err(e) => {
                warn!("Could not fetch logs: {}", e);
                LogFetch::Unavailable(e)
            }
        }
    }

    async fn get_text(&self, url: &str) -> Result<String, LogFetchError> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LogFetchError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}
