//! Relay configuration: TOML file, then environment overrides

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::discord::DEFAULT_API_BASE;
use crate::error::{RelayError, Result};

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
pub const DEFAULT_RUNTIME_CONFIG_PATH: &str = "runtime_config.json";
pub const DEFAULT_LOG_FETCH_TIMEOUT_SECS: u64 = 5;

/// Substrings that mark a value as an unfilled template placeholder
const PLACEHOLDER_MARKERS: [&str; 5] = ["your_", "example", "replace", "xxx", "changeme"];

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct RelayConfig {
    pub bind_address: String,
    pub webhook_secret: Option<String>,
    pub log_channel: Option<String>,
    pub render_api_key: Option<String>,
    pub failure_role_id: Option<String>,
    pub silence_success: bool,
    pub log_fetch_timeout_secs: u64,
    pub runtime_config_path: PathBuf,
    pub log_dir: Option<PathBuf>,
    pub discord: DiscordConfig,
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct DiscordConfig {
    pub token: Option<String>,
    pub api_base: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            webhook_secret: None,
            log_channel: None,
            render_api_key: None,
            failure_role_id: None,
            silence_success: false,
            log_fetch_timeout_secs: DEFAULT_LOG_FETCH_TIMEOUT_SECS,
            runtime_config_path: PathBuf::from(DEFAULT_RUNTIME_CONFIG_PATH),
            log_dir: None,
            discord: DiscordConfig::default(),
        }
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

/// Returns true if the value is unset, empty, or still a template placeholder.
pub fn is_placeholder(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) if v.trim().is_empty() => true,
        Some(v) => {
            let lower = v.to_lowercase();
            PLACEHOLDER_MARKERS.iter().any(|m| lower.contains(m))
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl RelayConfig {
    /// Parses a TOML document.
    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Applies environment overrides through `lookup`, so callers can pass
    /// `std::env::var` or a fixed map in tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("RENDER_WEBHOOK_SECRET") {
            self.webhook_secret = non_empty(v);
        }
        if let Some(v) = lookup("LOG_CHANNEL") {
            self.log_channel = non_empty(v);
        }
        if let Some(v) = lookup("RENDER_API_KEY") {
            self.render_api_key = non_empty(v);
        }
        if let Some(v) = lookup("FAILURE_ROLE_ID") {
            self.failure_role_id = non_empty(v);
        }
        if let Some(v) = lookup("SILENCE_SUCCESS") {
            self.silence_success = v.trim().eq_ignore_ascii_case("true");
        }
        if let Some(v) = lookup("DISCORD_TOKEN") {
            self.discord.token = non_empty(v);
        }
        if let Some(v) = lookup("DISCORD_API_BASE").and_then(non_empty) {
            self.discord.api_base = v;
        }
        if let Some(v) = lookup("BIND_ADDRESS").and_then(non_empty) {
            self.bind_address = v;
        } else if let Some(port) = lookup("PORT").and_then(non_empty) {
            let port: u16 = port.parse().map_err(|_| {
                RelayError::ConfigError(format!("PORT must be a port number, got '{}'", port))
            })?;
            self.bind_address = format!("0.0.0.0:{}", port);
        }
        if let Some(v) = lookup("RELAY_LOG_DIR").and_then(non_empty) {
            self.log_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("RUNTIME_CONFIG_PATH").and_then(non_empty) {
            self.runtime_config_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("LOG_FETCH_TIMEOUT_SECS").and_then(non_empty) {
            self.log_fetch_timeout_secs = v.parse().map_err(|_| {
                RelayError::ConfigError(format!(
                    "LOG_FETCH_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                    v
                ))
            })?;
        }
        Ok(())
    }

    /// Names of required settings that are missing or placeholders.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let required = [
            ("webhook_secret", self.webhook_secret.as_deref()),
            ("log_channel", self.log_channel.as_deref()),
            ("discord.token", self.discord.token.as_deref()),
        ];
        required
            .into_iter()
            .filter(|(_, value)| is_placeholder(*value))
            .map(|(name, _)| name)
            .collect()
    }

    /// Fails when any required setting is missing.
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RelayError::ConfigError(format!(
                "Missing or placeholder settings: {}",
                missing.join(", ")
            )))
        }
    }
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| if v.is_some() { "<REDACTED>" } else { "<unset>" };
        f.debug_struct("RelayConfig")
            .field("bind_address", &self.bind_address)
            .field("webhook_secret", &redact(&self.webhook_secret))
            .field("log_channel", &self.log_channel)
            .field("render_api_key", &redact(&self.render_api_key))
            .field("failure_role_id", &self.failure_role_id)
            .field("silence_success", &self.silence_success)
            .field("log_fetch_timeout_secs", &self.log_fetch_timeout_secs)
            .field("runtime_config_path", &self.runtime_config_path)
            .field("log_dir", &self.log_dir)
            .field("discord_api_base", &self.discord.api_base)
            .field("discord_token", &redact(&self.discord.token))
            .finish()
    }
}

/// Loads the configuration file (if present) and applies environment
/// overrides from the process environment.
pub fn load_config(path: &Path) -> Result<RelayConfig> {
    let mut config = if path.exists() {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RelayError::ConfigError(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        RelayConfig::from_toml(&raw).map_err(|e| {
            RelayError::ConfigError(format!("Failed to parse config file '{}': {}", path.display(), e))
        })?
    } else {
        RelayConfig::default()
    };

    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}
