//! Where deploy notifications go, with an operator-settable override

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::Result;

/// Where a destination id came from
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DestinationSource {
    Static,
    Runtime,
}

/// Channel a notification is delivered to
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DestinationHandle {
    pub channel_id: String,
    pub source: DestinationSource,
}

/// On-disk shape of the runtime override file
#[derive(Debug, Default, Serialize, Deserialize)]
struct RuntimeOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    log_channel: Option<String>,
}

/// Static destination from configuration plus an optional runtime override
/// that survives restarts when a path is configured.
pub struct DestinationStore {
    default_channel: Option<String>,
    runtime_channel: RwLock<Option<String>>,
    runtime_path: Option<PathBuf>,
}

impl DestinationStore {
    pub fn new(default_channel: Option<String>) -> Self {
        Self {
            default_channel: default_channel.filter(|c| !c.is_empty()),
            runtime_channel: RwLock::new(None),
            runtime_path: None,
        }
    }

    /// Builds the store and picks up a previously persisted override.
    /// An unreadable override file is logged and ignored.
    pub fn load(default_channel: Option<String>, runtime_path: impl Into<PathBuf>) -> Self {
        let runtime_path = runtime_path.into();
        let runtime_channel = match read_overrides(&runtime_path) {
            Ok(overrides) => overrides.log_channel.filter(|c| !c.is_empty()),
            Err(e) => {
                warn!(
                    "Ignoring runtime config at {:?}: {}",
                    runtime_path, e
                );
                None
            }
        };
        if let Some(channel) = &runtime_channel {
            info!("Using runtime log channel override {}", channel);
        }

        Self {
            default_channel: default_channel.filter(|c| !c.is_empty()),
            runtime_channel: RwLock::new(runtime_channel),
            runtime_path: Some(runtime_path),
        }
    }

    /// Current destination; the runtime override wins over the static one.
    pub async fn resolve(&self) -> Option<DestinationHandle> {
        if let Some(channel) = self.runtime_channel.read().await.as_ref() {
            return Some(DestinationHandle {
                channel_id: channel.clone(),
                source: DestinationSource::Runtime,
            });
        }
        self.default_channel
            .as_ref()
            .map(|channel| DestinationHandle {
                channel_id: channel.clone(),
                source: DestinationSource::Static,
            })
    }

    /// Sets (or clears, with `None`) the runtime override and persists it.
    pub async fn set_override(&self, channel: Option<String>) -> Result<()> {
        let mut guard = self.runtime_channel.write().await;

        if let Some(path) = &self.runtime_path {
            let overrides = RuntimeOverrides {
                log_channel: channel.clone(),
            };
            let json = serde_json::to_string_pretty(&overrides)?;
            tokio::fs::write(path, json).await?;
        }

        // Dereference guard to overwrite the inner value
        *guard = channel;
        Ok(())
    }
}

fn read_overrides(path: &Path) -> Result<RuntimeOverrides> {
    if !path.exists() {
        return Ok(RuntimeOverrides::default());
    }
    let raw = std::fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(RuntimeOverrides::default());
    }
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_channel_is_used_without_override() {
        let store = DestinationStore::new(Some("111".to_string()));
        let handle = store.resolve().await.unwrap();
        assert_eq!(handle.channel_id, "111");
        assert_eq!(handle.source, DestinationSource::Static);
    }

    #[tokio::test]
    async fn nothing_configured_resolves_to_none() {
        assert_eq!(DestinationStore::new(None).resolve().await, None);
        assert_eq!(DestinationStore::new(Some(String::new())).resolve().await, None);
    }

    #[tokio::test]
    async fn override_wins_and_can_be_cleared() {
        let store = DestinationStore::new(Some("111".to_string()));
        store.set_override(Some("222".to_string())).await.unwrap();
        let handle = store.resolve().await.unwrap();
        assert_eq!(handle.channel_id, "222");
        assert_eq!(handle.source, DestinationSource::Runtime);

        store.set_override(None).await.unwrap();
        assert_eq!(store.resolve().await.unwrap().channel_id, "111");
    }

    #[tokio::test]
    async fn override_is_persisted_across_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runtime_config.json");

        let store = DestinationStore::load(Some("111".to_string()), &path);
        assert_eq!(store.resolve().await.unwrap().channel_id, "111");
        store.set_override(Some("333".to_string())).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"log_channel\": \"333\""));

        let reloaded = DestinationStore::load(Some("111".to_string()), &path);
        let handle = reloaded.resolve().await.unwrap();
        assert_eq!(handle.channel_id, "333");
        assert_eq!(handle.source, DestinationSource::Runtime);
    }

    #[tokio::test]
    async fn corrupt_override_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runtime_config.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = DestinationStore::load(Some("111".to_string()), &path);
        assert_eq!(store.resolve().await.unwrap().channel_id, "111");
    }
}
