pub mod api;
pub mod config;
pub mod destination;
pub mod discord;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod logs;
pub mod notification;
pub mod signature;
pub mod webhook;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use config::RelayConfig;
use destination::DestinationStore;
use dispatch::{Dispatcher, NotificationSink};
use error::Result;
use logs::LogFetcher;

pub struct AppState {
    pub config: RelayConfig,
    pub dispatcher: Dispatcher,
    pub log_fetcher: LogFetcher,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Wires the pipeline around an already-connected notification sink.
    /// Any persisted destination override is picked up here.
    pub fn new(config: RelayConfig, sink: Arc<dyn NotificationSink>) -> Result<Self> {
        let destinations =
            DestinationStore::load(config.log_channel.clone(), config.runtime_config_path.clone());
        let log_fetcher = LogFetcher::new(
            Duration::from_secs(config.log_fetch_timeout_secs),
            config.render_api_key.clone(),
        )?;

        Ok(Self {
            dispatcher: Dispatcher::new(sink, destinations),
            log_fetcher,
            config,
            start_time: Instant::now(),
            started_at: Utc::now(),
        })
    }
}

pub type SharedState = Arc<AppState>;
