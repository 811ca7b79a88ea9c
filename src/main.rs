use render_discord_relay::api;
use render_discord_relay::config::load_config;
use render_discord_relay::discord::DiscordSink;
use render_discord_relay::logging::{FileLogger, setup_logging};
use render_discord_relay::{AppState, RelayConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{self, error, info};

const DEFAULT_CONFIG_PATH: &str = "relay_config.toml";

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let config_path = PathBuf::from(
        std::env::var("RELAY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
    );

    let config: RelayConfig = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Keep the guard alive so file logs are flushed on exit
    let file_logger = config.log_dir.clone().map(FileLogger::new);
    let _log_guard = match setup_logging(file_logger.as_ref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to set up logging: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        error!("{}", e);
        error!("Please update the configuration or .env file with real values before starting.");
        std::process::exit(1);
    }

    let token = config.discord.token.clone().unwrap_or_default();
    let sink = match DiscordSink::new(token, config.discord.api_base.clone()) {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            error!("Failed to build Discord client: {}", e);
            std::process::exit(1);
        }
    };

    let bind_address = config.bind_address.clone();
    let state = match AppState::new(config, sink) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to initialise relay: {}", e);
            std::process::exit(1);
        }
    };
    info!("Using config at {:?}", config_path);
    info!(config = ?state.config, "Loaded configuration");

    let app = api::router(state);

    let listener = match tokio::net::TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", bind_address, e);
            std::process::exit(1);
        }
    };
    info!("Listening on {}", bind_address);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
