mod handlers;

use axum::{Router, routing};
use chrono::Utc;
use deployer::error::DeployError;
use deployer::{AppState, DeployerConfig};
use handlers::{handle_webhook, root, status};
use std::fs;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{self, info};

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8888";
const DEFAULT_CONFIG_PATH: &str = "deployer_config.toml";

/// Load and parse the configuration file
fn load_config(path: &str) -> Result<DeployerConfig, DeployError> {
    let config_str = fs::read_to_string(path).map_err(|e| {
        DeployError::Config(format!("Failed to read config file '{}': {}", path, e))
    })?;

    let config: DeployerConfig = toml::from_str(&config_str).map_err(|e| {
        DeployError::Config(format!("Failed to parse config file '{}': {}", path, e))
    })?;

    Ok(config)
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string());
    let config_path =
        std::env::var("DEPLOYER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config: DeployerConfig = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState {
        run_lock: Mutex::new(()),
        config,
        start_time: Instant::now(),
        started_at: Utc::now(),
    });

    tracing_subscriber::fmt::init();
    let app = Router::new()
        .route("/", routing::get(root))
        .route("/status", routing::get(status))
        .route("/webhook/{provider}", routing::post(handle_webhook))
        .with_state(state);

    info!("Listening on {}", bind_address);
    info!("Using config at {:?}", config_path);
    let listener = tokio::net::TcpListener::bind(bind_address).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
