mod app;
mod form;

use anyhow::{Context, Result};
use std::{
    env,
    fs::{self, OpenOptions},
};

use patio_core::{
    config::{self, AppConfig},
    ApiClient, AuthService, CustomerController, OperatorController, RouteGuard, SessionStore,
};
use tracing_subscriber::{prelude::*, EnvFilter};

const DEFAULT_START_PATH: &str = "/app";

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    tracing::info!(api_url = %config.api_url, "configuration loaded");

    let session = SessionStore::open(config.session_path.clone()).with_context(|| {
        format!("failed to open session file {}", config.session_path.display())
    })?;
    let api = ApiClient::from_config(&config, session.clone());
    let services = app::Services {
        guard: RouteGuard::new(session.clone()),
        auth: AuthService::new(api.clone()),
        customers: CustomerController::new(api.clone()),
        operators: OperatorController::new(api),
        session,
    };

    let start_path = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_START_PATH.to_string());
    let mut app = app::PatioApp::new(services, start_path);
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("patio.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(std::sync::Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
