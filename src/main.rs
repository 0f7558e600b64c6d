#![allow(non_snake_case)]

use std::env;
use std::process;

use clap::Parser;
use scheduleBot::cli::Cli;
use scheduleBot::config::{AppConfig, Settings};
use scheduleBot::db::BlobStore;
use scheduleBot::error::RunError;
use scheduleBot::runtime;
use scheduleBot::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if let Err(err) = start(cli).await {
        tracing::error!(error = %err, "scheduleBot exited with an error");
        process::exit(1);
    }
}

async fn start(cli: Cli) -> Result<(), RunError> {
    let config = match cli.config.as_deref() {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    let get_prop = |key: &str| -> Option<String> { config.get(key).or_else(|| env::var(key).ok()) };

    let mut settings = Settings::resolve(get_prop)?;
    if let Some(mode) = cli.run_mode() {
        settings.run_mode = mode;
    }
    tracing::info!(
        mode = %settings.run_mode,
        data_dir = %settings.data_dir.display(),
        timezone = %settings.timezone,
        "configuration loaded"
    );

    let store = BlobStore::new(settings.data_dir.clone());
    let state = AppState::load(store, settings.timezone)?;
    runtime::run(settings, state).await
}
