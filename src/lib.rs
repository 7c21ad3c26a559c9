pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod presets;
pub mod server;
pub mod settings;
pub mod stats;
pub mod timer;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use db::Database;
pub use error::{PomodoroError, PomodoroResult};
pub use server::{router, AppState};

/// Opens the database named by `config` and builds the router around it.
pub fn build_app(config: Config, clock: Arc<dyn Clock>) -> Result<axum::Router> {
    let database = Database::new(config.db_path.clone())?;
    Ok(router(AppState::new(database, clock, config)))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

pub async fn run() -> Result<()> {
    // Optional .env next to the binary; real environment variables win.
    dotenvy::dotenv().ok();

    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    info!("Pomodoro server starting up...");

    let config = Config::from_env()?;
    let bind = config.bind;
    let app = build_app(config, Arc::new(SystemClock))?;

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!("Listening on {bind}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Pomodoro server stopped");
    Ok(())
}
