mod app;

use std::{
    fs::{self, OpenOptions},
    path::Path,
    sync::Mutex,
};

use anyhow::{Context, Result};
use gameshelf_core::{
    config::{self, AppConfig},
    Catalog, Store,
};
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    init_logging(&config.log_dir);
    info!(data_file = %config.data_file.display(), "starting GameShelf");

    let catalog = Catalog::open(Store::new(config.data_file.clone()));
    let mut app = app::GameShelfApp::new(catalog);
    app.run().await
}

fn init_logging(log_dir: &Path) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match open_log_file(log_dir) {
        Ok(file) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .compact()
                .with_writer(Mutex::new(file));
            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .init();
        }
        Err(err) => {
            let stderr_layer = tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact()
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .init();
            warn!("logging to stderr: {err:#}");
        }
    }
}

fn open_log_file(log_dir: &Path) -> Result<fs::File> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;
    let log_path = log_dir.join("gameshelf.log");
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))
}
