mod analysis;
mod app;
mod cache;
mod config;
mod db;
mod domain;
mod infrastructure;
mod orchestrator;
mod page;
mod pipeline;
mod relay;
mod settings;
mod tasks;

use anyhow::Result;
use infrastructure::{directories, logging, shutdown};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_config()?;
    let paths = directories::ensure_directories(&config.directories)?;
    logging::init_tracing(&config, &paths)?;

    let shutdown = shutdown::Shutdown::new();
    shutdown::install_signal_handlers(shutdown.clone());

    let app = app::TrustLensApp::initialize(config, paths, shutdown).await?;
    app.run().await
}
