//! Statline HTTP server
//!
//! Serves stats queries and filter metadata over a directory of Parquet
//! source tables.

use anyhow::Context;
use statline_duck::DuckCatalog;
use statline_engine::EngineHandle;
use statline_registry::DatasetRegistry;
use std::sync::Arc;
use tracing::info;

mod config;
mod logging;
mod routes;

use config::Config;
use routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config_path = std::env::var("STATLINE_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path))?;
    config.apply_logging_env();
    logging::init();

    let catalog = Arc::new(DuckCatalog::new(&config.data.dir));
    let registry = Arc::new(DatasetRegistry::default());
    info!(
        data_dir = %catalog.data_dir().display(),
        registry_version = registry.version(),
        "Opened table catalog"
    );

    let state = AppState {
        handle: Arc::new(EngineHandle::new(catalog, registry)),
    };
    let app = routes::router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Statline server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
