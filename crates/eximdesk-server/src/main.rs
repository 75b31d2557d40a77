//! EximDesk registry ingestion server.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod events;
mod pipeline;
mod routes;
mod state;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("EXIMDESK_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = eximdesk_core::EximDeskConfig::from_env(&data_dir)?;
    let port = config.port;

    let store =
        eximdesk_store::SqliteStore::open(&config.data_paths.registry, config.embedding_dim)
            .map_err(|e| anyhow::anyhow!("Failed to open registry store: {}", e))?;

    let embedder = eximdesk_infer::create_embedder(&config.data_paths.models);

    let state = Arc::new(AppState::new(config, store, embedder));

    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("EximDesk registry server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
