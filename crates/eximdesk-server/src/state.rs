//! Shared application state.

use std::sync::Arc;

use eximdesk_core::EximDeskConfig;
use eximdesk_infer::Embedder;
use eximdesk_store::SqliteStore;

/// Shared state accessible from all route handlers.
pub struct AppState {
    pub config: EximDeskConfig,
    pub store: Arc<SqliteStore>,
    pub embedder: Arc<dyn Embedder>,
}

impl AppState {
    pub fn new(config: EximDeskConfig, store: SqliteStore, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            config,
            store: Arc::new(store),
            embedder,
        }
    }
}
