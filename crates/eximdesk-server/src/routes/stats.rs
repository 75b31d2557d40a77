//! Registry stats route.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/stats", get(get_stats))
}

/// GET /api/stats — registry and embedding counters.
async fn get_stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let stats = state.store.get_stats().ok();

    Json(serde_json::json!({
        "codes": stats.as_ref().map(|s| s.codes).unwrap_or(0),
        "embeddings": stats.as_ref().map(|s| s.embeddings).unwrap_or(0),
        "embeddingDimension": state.config.embedding_dim,
        "embedderAvailable": state.embedder.is_available(),
        "dbSizeMb": stats.as_ref().map(|s| s.db_size_bytes as f64 / (1024.0 * 1024.0)).unwrap_or(0.0),
        "generatedAt": chrono::Utc::now().to_rfc3339(),
    }))
}
