//! Registry routes — streaming import, listing, search, bulk clear.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Multipart, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::events::{ImportEvent, KEEP_ALIVE_LINE};
use crate::pipeline::{self, UploadedFile};
use crate::state::AppState;

/// Seconds between keep-alive lines while the pipeline is between events.
const KEEP_ALIVE_SECS: u64 = 5;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/registry/import", post(import_files))
        .route("/registry/codes", get(list_codes).delete(clear_registry))
        .route("/registry/search", get(search_codes))
}

/// POST /api/registry/import — multipart upload of publication files.
///
/// Responds with a newline-delimited JSON progress stream (`log`,
/// `progress`, then exactly one `done` or `error`). Readers must buffer to
/// newlines, discard lines starting with ':' (keep-alives), and ignore any
/// line that fails to parse. Aborting the request cancels the import between
/// batches.
async fn import_files(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let mut files = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let Some(filename) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };
        match field.bytes().await {
            Ok(bytes) => files.push(UploadedFile {
                filename,
                bytes: bytes.to_vec(),
            }),
            Err(e) => error!("Failed to read multipart field {}: {}", filename, e),
        }
    }

    let (tx, rx) = mpsc::channel(64);
    let store = state.store.clone();
    let embedder = state.embedder.clone();
    let expected_dim = state.config.embedding_dim;
    tokio::spawn(async move {
        pipeline::run_import(store, embedder, expected_dim, files, tx).await;
    });

    stream_response(rx)
}

/// Drain the event channel into an NDJSON body, interleaving keep-alives.
/// The body stream ends after the run's terminal event; dropping it (client
/// abort) closes the channel, which the pipeline polls between batches.
fn stream_response(mut rx: mpsc::Receiver<ImportEvent>) -> Response {
    let keep_alive_after = Duration::from_secs(KEEP_ALIVE_SECS);
    let stream = async_stream::stream! {
        loop {
            match tokio::time::timeout(keep_alive_after, rx.recv()).await {
                Ok(Some(event)) => {
                    let terminal = event.is_terminal();
                    match serde_json::to_string(&event) {
                        Ok(json) => yield Ok::<_, Infallible>(Bytes::from(format!("{}\n", json))),
                        Err(e) => error!("Failed to encode import event: {}", e),
                    }
                    if terminal {
                        break;
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    yield Ok(Bytes::from(format!("{}\n", KEEP_ALIVE_LINE)));
                }
            }
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(stream))
        .unwrap_or_else(|e| {
            error!("Failed to build stream response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default = "default_page")]
    page: usize,
    #[serde(default = "default_page_size", rename = "pageSize")]
    page_size: usize,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    50
}

/// GET /api/registry/codes — page through the registry in code order.
async fn list_codes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    match state.store.get_codes_paginated(query.page, query.page_size) {
        Ok((codes, total)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "codes": codes,
                "total": total,
                "page": query.page,
                "pageSize": query.page_size,
            })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}

/// DELETE /api/registry/codes — clear all records and embeddings.
async fn clear_registry(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.clear_registry() {
        Ok(cleared) => (
            StatusCode::OK,
            Json(serde_json::json!({ "cleared": cleared })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}

#[derive(Deserialize)]
struct SearchQuery {
    q: String,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    20
}

/// GET /api/registry/search — semantic search when the embedder is loaded,
/// keyword LIKE fallback otherwise.
async fn search_codes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    if state.embedder.is_available() {
        if let Some(vector) = state.embedder.generate(&query.q) {
            match state.store.vector_search(&vector, query.limit) {
                Ok(hits) => {
                    return (
                        StatusCode::OK,
                        Json(serde_json::json!({ "hits": hits, "mode": "semantic" })),
                    );
                }
                Err(e) => warn!("Vector search failed, falling back to keyword: {}", e),
            }
        }
    }

    match state.store.keyword_search(&query.q, query.limit) {
        Ok(hits) => (
            StatusCode::OK,
            Json(serde_json::json!({ "hits": hits, "mode": "keyword" })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}
