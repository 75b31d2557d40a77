//! Import pipeline — decode → classify → parse → reconcile → batched
//! persist with embeddings, reporting progress on the event channel.
//!
//! One sequential flow per upload. Cancellation is cooperative: the event
//! channel closes when the client drops the stream, and the batch loop polls
//! that between batches.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::events::ImportEvent;
use eximdesk_infer::Embedder;
use eximdesk_ingest::{
    classify, decode_text, parse_mapping, parse_schedule, reconcile, DocKind, MergedRecord,
    SourceRecord,
};
use eximdesk_store::{CodeEmbedding, CodeRecord, NewCodeRecord, RegistryWriter, SqliteStore};

/// Records per storage round-trip. Bounds per-request latency on large
/// publications and keeps the embedding service from being flooded.
pub const UPSERT_BATCH: usize = 50;

/// One uploaded file payload.
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Run one full import. Emits exactly one terminal event on `events`.
pub async fn run_import(
    store: Arc<SqliteStore>,
    embedder: Arc<dyn Embedder>,
    expected_dim: usize,
    files: Vec<UploadedFile>,
    events: mpsc::Sender<ImportEvent>,
) {
    if files.is_empty() {
        let _ = events
            .send(ImportEvent::Error {
                message: "No files supplied".into(),
            })
            .await;
        return;
    }

    emit(&events, ImportEvent::log(format!("Importing {} file(s)", files.len()))).await;

    let mut mapping_map: HashMap<String, SourceRecord> = HashMap::new();
    let mut schedule_map: HashMap<String, SourceRecord> = HashMap::new();
    let mut seen_payloads: HashSet<String> = HashSet::new();

    for file in files {
        let UploadedFile { filename, bytes } = file;

        let digest = hex::encode(Sha256::digest(&bytes));
        if !seen_payloads.insert(digest) {
            emit(&events, ImportEvent::log(format!("Skipping duplicate file: {}", filename))).await;
            continue;
        }

        let name = filename.clone();
        let decoded = tokio::task::spawn_blocking(move || decode_text(&name, &bytes)).await;
        let text = match decoded {
            Ok(Ok(Some(text))) if !text.trim().is_empty() => text,
            Ok(Ok(_)) => {
                emit(
                    &events,
                    ImportEvent::log(format!("No text extracted from {}, skipping", filename)),
                )
                .await;
                continue;
            }
            Ok(Err(e)) => {
                emit(
                    &events,
                    ImportEvent::log(format!("Failed to decode {}: {}", filename, e)),
                )
                .await;
                continue;
            }
            Err(e) => {
                emit(
                    &events,
                    ImportEvent::log(format!("Failed to decode {}: {}", filename, e)),
                )
                .await;
                continue;
            }
        };

        match classify(&text) {
            DocKind::HsnMapping => {
                let records = parse_mapping(&text);
                emit(
                    &events,
                    ImportEvent::log(format!("{}: mapping document, {} entries", filename, records.len())),
                )
                .await;
                mapping_map.extend(records);
            }
            DocKind::RateSchedule => {
                let records = parse_schedule(&text);
                emit(
                    &events,
                    ImportEvent::log(format!("{}: rate schedule, {} entries", filename, records.len())),
                )
                .await;
                schedule_map.extend(records);
            }
            DocKind::Unrecognized => {
                emit(
                    &events,
                    ImportEvent::log(format!("{}: unrecognized document layout, skipping", filename)),
                )
                .await;
            }
        }
    }

    let merged = reconcile(mapping_map, schedule_map);
    if merged.is_empty() {
        let _ = events
            .send(ImportEvent::Done {
                count: 0,
                message: "No records extracted".into(),
            })
            .await;
        return;
    }
    emit(&events, ImportEvent::log(format!("Reconciled {} records", merged.len()))).await;

    let processed =
        persist_batches(store.as_ref(), embedder.as_ref(), expected_dim, &merged, &events).await;

    let _ = events
        .send(ImportEvent::Done {
            count: processed,
            message: format!("Imported {} of {} records", processed, merged.len()),
        })
        .await;
}

/// Persist merged records in fixed-size batches, embedding each batch's rows
/// after its upsert. A failed batch is logged and skipped; the loop carries
/// on. Returns the cumulative processed count.
pub async fn persist_batches(
    writer: &dyn RegistryWriter,
    embedder: &dyn Embedder,
    expected_dim: usize,
    merged: &[MergedRecord],
    events: &mpsc::Sender<ImportEvent>,
) -> usize {
    let total = merged.len();
    let mut processed = 0usize;

    for batch in merged.chunks(UPSERT_BATCH) {
        if events.is_closed() {
            info!("Import cancelled after {}/{} records", processed, total);
            break;
        }

        let rows: Vec<NewCodeRecord> = batch.iter().map(to_new_record).collect();
        match writer.upsert_codes(&rows) {
            Ok(persisted) => {
                let embeddings = embed_rows(embedder, expected_dim, &persisted);
                if !embeddings.is_empty() {
                    if let Err(e) = writer.upsert_embeddings(&embeddings) {
                        warn!("Embedding upsert failed: {}", e);
                        emit(
                            events,
                            ImportEvent::log(format!("Embedding upsert failed for one batch: {}", e)),
                        )
                        .await;
                    }
                }
                processed += batch.len();
            }
            Err(e) => {
                warn!("Batch upsert failed: {}", e);
                emit(
                    events,
                    ImportEvent::log(format!(
                        "Batch of {} records failed, skipping: {}",
                        batch.len(),
                        e
                    )),
                )
                .await;
            }
        }

        let percentage = (processed * 100 / total) as u32;
        emit(
            events,
            ImportEvent::Progress {
                total_processed: processed,
                total_records: total,
                percentage,
            },
        )
        .await;
    }

    processed
}

/// Generate embeddings for one batch's persisted rows. Rows with nothing to
/// embed are skipped; vectors of the wrong dimension are dropped with a
/// warning and never reach the upsert payload.
fn embed_rows(
    embedder: &dyn Embedder,
    expected_dim: usize,
    rows: &[CodeRecord],
) -> Vec<CodeEmbedding> {
    let mut out = Vec::new();
    for row in rows {
        let input = row.embedding_input();
        if input.is_empty() {
            continue;
        }
        match embedder.generate(&input) {
            Some(vector) if vector.len() == expected_dim => out.push(CodeEmbedding {
                code_id: row.id,
                vector,
            }),
            Some(vector) => warn!(
                "Dropping embedding for {}: dimension {} != {}",
                row.hsn_code,
                vector.len(),
                expected_dim
            ),
            None => {
                if embedder.is_available() {
                    warn!("Embedding generation failed for {}", row.hsn_code);
                }
            }
        }
    }
    out
}

fn to_new_record(rec: &MergedRecord) -> NewCodeRecord {
    NewCodeRecord {
        hsn_code: rec.hsn_code.clone(),
        heading_code: rec.heading_code.clone(),
        chapter: rec.chapter.clone(),
        commodity: rec.commodity.clone(),
        description: rec.description.clone(),
        goods_description: rec.goods_description.clone(),
        gst_rate: rec.gst_rate,
        source: rec.source,
    }
}

async fn emit(events: &mpsc::Sender<ImportEvent>, event: ImportEvent) {
    let _ = events.send(event).await;
}
