//! SQLite-backed registry store.
//!
//! One writer at a time behind a connection mutex; batched upserts run in a
//! single transaction each. Embedding vectors are stored uint8-quantized and
//! dequantized on read for cosine scoring.

use std::path::{Path, PathBuf};

use ndarray::Array1;
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use tracing::info;

use crate::embedding::QuantizedVec;
use crate::schema::SCHEMA_SQL;
use crate::types::*;
use crate::RegistryWriter;
use eximdesk_core::{Error, Result, Source};

const CODE_COLUMNS: &str = "id, hsn_code, heading_code, chapter, commodity, description, \
     goods_description, gst_rate, source, created_at, updated_at";

const UPSERT_CODE_SQL: &str = "INSERT INTO hsn_codes \
     (hsn_code, heading_code, chapter, commodity, description, goods_description, \
      gst_rate, source, created_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
     ON CONFLICT (hsn_code, heading_code) DO UPDATE SET \
        chapter = excluded.chapter, \
        commodity = excluded.commodity, \
        description = excluded.description, \
        goods_description = excluded.goods_description, \
        gst_rate = excluded.gst_rate, \
        source = excluded.source, \
        updated_at = excluded.created_at \
     RETURNING id, hsn_code, heading_code, chapter, commodity, description, \
        goods_description, gst_rate, source, created_at, updated_at";

const UPSERT_EMBEDDING_SQL: &str = "INSERT INTO code_embeddings \
     (code_id, embedding, scale, offset_val) VALUES (?1, ?2, ?3, ?4) \
     ON CONFLICT (code_id) DO UPDATE SET \
        embedding = excluded.embedding, \
        scale = excluded.scale, \
        offset_val = excluded.offset_val";

/// SQLite registry store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    embedding_dim: usize,
}

impl SqliteStore {
    /// Open or create the registry store.
    ///
    /// `db_dir` is the directory (e.g. `data/registry/`); the file will be
    /// `db_dir/registry.db`.
    pub fn open(db_dir: impl AsRef<Path>, embedding_dim: usize) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("registry.db");

        let conn = Self::create_connection(&db_path)?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
            embedding_dim,
        };

        let codes = store.count_codes()?;
        let embeddings = store.count_embeddings()?;
        info!(
            "Registry store initialized: {} codes, {} embeddings, dim={}, path={}",
            codes,
            embeddings,
            embedding_dim,
            store.db_path.display()
        );

        Ok(store)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(conn)
    }

    // ---------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------

    /// Upsert a batch of records in one transaction, keyed by
    /// `(hsn_code, heading_code)`. Existing rows are updated in place;
    /// returns the persisted rows in batch order.
    pub fn upsert_codes(&self, batch: &[NewCodeRecord]) -> Result<Vec<CodeRecord>> {
        let now = now_millis();
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut persisted = Vec::with_capacity(batch.len());
        {
            let mut stmt = tx
                .prepare_cached(UPSERT_CODE_SQL)
                .map_err(|e| Error::Database(e.to_string()))?;
            for rec in batch {
                let row = stmt
                    .query_row(
                        params![
                            rec.hsn_code,
                            rec.heading_code,
                            rec.chapter,
                            rec.commodity,
                            rec.description,
                            rec.goods_description,
                            rec.gst_rate,
                            rec.source.as_str(),
                            now,
                        ],
                        Self::row_to_code,
                    )
                    .map_err(|e| Error::Database(e.to_string()))?;
                persisted.push(row);
            }
        }
        tx.commit().map_err(|e| Error::Database(e.to_string()))?;
        Ok(persisted)
    }

    /// Upsert embedding vectors keyed by record id, one transaction.
    pub fn upsert_embeddings(&self, rows: &[CodeEmbedding]) -> Result<()> {
        for row in rows {
            if row.vector.len() != self.embedding_dim {
                return Err(Error::Storage(format!(
                    "embedding for record {} has dimension {}, expected {}",
                    row.code_id,
                    row.vector.len(),
                    self.embedding_dim
                )));
            }
        }

        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(e.to_string()))?;
        {
            let mut stmt = tx
                .prepare_cached(UPSERT_EMBEDDING_SQL)
                .map_err(|e| Error::Database(e.to_string()))?;
            for row in rows {
                let quantized = QuantizedVec::encode(&row.vector);
                stmt.execute(params![
                    row.code_id,
                    quantized.bytes,
                    quantized.scale,
                    quantized.offset
                ])
                .map_err(|e| Error::Database(e.to_string()))?;
            }
        }
        tx.commit().map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete every record and embedding. Returns the removed record count.
    pub fn clear_registry(&self) -> Result<usize> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM code_embeddings", [])
            .map_err(|e| Error::Database(e.to_string()))?;
        let removed = conn
            .execute("DELETE FROM hsn_codes", [])
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(removed)
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    pub fn count_codes(&self) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM hsn_codes", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub fn count_embeddings(&self) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM code_embeddings", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))
    }

    /// Page through the registry in code order. Returns (rows, total).
    pub fn get_codes_paginated(
        &self,
        page: usize,
        page_size: usize,
    ) -> Result<(Vec<CodeRecord>, i64)> {
        let total = self.count_codes()?;
        let offset = page.saturating_sub(1) * page_size;

        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM hsn_codes ORDER BY hsn_code, heading_code LIMIT ?1 OFFSET ?2",
            CODE_COLUMNS
        );
        let mut stmt = conn
            .prepare_cached(&sql)
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![page_size as i64, offset as i64], Self::row_to_code)
            .map_err(|e| Error::Database(e.to_string()))?;

        let codes: Vec<CodeRecord> = rows.filter_map(|r| r.ok()).collect();
        Ok((codes, total))
    }

    /// LIKE search over code, commodity and description text.
    pub fn keyword_search(&self, query: &str, limit: usize) -> Result<Vec<CodeRecord>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM hsn_codes \
             WHERE hsn_code LIKE ?1 || '%' \
                OR commodity LIKE '%' || ?1 || '%' \
                OR description LIKE '%' || ?1 || '%' \
                OR goods_description LIKE '%' || ?1 || '%' \
             ORDER BY hsn_code LIMIT ?2",
            CODE_COLUMNS
        );
        let mut stmt = conn
            .prepare_cached(&sql)
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![query, limit as i64], Self::row_to_code)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Cosine-score every stored vector against the query, best first.
    pub fn vector_search(&self, query: &Array1<f32>, limit: usize) -> Result<Vec<ScoredCode>> {
        if query.len() != self.embedding_dim {
            return Err(Error::Search(format!(
                "query dimension {} != {}",
                query.len(),
                self.embedding_dim
            )));
        }
        let query_norm = query.dot(query).sqrt();
        if query_norm < 1e-9 {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {}, e.embedding, e.scale, e.offset_val \
             FROM hsn_codes JOIN code_embeddings e ON e.code_id = hsn_codes.id",
            CODE_COLUMNS
        );
        let mut stmt = conn
            .prepare_cached(&sql)
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                let record = Self::row_to_code(row)?;
                let bytes: Vec<u8> = row.get(11)?;
                let scale: f32 = row.get(12)?;
                let offset: f32 = row.get(13)?;
                Ok((record, QuantizedVec { bytes, scale, offset }))
            })
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut hits = Vec::new();
        for row in rows {
            let (record, quantized) = row.map_err(|e| Error::Database(e.to_string()))?;
            let vector = quantized.decode();
            let norm = vector.dot(&vector).sqrt();
            if norm < 1e-9 {
                continue;
            }
            let score = query.dot(&vector) / (query_norm * norm);
            hits.push(ScoredCode { record, score });
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        Ok(hits)
    }

    pub fn get_stats(&self) -> Result<RegistryStats> {
        Ok(RegistryStats {
            codes: self.count_codes()?,
            embeddings: self.count_embeddings()?,
            db_size_bytes: std::fs::metadata(&self.db_path).map(|m| m.len()).unwrap_or(0),
        })
    }

    fn row_to_code(row: &Row<'_>) -> rusqlite::Result<CodeRecord> {
        let source: String = row.get(8)?;
        let source: Source = source.parse().map_err(|e: Error| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(CodeRecord {
            id: row.get(0)?,
            hsn_code: row.get(1)?,
            heading_code: row.get(2)?,
            chapter: row.get(3)?,
            commodity: row.get(4)?,
            description: row.get(5)?,
            goods_description: row.get(6)?,
            gst_rate: row.get(7)?,
            source,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

impl RegistryWriter for SqliteStore {
    fn upsert_codes(&self, batch: &[NewCodeRecord]) -> Result<Vec<CodeRecord>> {
        SqliteStore::upsert_codes(self, batch)
    }

    fn upsert_embeddings(&self, rows: &[CodeEmbedding]) -> Result<()> {
        SqliteStore::upsert_embeddings(self, rows)
    }
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    fn test_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path(), 4).unwrap();
        (store, dir)
    }

    fn record(code: &str, heading: &str, rate: f64) -> NewCodeRecord {
        NewCodeRecord {
            hsn_code: code.to_string(),
            heading_code: heading.to_string(),
            chapter: Some("Cereals".into()),
            commodity: Some("Rice".into()),
            description: Some("Husked rice".into()),
            goods_description: None,
            gst_rate: Some(rate),
            source: Source::Both,
        }
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let (store, _dir) = test_store();
        let batch = vec![record("10063020", "1006", 5.0), record("11010000", "1101", 12.0)];

        let first = store.upsert_codes(&batch).unwrap();
        let second = store.upsert_codes(&batch).unwrap();

        assert_eq!(store.count_codes().unwrap(), 2);
        let first_ids: Vec<i64> = first.iter().map(|r| r.id).collect();
        let second_ids: Vec<i64> = second.iter().map(|r| r.id).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn test_upsert_updates_in_place() {
        let (store, _dir) = test_store();
        store.upsert_codes(&[record("10063020", "1006", 5.0)]).unwrap();
        let updated = store.upsert_codes(&[record("10063020", "1006", 18.0)]).unwrap();

        assert_eq!(updated[0].gst_rate, Some(18.0));
        assert!(updated[0].updated_at.is_some());
        assert_eq!(store.count_codes().unwrap(), 1);
    }

    #[test]
    fn test_same_code_different_heading_is_distinct() {
        let (store, _dir) = test_store();
        store.upsert_codes(&[record("10063020", "1006", 5.0)]).unwrap();
        store.upsert_codes(&[record("10063020", "1007", 5.0)]).unwrap();
        assert_eq!(store.count_codes().unwrap(), 2);
    }

    #[test]
    fn test_embedding_upsert_overwrites() {
        let (store, _dir) = test_store();
        let rows = store.upsert_codes(&[record("10063020", "1006", 5.0)]).unwrap();
        let id = rows[0].id;

        store
            .upsert_embeddings(&[CodeEmbedding {
                code_id: id,
                vector: Array1::from_vec(vec![1.0, 0.0, 0.0, 0.0]),
            }])
            .unwrap();
        store
            .upsert_embeddings(&[CodeEmbedding {
                code_id: id,
                vector: Array1::from_vec(vec![0.0, 1.0, 0.0, 0.0]),
            }])
            .unwrap();

        assert_eq!(store.count_embeddings().unwrap(), 1);
        let hits = store
            .vector_search(&Array1::from_vec(vec![0.0, 1.0, 0.0, 0.0]), 10)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].score > 0.99);
    }

    #[test]
    fn test_embedding_dimension_rejected() {
        let (store, _dir) = test_store();
        let rows = store.upsert_codes(&[record("10063020", "1006", 5.0)]).unwrap();

        let err = store.upsert_embeddings(&[CodeEmbedding {
            code_id: rows[0].id,
            vector: Array1::from_vec(vec![1.0, 2.0]),
        }]);
        assert!(err.is_err());
        assert_eq!(store.count_embeddings().unwrap(), 0);
    }

    #[test]
    fn test_clear_registry() {
        let (store, _dir) = test_store();
        let rows = store.upsert_codes(&[record("10063020", "1006", 5.0)]).unwrap();
        store
            .upsert_embeddings(&[CodeEmbedding {
                code_id: rows[0].id,
                vector: Array1::from_vec(vec![1.0, 0.0, 0.0, 0.0]),
            }])
            .unwrap();

        assert_eq!(store.clear_registry().unwrap(), 1);
        assert_eq!(store.count_codes().unwrap(), 0);
        assert_eq!(store.count_embeddings().unwrap(), 0);
        assert_eq!(store.clear_registry().unwrap(), 0);
    }

    #[test]
    fn test_keyword_search() {
        let (store, _dir) = test_store();
        store
            .upsert_codes(&[record("10063020", "1006", 5.0), record("84713000", "8471", 18.0)])
            .unwrap();

        let by_code = store.keyword_search("1006", 10).unwrap();
        assert_eq!(by_code.len(), 1);
        assert_eq!(by_code[0].hsn_code, "10063020");

        let by_text = store.keyword_search("Husked", 10).unwrap();
        assert_eq!(by_text.len(), 2);
    }

    #[test]
    fn test_vector_search_ranks_by_similarity() {
        let (store, _dir) = test_store();
        let rows = store
            .upsert_codes(&[record("10063020", "1006", 5.0), record("84713000", "8471", 18.0)])
            .unwrap();
        store
            .upsert_embeddings(&[
                CodeEmbedding {
                    code_id: rows[0].id,
                    vector: Array1::from_vec(vec![1.0, 0.0, 0.0, 0.0]),
                },
                CodeEmbedding {
                    code_id: rows[1].id,
                    vector: Array1::from_vec(vec![0.0, 0.0, 1.0, 0.0]),
                },
            ])
            .unwrap();

        let hits = store
            .vector_search(&Array1::from_vec(vec![0.9, 0.1, 0.0, 0.0]), 10)
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record.hsn_code, "10063020");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_pagination() {
        let (store, _dir) = test_store();
        store
            .upsert_codes(&[
                record("10061010", "1006", 5.0),
                record("10063020", "1006", 5.0),
                record("84713000", "8471", 18.0),
            ])
            .unwrap();

        let (page1, total) = store.get_codes_paginated(1, 2).unwrap();
        assert_eq!(total, 3);
        assert_eq!(page1.len(), 2);
        assert_eq!(page1[0].hsn_code, "10061010");

        let (page2, _) = store.get_codes_paginated(2, 2).unwrap();
        assert_eq!(page2.len(), 1);
        assert_eq!(page2[0].hsn_code, "84713000");
    }
}
