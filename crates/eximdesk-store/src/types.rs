//! Registry row types.

use eximdesk_core::Source;
use ndarray::Array1;
use serde::Serialize;

/// Input row for a registry upsert.
#[derive(Debug, Clone)]
pub struct NewCodeRecord {
    pub hsn_code: String,
    pub heading_code: String,
    pub chapter: Option<String>,
    pub commodity: Option<String>,
    pub description: Option<String>,
    pub goods_description: Option<String>,
    pub gst_rate: Option<f64>,
    pub source: Source,
}

/// A persisted registry row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeRecord {
    pub id: i64,
    pub hsn_code: String,
    pub heading_code: String,
    pub chapter: Option<String>,
    pub commodity: Option<String>,
    pub description: Option<String>,
    pub goods_description: Option<String>,
    pub gst_rate: Option<f64>,
    pub source: Source,
    pub created_at: i64,
    pub updated_at: Option<i64>,
}

impl CodeRecord {
    /// Text the record's embedding vector is computed from. Empty means the
    /// record has nothing to embed.
    pub fn embedding_input(&self) -> String {
        let description = self
            .description
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.goods_description.as_deref())
            .unwrap_or("");
        let commodity = self.commodity.as_deref().unwrap_or("");
        format!("{} {}", description, commodity).trim().to_string()
    }
}

/// An embedding vector bound for persistence.
#[derive(Debug, Clone)]
pub struct CodeEmbedding {
    pub code_id: i64,
    pub vector: Array1<f32>,
}

/// A search hit with its similarity score.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCode {
    #[serde(flatten)]
    pub record: CodeRecord,
    pub score: f32,
}

/// Registry summary counters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub codes: i64,
    pub embeddings: i64,
    pub db_size_bytes: u64,
}
