//! Extraction and reconciliation record types.
//!
//! Both types are transient: they exist only inside one import run.

use eximdesk_core::Source;

/// One record extracted from a single source document, keyed by HSN code.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    /// 6–8 digit classification code; the reconciliation key.
    pub hsn_code: String,
    /// 4-digit heading. The mapping extractor defaults it from the code;
    /// the schedule extractor leaves it empty when the line carried none.
    pub heading_code: String,
    /// Chapter label carried forward from the most recent heading line.
    pub chapter: Option<String>,
    /// Short commodity label (rate schedule only).
    pub commodity: Option<String>,
    /// Free text from the mapping document.
    pub description: Option<String>,
    /// Free text from the rate schedule, accumulated across continuations.
    pub goods_description: Option<String>,
    /// GST rate percentage.
    pub gst_rate: Option<f64>,
    pub source: Source,
}

impl SourceRecord {
    pub fn new(hsn_code: impl Into<String>, source: Source) -> Self {
        Self {
            hsn_code: hsn_code.into(),
            heading_code: String::new(),
            chapter: None,
            commodity: None,
            description: None,
            goods_description: None,
            gst_rate: None,
            source,
        }
    }
}

/// One reconciled record per distinct HSN code across both publications.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    pub hsn_code: String,
    pub heading_code: String,
    pub chapter: Option<String>,
    pub commodity: Option<String>,
    pub description: Option<String>,
    pub goods_description: Option<String>,
    pub gst_rate: Option<f64>,
    /// Recomputed provenance: `Both` when both publications contributed.
    pub source: Source,
}

impl From<SourceRecord> for MergedRecord {
    fn from(rec: SourceRecord) -> Self {
        Self {
            hsn_code: rec.hsn_code,
            heading_code: rec.heading_code,
            chapter: rec.chapter,
            commodity: rec.commodity,
            description: rec.description,
            goods_description: rec.goods_description,
            gst_rate: rec.gst_rate,
            source: rec.source,
        }
    }
}
