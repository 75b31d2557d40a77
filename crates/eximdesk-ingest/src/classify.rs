//! Document classifier — decides which of the two known publications an
//! uploaded file is, from its extracted text.

/// Detected publication kind for one uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocKind {
    /// HSN code-mapping directory (code, chapter, description).
    HsnMapping,
    /// GST rate schedule (code, heading, goods description, rate).
    RateSchedule,
    /// Neither known layout; the file is skipped.
    Unrecognized,
}

/// Header phrase identifying the mapping table.
const MAPPING_TABLE_MARKER: &str = "hsn code mapping";
/// Column phrase identifying the HS-code columns of the mapping table.
const MAPPING_COLUMN_MARKER: &str = "hs code";
/// Rate column phrase of the schedule.
const RATE_COLUMN_MARKER: &str = "rate (%)";
/// Goods column phrase of the schedule.
const GOODS_COLUMN_MARKER: &str = "description of goods";

/// Classify a document from its raw text.
///
/// The mapping check runs first: a document carrying both publications'
/// markers classifies as the mapping directory.
pub fn classify(text: &str) -> DocKind {
    let t = text.to_lowercase();

    if t.contains(MAPPING_TABLE_MARKER) && t.contains(MAPPING_COLUMN_MARKER) {
        DocKind::HsnMapping
    } else if t.contains(RATE_COLUMN_MARKER) || t.contains(GOODS_COLUMN_MARKER) {
        DocKind::RateSchedule
    } else {
        DocKind::Unrecognized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_markers() {
        let text = "HSN Code Mapping\nHS Code | Description\n10063020 Basmati rice";
        assert_eq!(classify(text), DocKind::HsnMapping);
    }

    #[test]
    fn test_schedule_markers() {
        let rate = "S.No | Description of Goods | Rate\n1. 10063020 Rice 5%";
        assert_eq!(classify(rate), DocKind::RateSchedule);

        let rate_col = "Chapter | Rate (%)\n10063020 5";
        assert_eq!(classify(rate_col), DocKind::RateSchedule);
    }

    #[test]
    fn test_mapping_precedence_over_schedule() {
        // Both marker sets present: the mapping check wins.
        let text = "HSN Code Mapping\nHS Code | Description of Goods | Rate (%)";
        assert_eq!(classify(text), DocKind::HsnMapping);
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(classify("quarterly sales report"), DocKind::Unrecognized);
        assert_eq!(classify(""), DocKind::Unrecognized);
    }
}
