//! HSN code-mapping extractor — line-oriented parse of the mapping
//! directory into per-code records.

use std::collections::HashMap;

use eximdesk_core::Source;

use crate::text::{clean_fragment, CODE_RE};
use crate::types::SourceRecord;

/// Table-header phrases; lines containing any of these carry no data.
const HEADER_PHRASES: [&str; 3] = ["hsn code", "hs code", "code mapping"];

fn is_header_line(line: &str) -> bool {
    let l = line.to_lowercase();
    HEADER_PHRASES.iter().any(|p| l.contains(p))
}

/// Parse a mapping document into records keyed by HSN code.
///
/// A line matches if it contains a 6–8 digit run (first run wins;
/// multi-code lines are not supported). Text before the code replaces the
/// running chapter label when it is long enough and not purely numeric; the
/// chapter carries forward until the next qualifying line. Text after the
/// code is the record's description. Non-matching lines are ignored.
pub fn parse_mapping(text: &str) -> HashMap<String, SourceRecord> {
    let mut records = HashMap::new();
    let mut chapter: Option<String> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || is_header_line(line) {
            continue;
        }
        let Some(code_match) = CODE_RE.find(line) else {
            continue;
        };

        let code = code_match.as_str().to_string();
        let before = clean_fragment(&line[..code_match.start()]);
        let after = clean_fragment(&line[code_match.end()..]);

        if before.len() > 3 && !before.chars().all(|c| c.is_ascii_digit()) {
            chapter = Some(before);
        }

        let mut rec = SourceRecord::new(code.clone(), Source::Mapping);
        rec.heading_code = code.chars().take(4).collect();
        rec.chapter = chapter.clone();
        if !after.is_empty() {
            rec.description = Some(after);
        }
        records.insert(code, rec);
    }

    records
}
