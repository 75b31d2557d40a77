//! GST rate-schedule extractor — multi-line record parser.
//!
//! Schedule rows span lines: a row starts on the line carrying the HSN code
//! and continues until the next code line. The in-progress record lives in an
//! explicit accumulator so the continuation logic is testable without I/O and
//! cannot leak across file boundaries.

use std::collections::HashMap;

use eximdesk_core::Source;

use crate::text::{
    clean_fragment, parse_rate, CODE_RE, HEADING_RE, RATE_ONLY_RE, RATE_RE, SERIAL_RE,
    TRAILING_RATE_RE,
};
use crate::types::SourceRecord;

/// Accumulator for one schedule document.
#[derive(Debug, Default)]
pub struct ScheduleParser {
    current: Option<SourceRecord>,
    records: HashMap<String, SourceRecord>,
}

impl ScheduleParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line of the document.
    pub fn line(&mut self, raw: &str) {
        let line = raw.trim();
        if line.is_empty() {
            return;
        }

        if let Some(code_match) = CODE_RE.find(line) {
            self.finalize();
            self.current = Some(start_record(line, code_match));
            return;
        }

        let Some(current) = self.current.as_mut() else {
            return;
        };

        if RATE_ONLY_RE.is_match(line) {
            // Rate-only continuation: set/overwrite the rate, append nothing.
            current.gst_rate = parse_rate(line);
            return;
        }

        let text = clean_fragment(line);
        if text.is_empty() {
            return;
        }
        if current.heading_code.is_empty() {
            append(&mut current.commodity, &text);
        } else {
            append(&mut current.goods_description, &text);
        }
    }

    fn finalize(&mut self) {
        if let Some(rec) = self.current.take() {
            self.records.insert(rec.hsn_code.clone(), rec);
        }
    }

    /// Finalize any open record and return the document's records.
    pub fn finish(mut self) -> HashMap<String, SourceRecord> {
        self.finalize();
        self.records
    }
}

/// Parse a whole schedule document.
pub fn parse_schedule(text: &str) -> HashMap<String, SourceRecord> {
    let mut parser = ScheduleParser::new();
    for line in text.lines() {
        parser.line(line);
    }
    parser.finish()
}

/// Build a new record from a code-carrying line.
fn start_record(line: &str, code_match: regex::Match<'_>) -> SourceRecord {
    let code = code_match.as_str().to_string();

    // Remainder: the line with the code spliced out and any leading
    // enumeration number ("12.", "3)") stripped.
    let mut remainder = format!(
        "{} {}",
        &line[..code_match.start()],
        &line[code_match.end()..]
    );
    remainder = SERIAL_RE.replace(&remainder, "").into_owned();

    // Pull the rate out first: end-anchored match preferred, else the first
    // occurrence anywhere in the remainder.
    let mut rate = None;
    for re in [&*TRAILING_RATE_RE, &*RATE_RE] {
        let found = re.captures(&remainder).and_then(|caps| {
            match (caps.get(0), caps.get(1)) {
                (Some(whole), Some(num)) => {
                    Some((whole.range(), num.as_str().parse::<f64>().ok()))
                }
                _ => None,
            }
        });
        if let Some((range, parsed)) = found {
            rate = parsed;
            remainder.replace_range(range, "");
            break;
        }
    }

    let mut rec = SourceRecord::new(code, Source::Schedule);
    rec.gst_rate = rate;

    match HEADING_RE.find(&remainder) {
        Some(heading) => {
            rec.heading_code = heading.as_str().to_string();
            let commodity = clean_fragment(&remainder[..heading.start()]);
            let goods = clean_fragment(&remainder[heading.end()..]);
            if !commodity.is_empty() {
                rec.commodity = Some(commodity);
            }
            if !goods.is_empty() {
                rec.goods_description = Some(goods);
            }
        }
        None => {
            let commodity = clean_fragment(&remainder);
            if !commodity.is_empty() {
                rec.commodity = Some(commodity);
            }
        }
    }

    rec
}

fn append(field: &mut Option<String>, text: &str) {
    match field {
        Some(existing) => {
            existing.push(' ');
            existing.push_str(text);
        }
        None => *field = Some(text.to_string()),
    }
}
