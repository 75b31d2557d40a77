//! Two-source reconciliation — one merged record per HSN code.
//!
//! Runs once per import, after every file has been parsed and the two maps
//! accumulated across files. The schedule is the authoritative source for
//! heading, commodity, goods description and rate; the mapping directory for
//! chapter and description.

use std::collections::HashMap;

use eximdesk_core::Source;

use crate::types::{MergedRecord, SourceRecord};

/// Merge the accumulated mapping and schedule maps over the union of codes.
///
/// Output order is unspecified; downstream persistence treats it as a set.
pub fn reconcile(
    mapping: HashMap<String, SourceRecord>,
    mut schedule: HashMap<String, SourceRecord>,
) -> Vec<MergedRecord> {
    let mut merged = Vec::with_capacity(mapping.len() + schedule.len());

    for (code, map_rec) in mapping {
        match schedule.remove(&code) {
            Some(sched_rec) => {
                let heading_code = if sched_rec.heading_code.is_empty() {
                    map_rec.heading_code
                } else {
                    sched_rec.heading_code
                };
                merged.push(MergedRecord {
                    hsn_code: code,
                    heading_code,
                    chapter: map_rec.chapter,
                    commodity: sched_rec.commodity,
                    description: map_rec.description,
                    goods_description: sched_rec.goods_description,
                    gst_rate: sched_rec.gst_rate,
                    source: Source::Both,
                });
            }
            None => merged.push(MergedRecord::from(map_rec)),
        }
    }

    for (_, sched_rec) in schedule {
        let mut rec = MergedRecord::from(sched_rec);
        if rec.heading_code.is_empty() {
            rec.heading_code = rec.hsn_code.chars().take(4).collect();
        }
        merged.push(rec);
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping_rec(code: &str) -> SourceRecord {
        let mut rec = SourceRecord::new(code, Source::Mapping);
        rec.heading_code = code.chars().take(4).collect();
        rec.chapter = Some("Cereals".into());
        rec.description = Some("Rice, husked".into());
        rec
    }

    fn schedule_rec(code: &str) -> SourceRecord {
        let mut rec = SourceRecord::new(code, Source::Schedule);
        rec.heading_code = "1006".into();
        rec.commodity = Some("Rice".into());
        rec.goods_description = Some("Husked rice".into());
        rec.gst_rate = Some(5.0);
        rec
    }

    #[test]
    fn test_both_sources_field_precedence() {
        let mapping = HashMap::from([("10063020".to_string(), mapping_rec("10063020"))]);
        let schedule = HashMap::from([("10063020".to_string(), schedule_rec("10063020"))]);

        let merged = reconcile(mapping, schedule);
        assert_eq!(merged.len(), 1);
        let rec = &merged[0];
        assert_eq!(rec.source, Source::Both);
        // Rate and goods text from the schedule; chapter and description
        // from the mapping directory.
        assert_eq!(rec.gst_rate, Some(5.0));
        assert_eq!(rec.goods_description.as_deref(), Some("Husked rice"));
        assert_eq!(rec.chapter.as_deref(), Some("Cereals"));
        assert_eq!(rec.description.as_deref(), Some("Rice, husked"));
        assert_eq!(rec.heading_code, "1006");
    }

    #[test]
    fn test_empty_schedule_heading_falls_back_to_mapping() {
        let mapping = HashMap::from([("10063020".to_string(), mapping_rec("10063020"))]);
        let mut sched = schedule_rec("10063020");
        sched.heading_code = String::new();
        let schedule = HashMap::from([("10063020".to_string(), sched)]);

        let merged = reconcile(mapping, schedule);
        assert_eq!(merged[0].heading_code, "1006");
    }

    #[test]
    fn test_schedule_only_defaults_heading() {
        let mut sched = schedule_rec("84713000");
        sched.heading_code = String::new();
        let schedule = HashMap::from([("84713000".to_string(), sched)]);

        let merged = reconcile(HashMap::new(), schedule);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].heading_code, "8471");
        assert_eq!(merged[0].source, Source::Schedule);
    }

    #[test]
    fn test_mapping_only_passes_through() {
        let mapping = HashMap::from([("10063020".to_string(), mapping_rec("10063020"))]);
        let merged = reconcile(mapping, HashMap::new());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source, Source::Mapping);
        assert_eq!(merged[0].chapter.as_deref(), Some("Cereals"));
    }

    #[test]
    fn test_union_of_disjoint_keys() {
        let mapping = HashMap::from([("10063020".to_string(), mapping_rec("10063020"))]);
        let schedule = HashMap::from([("84713000".to_string(), schedule_rec("84713000"))]);
        let merged = reconcile(mapping, schedule);
        assert_eq!(merged.len(), 2);
    }
}
