//! Progress-stream protocol parity tests — validates the wire shapes the
//! import stream emits and the line discipline clients rely on.
//!
//! The import route writes newline-delimited JSON; clients buffer to
//! newlines, drop ':'-prefixed keep-alives, and ignore unparseable lines.
//! These tests pin that contract from the reader's side.

/// Minimal reader-side line handler: returns parsed events, skipping
/// keep-alives and junk, the way the frontend consumes the stream.
fn consume(lines: &[&str]) -> Vec<serde_json::Value> {
    lines
        .iter()
        .filter(|line| !line.trim().is_empty() && !line.starts_with(':'))
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}

#[test]
fn test_log_event_shape() {
    let event: serde_json::Value =
        serde_json::from_str(r#"{"type":"log","message":"mapping document, 120 entries"}"#)
            .unwrap();
    assert_eq!(event["type"], "log");
    assert!(event["message"].is_string());
}

#[test]
fn test_progress_event_shape() {
    let event: serde_json::Value = serde_json::from_str(
        r#"{"type":"progress","totalProcessed":50,"totalRecords":120,"percentage":41}"#,
    )
    .unwrap();
    assert_eq!(event["type"], "progress");
    assert!(event["totalProcessed"].is_number());
    assert!(event["totalRecords"].is_number());
    assert!(event["percentage"].is_number());
}

#[test]
fn test_terminal_event_shapes() {
    let done: serde_json::Value =
        serde_json::from_str(r#"{"type":"done","count":120,"message":"Imported 120 of 120 records"}"#)
            .unwrap();
    assert_eq!(done["type"], "done");
    assert!(done["count"].is_number());

    let error: serde_json::Value =
        serde_json::from_str(r#"{"type":"error","message":"No files supplied"}"#).unwrap();
    assert_eq!(error["type"], "error");
    assert!(error["message"].is_string());
}

#[test]
fn test_keep_alive_lines_are_discarded() {
    let lines = [
        r#"{"type":"log","message":"Importing 2 file(s)"}"#,
        ": keep-alive",
        r#"{"type":"progress","totalProcessed":50,"totalRecords":120,"percentage":41}"#,
        ": keep-alive",
        r#"{"type":"done","count":120,"message":"done"}"#,
    ];
    let events = consume(&lines);
    assert_eq!(events.len(), 3);
    assert_eq!(events[2]["type"], "done");
}

#[test]
fn test_unparseable_lines_are_ignored() {
    let lines = [
        r#"{"type":"log","message":"ok"}"#,
        r#"{"type":"prog"#, // truncated mid-object
        "garbage",
        r#"{"type":"done","count":0,"message":"done"}"#,
    ];
    let events = consume(&lines);
    assert_eq!(events.len(), 2);
}

#[test]
fn test_partial_lines_buffer_until_newline() {
    // Chunks arriving mid-object reassemble into whole lines on '\n'.
    let chunks = [
        "{\"type\":\"progress\",\"totalProc",
        "essed\":50,\"totalRecords\":120,\"percentage\":41}\n{\"type\":\"do",
        "ne\",\"count\":120,\"message\":\"done\"}\n",
    ];

    let mut buffer = String::new();
    let mut events = Vec::new();
    for chunk in chunks {
        buffer.push_str(chunk);
        while let Some(pos) = buffer.find('\n') {
            let line: String = buffer.drain(..=pos).collect();
            if let Ok(event) = serde_json::from_str::<serde_json::Value>(line.trim()) {
                events.push(event);
            }
        }
    }

    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["type"], "progress");
    assert_eq!(events[1]["type"], "done");
}

#[test]
fn test_exactly_one_terminal_event() {
    let lines = [
        r#"{"type":"log","message":"Importing 1 file(s)"}"#,
        r#"{"type":"progress","totalProcessed":50,"totalRecords":50,"percentage":100}"#,
        r#"{"type":"done","count":50,"message":"Imported 50 of 50 records"}"#,
    ];
    let events = consume(&lines);
    let terminals = events
        .iter()
        .filter(|e| e["type"] == "done" || e["type"] == "error")
        .count();
    assert_eq!(terminals, 1);
}
