//! Upload byte decoding — turns file payloads into raw text for the
//! classifier and extractors.
//!
//! PDF goes through `pdf-extract`; XLSX is unpacked with `zip` and walked
//! with `quick-xml` (shared strings plus per-sheet cell values, one text line
//! per row); delimited text is read as UTF-8. Spreadsheet rows are joined
//! with single spaces so the line-oriented extractors see one row per line.

use std::io::{Cursor, Read};

use eximdesk_core::{Error, Result};
use tracing::warn;

/// Maximum decompressed bytes read from a single ZIP entry.
const MAX_ZIP_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

/// Supported upload kinds, detected from the filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Spreadsheet,
    Delimited,
    Unknown,
}

impl FileKind {
    pub fn from_name(name: &str) -> Self {
        let ext = name.rsplit('.').next().unwrap_or("").to_lowercase();
        match ext.as_str() {
            "pdf" => Self::Pdf,
            "xlsx" => Self::Spreadsheet,
            "csv" | "tsv" | "txt" => Self::Delimited,
            _ => Self::Unknown,
        }
    }
}

/// Decode an uploaded file to raw text.
///
/// Returns `Ok(None)` for payloads with nothing to extract (binary content,
/// unsupported formats); decoder failures surface as `Error::Decode` so the
/// caller can log and skip the file.
pub fn decode_text(filename: &str, bytes: &[u8]) -> Result<Option<String>> {
    match FileKind::from_name(filename) {
        FileKind::Pdf => {
            let text = pdf_extract::extract_text_from_mem(bytes)
                .map_err(|e| Error::Decode(format!("{}: {}", filename, e)))?;
            Ok(Some(text))
        }
        FileKind::Spreadsheet => decode_xlsx(bytes).map(Some),
        FileKind::Delimited => Ok(Some(String::from_utf8_lossy(bytes).into_owned())),
        FileKind::Unknown => {
            if filename.to_lowercase().ends_with(".xls") {
                warn!("Legacy .xls is not supported, skipping: {}", filename);
                return Ok(None);
            }
            // Try as text; reject likely-binary content.
            let text = String::from_utf8_lossy(bytes);
            let junk = text
                .chars()
                .filter(|c| {
                    (*c == char::REPLACEMENT_CHARACTER)
                        || (c.is_control() && *c != '\n' && *c != '\r' && *c != '\t')
                })
                .count();
            if text.is_empty() || junk > text.chars().count() / 10 {
                Ok(None)
            } else {
                Ok(Some(text.into_owned()))
            }
        }
    }
}

fn read_zip_entry(archive: &mut zip::ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<Vec<u8>> {
    let mut entry = archive
        .by_name(name)
        .map_err(|e| Error::Decode(format!("zip entry {}: {}", name, e)))?;
    if entry.size() > MAX_ZIP_ENTRY_BYTES {
        return Err(Error::Decode(format!("zip entry {} too large", name)));
    }
    let mut out = Vec::with_capacity(entry.size() as usize);
    entry
        .by_ref()
        .take(MAX_ZIP_ENTRY_BYTES)
        .read_to_end(&mut out)?;
    Ok(out)
}

fn decode_xlsx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::Decode(format!("xlsx open: {}", e)))?;

    let shared = match read_zip_entry(&mut archive, "xl/sharedStrings.xml") {
        Ok(xml) => parse_shared_strings(&xml)?,
        Err(_) => Vec::new(),
    };

    let mut sheet_names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/") && n.ends_with(".xml"))
        .map(String::from)
        .collect();
    sheet_names.sort();

    let mut lines = Vec::new();
    for name in &sheet_names {
        let xml = read_zip_entry(&mut archive, name)?;
        lines.extend(parse_sheet_rows(&xml, &shared)?);
    }
    Ok(lines.join("\n"))
}

/// Parse `xl/sharedStrings.xml`: one string per `<si>`, text runs concatenated.
fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(t)) if in_text => {
                if let Ok(text) = t.unescape() {
                    current.push_str(&text);
                }
            }
            Ok(quick_xml::events::Event::End(e)) => match e.name().as_ref() {
                b"t" => in_text = false,
                b"si" => strings.push(current.clone()),
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(Error::Decode(format!("xlsx shared strings: {}", e))),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Walk one worksheet: cells per `<row>` joined with single spaces.
fn parse_sheet_rows(xml: &[u8], shared: &[String]) -> Result<Vec<String>> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut rows = Vec::new();
    let mut cells: Vec<String> = Vec::new();
    let mut cell_is_shared = false;
    let mut in_value = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.name().as_ref() {
                b"row" => cells.clear(),
                b"c" => {
                    cell_is_shared = e
                        .attributes()
                        .flatten()
                        .any(|a| a.key.as_ref() == b"t" && a.value.as_ref() == b"s");
                }
                b"v" => in_value = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(t)) if in_value => {
                let raw = match t.unescape() {
                    Ok(text) => text.into_owned(),
                    Err(_) => continue,
                };
                let value = if cell_is_shared {
                    raw.parse::<usize>()
                        .ok()
                        .and_then(|i| shared.get(i).cloned())
                        .unwrap_or(raw)
                } else {
                    raw
                };
                if !value.trim().is_empty() {
                    cells.push(value.trim().to_string());
                }
            }
            Ok(quick_xml::events::Event::End(e)) => match e.name().as_ref() {
                b"v" => in_value = false,
                b"row" => {
                    if !cells.is_empty() {
                        rows.push(cells.join(" "));
                    }
                }
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(Error::Decode(format!("xlsx sheet: {}", e))),
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kind_detection() {
        assert_eq!(FileKind::from_name("schedule.pdf"), FileKind::Pdf);
        assert_eq!(FileKind::from_name("RATES.XLSX"), FileKind::Spreadsheet);
        assert_eq!(FileKind::from_name("codes.csv"), FileKind::Delimited);
        assert_eq!(FileKind::from_name("notes.docx"), FileKind::Unknown);
        assert_eq!(FileKind::from_name("noextension"), FileKind::Unknown);
    }

    #[test]
    fn test_delimited_passthrough() {
        let text = decode_text("codes.csv", b"10063020,Basmati rice,5%").unwrap();
        assert_eq!(text.as_deref(), Some("10063020,Basmati rice,5%"));
    }

    #[test]
    fn test_binary_rejected() {
        let bytes: Vec<u8> = (0..255u8).cycle().take(1024).collect();
        let text = decode_text("mystery.bin", &bytes).unwrap();
        assert!(text.is_none());
    }

    #[test]
    fn test_unknown_extension_textual_content_accepted() {
        let text = decode_text("export.dat", b"10063020 Basmati rice").unwrap();
        assert_eq!(text.as_deref(), Some("10063020 Basmati rice"));
    }

    #[test]
    fn test_shared_strings_parse() {
        let xml = br#"<sst><si><t>Rice</t></si><si><t>Husked</t><t> rice</t></si></sst>"#;
        let strings = parse_shared_strings(xml).unwrap();
        assert_eq!(strings, vec!["Rice".to_string(), "Husked rice".to_string()]);
    }

    #[test]
    fn test_sheet_rows_shared_and_inline() {
        let xml = br#"<worksheet><sheetData>
            <row><c t="s"><v>0</v></c><c><v>10063020</v></c><c t="s"><v>1</v></c></row>
            <row><c><v>5</v></c></row>
        </sheetData></worksheet>"#;
        let shared = vec!["Rice".to_string(), "Husked rice".to_string()];
        let rows = parse_sheet_rows(xml, &shared).unwrap();
        assert_eq!(rows, vec!["Rice 10063020 Husked rice".to_string(), "5".to_string()]);
    }
}
