//! DOCX and XLSX readers (ZIP containers of XML parts).

use std::collections::HashMap;
use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::warn;

use crate::error::{ExtractError, ExtractResult};

/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Maximum sheets read from one workbook.
const MAX_SHEETS: usize = 100;

/// Maximum cells read from one sheet; the rest of the sheet is dropped.
const MAX_CELLS_PER_SHEET: usize = 100_000;

/// Column count of the widest sheet Excel allows (`A` through `XFD`).
const MAX_COLUMNS: usize = 16_384;

type Archive<'a> = zip::ZipArchive<Cursor<&'a [u8]>>;

fn ooxml_err(e: impl std::fmt::Display) -> ExtractError {
    ExtractError::Ooxml {
        message: e.to_string(),
    }
}

fn open_archive(bytes: &[u8]) -> ExtractResult<Archive<'_>> {
    zip::ZipArchive::new(Cursor::new(bytes)).map_err(ooxml_err)
}

fn read_entry(archive: &mut Archive<'_>, name: &str) -> ExtractResult<Vec<u8>> {
    let entry = archive.by_name(name).map_err(|e| ExtractError::Ooxml {
        message: format!("{}: {}", name, e),
    })?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(ooxml_err)?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Ooxml {
            message: format!("ZIP entry {} exceeds size limit", name),
        });
    }
    Ok(out)
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .try_get_attribute(key)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Text of `word/document.xml`, one line per paragraph.
pub(super) fn extract_docx(bytes: &[u8]) -> ExtractResult<String> {
    let mut archive = open_archive(bytes)?;
    let xml = read_entry(&mut archive, "word/document.xml")?;

    let mut reader = Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" | b"cr" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                out.push_str(&te.unescape().map_err(ooxml_err)?);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

/// Every worksheet as a `--- Sheet: {name} ---` header followed by CSV rows.
pub(super) fn extract_xlsx(bytes: &[u8]) -> ExtractResult<String> {
    let mut archive = open_archive(bytes)?;
    let shared = read_shared_strings(&mut archive)?;
    let sheets = list_sheets(&mut archive)?;

    let mut out = String::new();
    for (name, path) in sheets.into_iter().take(MAX_SHEETS) {
        let xml = read_entry(&mut archive, &path)?;
        let rows = read_sheet_rows(&xml, &shared)?;
        out.push_str(&format!("--- Sheet: {} ---\n", name));
        for row in rows {
            out.push_str(&csv_line(&row));
            out.push('\n');
        }
    }
    Ok(out)
}

fn read_shared_strings(archive: &mut Archive<'_>) -> ExtractResult<Vec<String>> {
    // Workbooks without any text cells have no shared string table
    if archive.by_name("xl/sharedStrings.xml").is_err() {
        return Ok(Vec::new());
    }
    let xml = read_entry(archive, "xl/sharedStrings.xml")?;

    let mut reader = Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"si" => strings.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                current.push_str(&te.unescape().map_err(ooxml_err)?);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Sheet names in workbook order paired with their part paths.
fn list_sheets(archive: &mut Archive<'_>) -> ExtractResult<Vec<(String, String)>> {
    let rels_xml = read_entry(archive, "xl/_rels/workbook.xml.rels")?;
    let mut targets: HashMap<String, String> = HashMap::new();
    let mut reader = Reader::from_reader(rels_xml.as_slice());
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attribute(&e, b"Id"), attribute(&e, b"Target")) {
                    let path = match target.strip_prefix('/') {
                        Some(absolute) => absolute.to_string(),
                        None => format!("xl/{}", target),
                    };
                    targets.insert(id, path);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    let workbook_xml = read_entry(archive, "xl/workbook.xml")?;
    let mut sheets = Vec::new();
    let mut reader = Reader::from_reader(workbook_xml.as_slice());
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                let name = attribute(&e, b"name").unwrap_or_default();
                if let Some(path) = attribute(&e, b"r:id").and_then(|id| targets.get(&id).cloned()) {
                    sheets.push((name, path));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(sheets)
}

/// Zero-based column of a cell reference such as `C12`.
///
/// `Ok(None)` when the reference has no column letters. Columns past `XFD`
/// are rejected.
fn column_index(reference: &str) -> ExtractResult<Option<usize>> {
    let mut number = 0usize;
    let mut seen = false;
    for c in reference.chars().take_while(|c| c.is_ascii_alphabetic()) {
        seen = true;
        let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
        number = number
            .checked_mul(26)
            .and_then(|n| n.checked_add(digit))
            .filter(|n| *n <= MAX_COLUMNS)
            .ok_or_else(|| ExtractError::Ooxml {
                message: format!("cell reference {} is beyond column XFD", reference),
            })?;
    }
    Ok(seen.then(|| number - 1))
}

fn read_sheet_rows(xml: &[u8], shared: &[String]) -> ExtractResult<Vec<Vec<String>>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell_column = 0usize;
    let mut cell_type = String::new();
    let mut value = String::new();
    let mut in_value = false;
    let mut cell_count = 0usize;

    loop {
        if cell_count >= MAX_CELLS_PER_SHEET {
            warn!(limit = MAX_CELLS_PER_SHEET, "Sheet truncated at cell limit");
            if !row.is_empty() {
                rows.push(std::mem::take(&mut row));
            }
            break;
        }
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => row.clear(),
                b"c" => {
                    let explicit = match attribute(&e, b"r") {
                        Some(reference) => column_index(&reference)?,
                        None => None,
                    };
                    cell_column = explicit.unwrap_or(row.len()).min(MAX_COLUMNS - 1);
                    cell_type = attribute(&e, b"t").unwrap_or_default();
                    value.clear();
                }
                b"v" | b"t" => in_value = true,
                _ => {}
            },
            Ok(Event::Text(te)) if in_value => {
                value.push_str(&te.unescape().map_err(ooxml_err)?);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    let resolved = match cell_type.as_str() {
                        "s" => value
                            .trim()
                            .parse::<usize>()
                            .ok()
                            .and_then(|i| shared.get(i).cloned())
                            .unwrap_or_default(),
                        "b" => if value.trim() == "1" { "TRUE" } else { "FALSE" }.to_string(),
                        _ => value.clone(),
                    };
                    if row.len() <= cell_column {
                        row.resize(cell_column + 1, String::new());
                    }
                    row[cell_column] = resolved;
                    cell_count += 1;
                }
                b"row" => rows.push(std::mem::take(&mut row)),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}

fn csv_line(row: &[String]) -> String {
    row.iter()
        .map(|field| {
            if field.contains([',', '"', '\n', '\r']) {
                format!("\"{}\"", field.replace('"', "\"\""))
            } else {
                field.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}
