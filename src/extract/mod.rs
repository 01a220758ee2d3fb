//! Text extraction from uploaded files.
//!
//! The format is chosen from the file extension. Output is plain UTF-8 text;
//! a file that yields only whitespace is an error so empty documents never
//! reach the repository.

mod ooxml;

use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{ExtractError, ExtractResult};

/// Prefix marking text recovered byte-wise from a legacy `.doc` file.
pub const RAW_DOC_NOTICE: &str = "[LƯU Ý: Đây là nội dung trích xuất thô từ file .doc cũ]";

/// Minimum number of characters a raw `.doc` recovery must yield.
const MIN_RAW_DOC_CHARS: usize = 10;

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Docx,
    /// Legacy Word binary; sometimes a renamed `.docx`.
    Doc,
    Spreadsheet,
    PlainText,
}

impl FileKind {
    /// Detect the format from a file name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        let extension = lower.rsplit_once('.').map(|(_, ext)| ext)?;
        match extension {
            "pdf" => Some(FileKind::Pdf),
            "docx" => Some(FileKind::Docx),
            "doc" => Some(FileKind::Doc),
            "xlsx" | "xls" => Some(FileKind::Spreadsheet),
            "txt" | "md" | "csv" | "json" => Some(FileKind::PlainText),
            _ => None,
        }
    }
}

/// Extract text from the bytes of a file called `name`.
pub fn extract_text(name: &str, bytes: &[u8]) -> ExtractResult<String> {
    let kind = FileKind::from_name(name).ok_or_else(|| ExtractError::UnsupportedFormat {
        name: name.to_string(),
    })?;
    debug!(name = %name, kind = ?kind, bytes = bytes.len(), "Extracting text");

    let text = match kind {
        FileKind::Pdf => extract_pdf(bytes)?,
        FileKind::Docx => ooxml::extract_docx(bytes)?,
        FileKind::Doc => extract_legacy_doc(bytes)?,
        FileKind::Spreadsheet => ooxml::extract_xlsx(bytes)?,
        FileKind::PlainText => decode_text(bytes),
    };

    if text.trim().is_empty() {
        return Err(ExtractError::Empty {
            name: name.to_string(),
        });
    }
    Ok(text)
}

/// Read a file from disk and extract its text. Returns `(file name, text)`.
pub fn extract_file(path: &Path) -> ExtractResult<(String, String)> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mut bytes = Vec::new();
    std::fs::File::open(path)?.read_to_end(&mut bytes)?;
    let text = extract_text(&name, &bytes)?;
    Ok((name, text))
}

fn extract_pdf(bytes: &[u8]) -> ExtractResult<String> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| {
        ExtractError::Pdf {
            message: e.to_string(),
        }
    })?;

    let mut out = String::new();
    for (index, page) in pages.iter().enumerate() {
        out.push_str(&format!("--- Page {} ---\n{}\n", index + 1, page.trim_end()));
    }
    Ok(out)
}

fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

fn extract_legacy_doc(bytes: &[u8]) -> ExtractResult<String> {
    match ooxml::extract_docx(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            warn!(error = %e, "Legacy .doc is not OOXML, falling back to raw text recovery");
            recover_raw_text(bytes)
        }
    }
}

/// Best-effort recovery of readable text from a binary Word file.
fn recover_raw_text(bytes: &[u8]) -> ExtractResult<String> {
    let decoded = String::from_utf8_lossy(bytes);
    let printable: String = decoded
        .chars()
        .map(|c| if is_printable(c) { c } else { ' ' })
        .collect();
    let collapsed = printable.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() < MIN_RAW_DOC_CHARS {
        return Err(ExtractError::LegacyDoc {
            message: "no readable text found".to_string(),
        });
    }
    Ok(format!("{}\n{}", RAW_DOC_NOTICE, collapsed))
}

fn is_printable(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{7E}' | '\u{A0}'..='\u{FF}')
        || (('\u{100}'..='\u{FFFF}').contains(&c) && c != char::REPLACEMENT_CHARACTER)
}
