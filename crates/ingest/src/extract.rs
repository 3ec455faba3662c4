//! Plain-text extraction from uploaded blobs.
//!
//! | Declared type  | Method                                                  |
//! |----------------|---------------------------------------------------------|
//! | pdf            | `pdf-extract` per page, pages joined by a blank line    |
//! | plain text     | UTF-8 decode, verbatim                                  |
//! | word document  | unzip `word/document.xml`, collect `w:t` runs per `w:p` |
//!
//! Parsing is CPU-bound and runs on the blocking pool.

use std::io::{Cursor, Read};

use deskmate_core::error::ExtractionError;
use deskmate_core::knowledge::FileType;
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;

const DOCX_BODY_PART: &str = "word/document.xml";

/// Separator between the text of consecutive PDF pages.
const PAGE_SEPARATOR: &str = "\n\n";

/// Ceiling on the inflated size of `word/document.xml`.
const DEFAULT_MAX_EXPANDED_BYTES: u64 = 64 * 1024 * 1024;

/// Turns a blob of a declared type into plain text.
#[derive(Debug, Clone, Copy)]
pub struct DocumentExtractor {
    max_expanded_bytes: u64,
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentExtractor {
    pub fn new() -> Self {
        Self {
            max_expanded_bytes: DEFAULT_MAX_EXPANDED_BYTES,
        }
    }

    /// Cap on how large a compressed document part may inflate to.
    pub fn with_max_expanded_bytes(mut self, limit: u64) -> Self {
        self.max_expanded_bytes = limit;
        self
    }

    /// Extract text from a blob whose type is given as a media type string.
    ///
    /// Unknown types fail with `UnsupportedFormat` naming the rejected type.
    pub async fn extract_declared(
        &self,
        bytes: Vec<u8>,
        declared_type: &str,
    ) -> Result<String, ExtractionError> {
        let file_type = FileType::from_media_type(declared_type)
            .ok_or_else(|| ExtractionError::UnsupportedFormat(declared_type.to_string()))?;
        self.extract(bytes, file_type).await
    }

    /// Extract text from a blob of a known type.
    pub async fn extract(
        &self,
        bytes: Vec<u8>,
        file_type: FileType,
    ) -> Result<String, ExtractionError> {
        let len = bytes.len();
        let limit = self.max_expanded_bytes;
        let text = tokio::task::spawn_blocking(move || extract_sync(&bytes, file_type, limit))
            .await
            .map_err(|e| failed(file_type, format!("extractor task aborted: {e}")))??;

        debug!(file_type = %file_type, bytes = len, chars = text.len(), "Extracted document text");
        Ok(text)
    }
}

fn failed(file_type: FileType, reason: impl Into<String>) -> ExtractionError {
    ExtractionError::ExtractionFailed {
        file_type: file_type.label().to_string(),
        reason: reason.into(),
    }
}

fn extract_sync(
    bytes: &[u8],
    file_type: FileType,
    max_expanded_bytes: u64,
) -> Result<String, ExtractionError> {
    match file_type {
        FileType::Pdf => extract_pdf(bytes),
        FileType::PlainText => String::from_utf8(bytes.to_vec())
            .map_err(|e| failed(file_type, format!("not valid UTF-8: {e}"))),
        FileType::WordDocument => extract_docx(bytes, max_expanded_bytes),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| failed(FileType::Pdf, e.to_string()))?;

    debug!(pages = pages.len(), "Extracted PDF pages");
    Ok(pages
        .iter()
        .map(|page| page.trim())
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR))
}

fn extract_docx(bytes: &[u8], max_expanded_bytes: u64) -> Result<String, ExtractionError> {
    let file_type = FileType::WordDocument;

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| failed(file_type, format!("not a zip package: {e}")))?;

    let part = archive
        .by_name(DOCX_BODY_PART)
        .map_err(|e| failed(file_type, format!("missing {DOCX_BODY_PART}: {e}")))?;

    // Read one byte past the cap so an oversized part is detectable.
    let mut raw = Vec::new();
    part.take(max_expanded_bytes.saturating_add(1))
        .read_to_end(&mut raw)
        .map_err(|e| failed(file_type, format!("unreadable {DOCX_BODY_PART}: {e}")))?;
    if raw.len() as u64 > max_expanded_bytes {
        return Err(failed(
            file_type,
            format!("{DOCX_BODY_PART} expands past {max_expanded_bytes} bytes"),
        ));
    }
    let xml = String::from_utf8(raw)
        .map_err(|e| failed(file_type, format!("{DOCX_BODY_PART} is not UTF-8: {e}")))?;

    document_xml_to_text(&xml).map_err(|reason| failed(file_type, reason))
}

/// Collect the raw text of a WordprocessingML body, one line per paragraph.
fn document_xml_to_text(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text_run = false;
    // `w:tab` inside `w:tabs` is a tab-stop definition, not a tab character.
    let mut tab_stops_depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = true,
                b"tabs" => tab_stops_depth += 1,
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"tabs" => tab_stops_depth = tab_stops_depth.saturating_sub(1),
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" if tab_stops_depth == 0 => out.push('\t'),
                b"br" | b"cr" => out.push('\n'),
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text_run => {
                let text = t
                    .unescape()
                    .map_err(|e| format!("bad text at byte {}: {e}", reader.buffer_position()))?;
                out.push_str(&text);
            }
            Ok(Event::CData(t)) if in_text_run => {
                out.push_str(&String::from_utf8_lossy(&t));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "malformed XML at byte {}: {e}",
                    reader.error_position()
                ));
            }
        }
    }

    Ok(out.trim_end().to_string())
}
