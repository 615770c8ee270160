//! Resume text extraction.
//!
//! `extract` never fails: unsupported formats and broken files come back as an
//! empty string so screening can still run in a degraded mode.

use std::io::{Cursor, Read};
use std::panic::{self, AssertUnwindSafe};

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;
use tracing::{debug, warn};

const DOCX_BODY: &str = "word/document.xml";

#[derive(Debug, Error)]
enum ExtractError {
    #[error("pdf: {0}")]
    Pdf(String),

    #[error("pdf parser panicked")]
    PdfPanic,

    #[error("docx archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("docx read: {0}")]
    Io(#[from] std::io::Error),

    #[error("docx xml: {0}")]
    Xml(#[from] quick_xml::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Pdf,
    Docx,
}

fn detect_kind(filename: &str) -> Option<DocumentKind> {
    let lower = filename.trim().to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        Some(DocumentKind::Pdf)
    } else if lower.ends_with(".docx") {
        Some(DocumentKind::Docx)
    } else {
        None
    }
}

/// Converts an uploaded resume to plain text, selecting the parser by suffix.
pub fn extract(blob: &[u8], filename: &str) -> String {
    let Some(kind) = detect_kind(filename) else {
        warn!(filename, "Unsupported resume format, skipping text extraction");
        return String::new();
    };

    let result = match kind {
        DocumentKind::Pdf => pdf_text(blob),
        DocumentKind::Docx => docx_text(blob),
    };

    match result {
        Ok(text) => {
            debug!(filename, chars = text.len(), "Extracted resume text");
            text
        }
        Err(e) => {
            warn!(filename, "Error extracting text from resume: {e}");
            String::new()
        }
    }
}

fn pdf_text(blob: &[u8]) -> Result<String, ExtractError> {
    // pdf-extract panics on some malformed inputs instead of returning Err.
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(blob)));
    match outcome {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(ExtractError::Pdf(e.to_string())),
        Err(_) => Err(ExtractError::PdfPanic),
    }
}

fn docx_text(blob: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(blob))?;
    let mut xml = String::new();
    archive.by_name(DOCX_BODY)?.read_to_string(&mut xml)?;
    paragraphs_from_xml(&xml)
}

/// Walks WordprocessingML and emits one line per `<w:p>`.
fn paragraphs_from_xml(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                // An empty paragraph still occupies a line.
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text_run => text.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}
