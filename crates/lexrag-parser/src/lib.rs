//! LexRAG Parser - Document text extraction
//!
//! Supports the three upload formats of the service:
//! - PDF documents (via `pdf-extract`)
//! - Microsoft Word DOCX (via `docx-rs`)
//! - Plain text
//!
//! The format is determined solely by the file extension; anything else is
//! an `UnsupportedFormat` error surfaced directly to the caller.

use std::path::Path;
use thiserror::Error;

mod docx;
mod pdf;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during text extraction
#[derive(Error, Debug)]
pub enum ParserError {
    /// File extension is not one of .pdf, .docx, .txt
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// IO error while reading the file
    #[error("IO error reading file: {path}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// PDF extraction failure
    #[error("PDF parsing error: {0}")]
    PdfError(String),

    /// DOCX extraction failure
    #[error("DOCX parsing error: {0}")]
    DocxError(String),

    /// File content is not valid UTF-8
    #[error("Text encoding error: {0}")]
    EncodingError(String),
}

pub type Result<T> = std::result::Result<T, ParserError>;

// ============================================================================
// File Type Detection
// ============================================================================

/// Supported document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Docx,
    Text,
}

impl FileType {
    /// Detect the file type from a path's extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "txt" => Ok(Self::Text),
            other => Err(ParserError::UnsupportedFormat(format!(".{other}"))),
        }
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Extract the raw text of a document, dispatching on its extension.
///
/// PDF pages and DOCX paragraphs are joined with blank lines so that the
/// downstream chunker sees paragraph breaks as its strongest separator.
pub fn extract_text(path: &Path) -> Result<String> {
    let file_type = FileType::from_path(path)?;

    let text = match file_type {
        FileType::Pdf => pdf::extract(path)?,
        FileType::Docx => docx::extract(path)?,
        FileType::Text => read_text(path)?,
    };

    tracing::debug!(
        path = %path.display(),
        chars = text.chars().count(),
        "extracted document text"
    );

    Ok(text)
}

fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| ParserError::IoError {
        path: path.display().to_string(),
        source: e,
    })?;

    String::from_utf8(bytes)
        .map_err(|e| ParserError::EncodingError(format!("{}: {e}", path.display())))
}
