//! PDF text extraction via `pdf-extract`.

use std::path::Path;

use crate::{ParserError, Result};

/// Extract the full text of a PDF.
///
/// `pdf-extract` separates pages with form feeds; those are rewritten to
/// blank lines so page boundaries read as paragraph breaks downstream.
pub fn extract(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| ParserError::IoError {
        path: path.display().to_string(),
        source: e,
    })?;

    let text = pdf_extract::extract_text_from_mem(&bytes)
        .map_err(|e| ParserError::PdfError(e.to_string()))?;

    Ok(text.replace('\x0C', "\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn unreadable_path_is_an_io_error() {
        let err = extract(&PathBuf::from("/nonexistent/judgment.pdf")).unwrap_err();
        assert!(matches!(err, ParserError::IoError { .. }));
    }
}
