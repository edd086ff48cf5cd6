//! DOCX text extraction via `docx-rs`.

use std::path::Path;

use docx_rs::{read_docx, DocumentChild, ParagraphChild, RunChild};

use crate::{ParserError, Result};

/// Extract the paragraph text of a DOCX document, one blank line between
/// paragraphs.
pub fn extract(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| ParserError::IoError {
        path: path.display().to_string(),
        source: e,
    })?;

    let docx = read_docx(&bytes).map_err(|e| ParserError::DocxError(e.to_string()))?;

    let mut paragraphs = Vec::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(para) = child {
            let mut text = String::new();
            for pc in &para.children {
                if let ParagraphChild::Run(run) = pc {
                    for rc in &run.children {
                        if let RunChild::Text(t) = rc {
                            text.push_str(&t.text);
                        }
                    }
                }
            }
            paragraphs.push(text);
        }
    }

    Ok(paragraphs.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn garbage_bytes_are_a_docx_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, b"not a zip archive").unwrap();

        let err = extract(&path).unwrap_err();
        assert!(matches!(err, ParserError::DocxError(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = extract(&PathBuf::from("/nonexistent/contract.docx")).unwrap_err();
        assert!(matches!(err, ParserError::IoError { .. }));
    }
}
