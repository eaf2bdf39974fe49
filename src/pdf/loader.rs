//! Page text extraction.

use crate::processing::types::PipelineError;
use std::path::Path;

/// Extract the raw text of every page, in page order.
///
/// Fails with [`PipelineError::DocumentNotFound`] before touching the parser
/// when the path does not resolve to a file, and with
/// [`PipelineError::CorruptDocument`] when the content streams cannot be read.
pub fn load_page_texts(path: &Path) -> Result<Vec<String>, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::DocumentNotFound(path.to_path_buf()));
    }

    let pages =
        pdf_extract::extract_text_by_pages(path).map_err(|err| PipelineError::CorruptDocument {
            path: path.to_path_buf(),
            source: anyhow::Error::new(err),
        })?;

    tracing::debug!(path = %path.display(), pages = pages.len(), "Extracted page texts");
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_document_not_found() {
        let error = load_page_texts(Path::new("/nonexistent/book.pdf")).unwrap_err();
        assert!(matches!(error, PipelineError::DocumentNotFound(_)));
    }

    #[test]
    fn unparsable_file_is_corrupt_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.pdf");
        let mut file = std::fs::File::create(&path).expect("create");
        file.write_all(b"no pdf header here").expect("write");

        let error = load_page_texts(&path).unwrap_err();
        assert!(matches!(error, PipelineError::CorruptDocument { .. }));
    }
}
