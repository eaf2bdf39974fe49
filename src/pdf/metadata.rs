//! Structural metadata extraction from the PDF Info dictionary.

use crate::processing::types::PipelineError;
use lopdf::{Document, Object};
use std::collections::BTreeMap;
use std::path::Path;

/// Document-level metadata captured once at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    /// Lowercased Info-dictionary keys mapped to decoded string values.
    pub fields: BTreeMap<String, String>,
    /// Number of entries in the document's page table.
    pub page_count: usize,
    /// File name portion of the source path.
    pub file_name: String,
    /// On-disk size of the source file in bytes.
    pub file_size: u64,
    /// Creation date string from the Info dictionary, empty when absent.
    pub created_date: String,
    /// Modification date string from the Info dictionary, empty when absent.
    pub modified_date: String,
}

/// Read document-level metadata without touching the content streams.
///
/// Binary metadata values are decoded as UTF-8 with invalid bytes replaced;
/// values that cannot be represented as strings at all are logged and dropped
/// rather than failing the extraction.
pub fn extract_metadata(path: &Path) -> Result<DocumentMetadata, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::DocumentNotFound(path.to_path_buf()));
    }

    let document = Document::load(path).map_err(|err| PipelineError::CorruptDocument {
        path: path.to_path_buf(),
        source: anyhow::Error::new(err),
    })?;

    let mut fields = BTreeMap::new();
    if let Ok(info) = document.trailer.get(b"Info") {
        let info = match info {
            Object::Reference(id) => document.get_object(*id).ok(),
            other => Some(other),
        };
        if let Some(dict) = info.and_then(|object| object.as_dict().ok()) {
            for (key, value) in dict.iter() {
                let key = String::from_utf8_lossy(key).to_lowercase();
                match decode_value(value) {
                    Some(decoded) => {
                        fields.insert(key, decoded);
                    }
                    None => {
                        tracing::warn!(key, "Dropping metadata value that could not be decoded");
                    }
                }
            }
        }
    }

    let page_count = document.get_pages().len();
    let file_stat = std::fs::metadata(path).map_err(|err| PipelineError::CorruptDocument {
        path: path.to_path_buf(),
        source: anyhow::Error::new(err),
    })?;

    let created_date = fields.get("creationdate").cloned().unwrap_or_default();
    let modified_date = fields.get("moddate").cloned().unwrap_or_default();

    Ok(DocumentMetadata {
        fields,
        page_count,
        file_name: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        file_size: file_stat.len(),
        created_date,
        modified_date,
    })
}

fn decode_value(value: &Object) -> Option<String> {
    match value {
        Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Object::Integer(number) => Some(number.to_string()),
        Object::Real(number) => Some(number.to_string()),
        Object::Boolean(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Stream, dictionary};
    use std::io::Write;

    fn write_minimal_pdf(path: &Path) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Object::Stream(Stream::new(dictionary! {}, Vec::new())));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal("Stone Garden"),
            "Author" => Object::string_literal("Jane Doe"),
        });
        doc.trailer.set("Info", info_id);
        doc.save(path).expect("save pdf");
    }

    #[test]
    fn extracts_info_fields_and_page_count() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("book.pdf");
        write_minimal_pdf(&path);

        let metadata = extract_metadata(&path).expect("metadata");
        assert_eq!(metadata.fields.get("title").map(String::as_str), Some("Stone Garden"));
        assert_eq!(metadata.fields.get("author").map(String::as_str), Some("Jane Doe"));
        assert_eq!(metadata.page_count, 1);
        assert_eq!(metadata.file_name, "book.pdf");
        assert!(metadata.file_size > 0);
        assert!(metadata.created_date.is_empty());
    }

    #[test]
    fn missing_file_is_document_not_found() {
        let error = extract_metadata(Path::new("/nonexistent/book.pdf")).unwrap_err();
        assert!(matches!(error, PipelineError::DocumentNotFound(_)));
    }

    #[test]
    fn unparsable_file_is_corrupt_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.pdf");
        let mut file = std::fs::File::create(&path).expect("create");
        file.write_all(b"this is not a pdf").expect("write");

        let error = extract_metadata(&path).unwrap_err();
        assert!(matches!(error, PipelineError::CorruptDocument { .. }));
    }
}
