//! PDF loading: structural metadata and page text extraction.
//!
//! Metadata extraction and text extraction are deliberately independent so a
//! malformed content stream does not take the metadata path down with it.

mod loader;
mod metadata;

pub use loader::load_page_texts;
pub use metadata::{DocumentMetadata, extract_metadata};
