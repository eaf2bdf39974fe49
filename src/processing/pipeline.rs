//! Synchronous document-to-chunk pipeline.

use crate::ner::EntityExtractor;
use crate::pdf;
use crate::processing::assemble::{ProcessingResult, assemble_result};
use crate::processing::chunking::RecursiveChunker;
use crate::processing::normalize::clean_text;
use crate::processing::types::PipelineError;
use std::path::Path;

/// Single-document processing pipeline.
///
/// Owns the splitter configuration and the injected entity extractor; each
/// [`PdfPipeline::process`] call is an independent single pass with no shared
/// mutable state, so separate documents may be processed concurrently by
/// calling this from separate tasks. The host is responsible for bounding how
/// many runs are in flight.
pub struct PdfPipeline {
    chunker: RecursiveChunker,
    extractor: EntityExtractor,
}

impl PdfPipeline {
    /// Assemble a pipeline from a validated chunker and an entity extractor.
    pub fn new(chunker: RecursiveChunker, extractor: EntityExtractor) -> Self {
        Self { chunker, extractor }
    }

    /// Process one PDF into a complete [`ProcessingResult`].
    ///
    /// All-or-nothing: any stage error fails the run and nothing is retried
    /// internally. Retrying a [`PipelineError::CorruptDocument`] or a missing
    /// file deterministically reproduces the same failure, so retry policy
    /// belongs to the caller.
    pub fn process(&self, path: &Path) -> Result<ProcessingResult, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::DocumentNotFound(path.to_path_buf()));
        }
        tracing::info!(path = %path.display(), "Processing document");

        let metadata = pdf::extract_metadata(path)?;
        let pages = pdf::load_page_texts(path)?;
        let text = clean_text(&pages.join("\n"));

        let people = self.extractor.extract_person_names(&text)?;
        let pieces = self.chunker.split(&text);

        let result = assemble_result(
            pieces,
            &people,
            &metadata,
            self.chunker.chunk_size(),
            self.chunker.chunk_overlap(),
        )?;
        tracing::info!(
            path = %path.display(),
            chunks = result.document_info.total_chunks,
            pages = result.document_info.total_pages,
            people = result.people_mentioned.len(),
            "Document processed"
        );
        Ok(result)
    }
}
