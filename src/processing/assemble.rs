//! Assembly of the final processing result from chunker and extractor output.

use crate::pdf::DocumentMetadata;
use crate::processing::chunking::ChunkPiece;
use crate::processing::types::PipelineError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Top-level keys every serialized result must carry.
const REQUIRED_KEYS: [&str; 5] = [
    "metadata",
    "chunks",
    "document_info",
    "people_mentioned",
    "processing_info",
];

/// One chunk of the processed document with derived metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Stable identifier of the form `chunk_{index}`.
    pub chunk_id: String,
    /// 0-based position within the document's chunk sequence.
    pub index: usize,
    /// Chunk text, including the leading overlap span.
    pub content: String,
    /// Approximate source page (proportional mapping, see [`approximate_page_number`]).
    pub page_number: usize,
    /// Whitespace-delimited token count of `content`.
    pub word_count: usize,
    /// Character length of `content`.
    pub char_count: usize,
    /// UTF-8 encoded byte length of `content`; may exceed `char_count`.
    pub chunk_size_bytes: usize,
    /// Person names from the document-level set found in this chunk's text.
    pub people_mentioned: Vec<String>,
    /// Configured overlap shared with the next chunk; 0 for the last chunk.
    pub overlap_with_next: usize,
}

/// Document-level facts reported alongside the chunk sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// Total pages in the source document.
    pub total_pages: usize,
    /// Source file name.
    pub filename: String,
    /// Number of chunks produced.
    pub total_chunks: usize,
    /// Source file size in bytes.
    pub file_size_bytes: u64,
    /// Creation date from document metadata, empty when absent.
    pub created_date: String,
    /// Modification date from document metadata, empty when absent.
    pub modified_date: String,
}

/// Aggregate statistics computed once over the full chunk sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    /// Raw document metadata fields (lowercased Info-dictionary keys).
    pub fields: BTreeMap<String, String>,
    /// Sum of `word_count` across chunks.
    pub total_word_count: usize,
    /// Sum of `char_count` across chunks.
    pub total_char_count: usize,
    /// Mean chunk character length.
    pub average_chunk_size: f64,
    /// Mean per-chunk word count.
    pub avg_words_per_chunk: f64,
    /// Number of distinct person names mentioned in the document.
    pub total_people_mentioned: usize,
    /// RFC3339 timestamp of this processing run.
    pub processing_timestamp: String,
}

/// Configuration echo and provenance for one processing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingInfo {
    /// Target chunk size used by the splitter.
    pub chunk_size: usize,
    /// Overlap used by the splitter.
    pub chunk_overlap: usize,
    /// RFC3339 timestamp of this processing run.
    pub processing_date: String,
    /// Version of the processor that produced this result.
    pub processor_version: String,
}

/// Terminal artifact of one pipeline run over one document.
///
/// Created whole, never patched; re-processing a document produces a brand-new
/// value. Serializes to a JSON object with exactly the top-level keys
/// `metadata`, `chunks`, `document_info`, `people_mentioned`,
/// `processing_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    /// Document metadata and aggregate statistics.
    pub metadata: ResultMetadata,
    /// Ordered chunk sequence.
    pub chunks: Vec<ChunkRecord>,
    /// Document-level facts.
    pub document_info: DocumentInfo,
    /// Distinct lowercase person names found in the full text.
    pub people_mentioned: Vec<String>,
    /// Run configuration and provenance.
    pub processing_info: ProcessingInfo,
}

/// Combine chunker output, the global name set, and document metadata into a
/// [`ProcessingResult`].
///
/// Fails with [`PipelineError::EmptyDocument`] when the splitter produced no
/// chunks; an empty successful result is never emitted.
pub fn assemble_result(
    pieces: Vec<ChunkPiece>,
    people: &BTreeSet<String>,
    metadata: &DocumentMetadata,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<ProcessingResult, PipelineError> {
    if pieces.is_empty() {
        return Err(PipelineError::EmptyDocument);
    }

    let total_chunks = pieces.len();
    let total_pages = metadata.page_count;
    let now = current_timestamp_rfc3339();

    let chunks: Vec<ChunkRecord> = pieces
        .into_iter()
        .enumerate()
        .map(|(index, piece)| {
            let content = piece.text;
            let lowered = content.to_lowercase();
            let mentioned: Vec<String> = people
                .iter()
                .filter(|name| lowered.contains(name.as_str()))
                .cloned()
                .collect();
            ChunkRecord {
                chunk_id: format!("chunk_{index}"),
                index,
                page_number: approximate_page_number(index, total_chunks, total_pages),
                word_count: content.split_whitespace().count(),
                char_count: content.chars().count(),
                chunk_size_bytes: content.len(),
                people_mentioned: mentioned,
                overlap_with_next: if index + 1 < total_chunks {
                    chunk_overlap
                } else {
                    0
                },
                content,
            }
        })
        .collect();

    let total_word_count: usize = chunks.iter().map(|chunk| chunk.word_count).sum();
    let total_char_count: usize = chunks.iter().map(|chunk| chunk.char_count).sum();

    Ok(ProcessingResult {
        metadata: ResultMetadata {
            fields: metadata.fields.clone(),
            total_word_count,
            total_char_count,
            average_chunk_size: total_char_count as f64 / total_chunks as f64,
            avg_words_per_chunk: total_word_count as f64 / total_chunks as f64,
            total_people_mentioned: people.len(),
            processing_timestamp: now.clone(),
        },
        chunks,
        document_info: DocumentInfo {
            total_pages,
            filename: metadata.file_name.clone(),
            total_chunks,
            file_size_bytes: metadata.file_size,
            created_date: metadata.created_date.clone(),
            modified_date: metadata.modified_date.clone(),
        },
        people_mentioned: people.iter().cloned().collect(),
        processing_info: ProcessingInfo {
            chunk_size,
            chunk_overlap,
            processing_date: now,
            processor_version: env!("CARGO_PKG_VERSION").to_string(),
        },
    })
}

/// Map a chunk index proportionally onto the document's page range.
///
/// Chunks carry no true page boundaries from the loader, so the page is
/// approximated as `index / (total_chunks / total_pages) + 1` and clamped to
/// `total_pages`. Assignments near page boundaries can be off; this is a
/// documented imprecision of the mapping, not of the caller.
pub fn approximate_page_number(index: usize, total_chunks: usize, total_pages: usize) -> usize {
    if total_pages == 0 {
        return 1;
    }
    let chunks_per_page = (total_chunks / total_pages).max(1);
    (index / chunks_per_page + 1).min(total_pages)
}

/// Serialize a result to pretty JSON at `path`, overwriting any previous file.
///
/// Validates the five-key invariant on the serialized form before touching the
/// destination; a result that violates it is rejected with
/// [`PipelineError::Serialization`], as is any IO failure (with the cause
/// attached).
pub fn write_result_json(result: &ProcessingResult, path: &Path) -> Result<(), PipelineError> {
    let value =
        serde_json::to_value(result).map_err(|err| PipelineError::Serialization(err.into()))?;
    let object = value
        .as_object()
        .ok_or_else(|| PipelineError::Serialization(anyhow::anyhow!("result is not an object")))?;
    for key in REQUIRED_KEYS {
        if !object.contains_key(key) {
            return Err(PipelineError::Serialization(anyhow::anyhow!(
                "result is missing required key `{key}`"
            )));
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|err| PipelineError::Serialization(err.into()))?;
    }
    let body = serde_json::to_vec_pretty(&value)
        .map_err(|err| PipelineError::Serialization(err.into()))?;
    std::fs::write(path, body).map_err(|err| PipelineError::Serialization(err.into()))?;
    tracing::info!(path = %path.display(), "Wrote processing result");
    Ok(())
}

fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
