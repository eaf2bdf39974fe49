//! Core data types and error definitions for the processing pipeline.

use crate::ner::NerError;
use crate::qdrant::QdrantError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors emitted by the document-to-chunk pipeline.
///
/// Every stage either succeeds with a complete result or fails the whole run;
/// there is no partial or degraded success mode, and no internal retries.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source path does not resolve to an existing file.
    #[error("document not found: {0}")]
    DocumentNotFound(PathBuf),
    /// The file's structure could not be parsed at all.
    #[error("corrupt document {path}: {source}")]
    CorruptDocument {
        /// Offending file, surfaced so the caller can identify it.
        path: PathBuf,
        /// Underlying parser or IO error.
        #[source]
        source: anyhow::Error,
    },
    /// NER backend was missing or failed; never represented as an empty name set.
    #[error(transparent)]
    Ner(#[from] NerError),
    /// Text extraction yielded zero chunks.
    #[error("document produced no extractable chunks")]
    EmptyDocument,
    /// Result violated the required-keys invariant or could not be written.
    #[error("failed to serialize processing result: {0}")]
    Serialization(#[source] anyhow::Error),
}

/// Errors emitted while indexing a processed document.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Pipeline stage failed before indexing started.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// Embedding provider failed to produce vectors.
    #[error("failed to generate embeddings: {0}")]
    Embedding(#[from] crate::embedding::EmbeddingClientError),
    /// Qdrant interaction failed during ingestion.
    #[error("Qdrant request failed: {0}")]
    Qdrant(#[from] QdrantError),
    /// Background pipeline task was cancelled or panicked.
    #[error("processing task failed: {0}")]
    TaskFailed(String),
}

/// Errors emitted while orchestrating similarity searches.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Embedding provider failed to return a vector for the query text.
    #[error("failed to generate embeddings: {0}")]
    Embedding(#[from] crate::embedding::EmbeddingClientError),
    /// Qdrant search request returned an error response.
    #[error("Qdrant request failed: {0}")]
    Qdrant(#[from] QdrantError),
    /// Embedding provider returned no vectors for the query.
    #[error("embedding provider returned no vectors for the query")]
    EmptyEmbedding,
}

/// Summary of a completed ingestion produced by
/// [`crate::processing::IndexingService::process_document`].
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Number of chunks produced for the document.
    pub chunk_count: usize,
    /// Total pages reported by the document.
    pub page_count: usize,
    /// Distinct person names found in the document.
    pub people_mentioned: usize,
    /// Number of vectors upserted into Qdrant.
    pub points_upserted: usize,
}

/// Parameters supplied to the search pipeline.
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    /// Natural language query text to embed.
    pub query_text: String,
    /// Optional character name; matches chunks mentioning that person.
    pub character: Option<String>,
    /// Optional source document file name filter.
    pub document: Option<String>,
    /// Maximum number of results to return (defaults applied downstream).
    pub limit: Option<usize>,
}

/// Structured search hit returned to API consumers.
#[derive(Debug, Clone, serde::Serialize)]
pub struct QueryHit {
    /// Identifier assigned by Qdrant.
    pub id: String,
    /// Similarity score reported by Qdrant.
    pub score: f32,
    /// Stored chunk text, if available.
    pub text: Option<String>,
    /// Source document file name, if available.
    pub document: Option<String>,
    /// Approximate page number, if available.
    pub page_number: Option<u64>,
    /// Person names mentioned in the chunk, if available.
    pub people_mentioned: Option<Vec<String>>,
}
