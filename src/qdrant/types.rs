//! Shared types used by the Qdrant client and helpers.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with Qdrant.
#[derive(Debug, Error)]
pub enum QdrantError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Qdrant URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Qdrant responded with an unexpected status code.
    #[error("Unexpected Qdrant response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Qdrant.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// One chunk prepared for upsert: text, chunk-level metadata, and its vector.
#[derive(Debug, Clone)]
pub struct ChunkPoint {
    /// Chunk identifier within the document (`chunk_{index}`).
    pub chunk_id: String,
    /// Source document file name.
    pub document: String,
    /// Approximate page number of the chunk.
    pub page_number: usize,
    /// Lowercase person names mentioned in the chunk.
    pub people_mentioned: Vec<String>,
    /// Chunk text stored in the payload.
    pub text: String,
    /// Embedding vector produced for the chunk.
    pub vector: Vec<f32>,
}

/// Filters applied to chunk queries.
#[derive(Debug, Default, Clone)]
pub struct QueryFilterArgs {
    /// Character name matched against the `people_mentioned` payload array.
    pub character: Option<String>,
    /// Exact match constraint for the `document` payload field.
    pub document: Option<String>,
}

/// Scored payload returned by Qdrant queries.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    /// Identifier assigned to the vector.
    pub id: String,
    /// Similarity score computed by Qdrant.
    pub score: f32,
    /// Optional payload associated with the vector.
    pub payload: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
pub(crate) struct QueryResponse {
    pub(crate) result: QueryResponseResult,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum QueryResponseResult {
    Points(Vec<QueryPoint>),
    Object {
        #[serde(default)]
        points: Vec<QueryPoint>,
    },
}

#[derive(Deserialize)]
pub(crate) struct QueryPoint {
    pub(crate) id: Value,
    pub(crate) score: f32,
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
}
