//! Qdrant vector store integration.

pub mod client;
pub mod filters;
pub mod payload;
pub mod types;

pub use client::{QdrantService, UPSERT_BATCH_SIZE};
pub use filters::build_query_filter;
pub use payload::compute_chunk_hash;
pub use types::{ChunkPoint, QdrantError, QueryFilterArgs, ScoredPoint};
