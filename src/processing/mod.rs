//! Document processing pipeline: normalization, chunking, assembly, indexing.

pub mod assemble;
pub mod chunking;
pub mod normalize;
pub mod pipeline;
mod service;
pub mod types;

pub use assemble::{ChunkRecord, ProcessingResult};
pub use chunking::{ChunkingError, RecursiveChunker};
pub use normalize::clean_text;
pub use pipeline::PdfPipeline;
pub use service::{IndexingService, IngestApi};
pub use types::{
    IndexError, IngestOutcome, PipelineError, QueryHit, QueryRequest, SearchError,
};
