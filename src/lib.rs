//! Lorevault indexes narrative PDF documents into a Qdrant vector collection
//! and answers similarity queries over the resulting chunks.
//!
//! Documents flow through a fixed pipeline: page text extraction, whitespace
//! and hyphenation normalization, recursive character chunking with overlap,
//! person-name extraction, and metadata assembly. Each chunk is embedded and
//! upserted into Qdrant with a payload that supports filtering by document
//! and by mentioned character.
#![deny(missing_docs)]

pub mod api;
pub mod config;
pub mod embedding;
pub mod logging;
pub mod metrics;
pub mod ner;
pub mod pdf;
pub mod processing;
pub mod qdrant;
pub mod status;
