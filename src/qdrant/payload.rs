//! Helpers for constructing and hashing chunk payloads.

use crate::qdrant::types::ChunkPoint;
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

/// Build the payload object stored alongside each indexed chunk.
pub(crate) fn build_payload(point: &ChunkPoint, timestamp_rfc3339: &str) -> Value {
    let mut payload = Map::new();
    payload.insert("chunk_id".into(), Value::String(point.chunk_id.clone()));
    payload.insert("document".into(), Value::String(point.document.clone()));
    payload.insert("page_number".into(), json!(point.page_number));
    payload.insert(
        "people_mentioned".into(),
        Value::Array(
            point
                .people_mentioned
                .iter()
                .map(|name| Value::String(name.clone()))
                .collect(),
        ),
    );
    payload.insert(
        "chunk_hash".into(),
        Value::String(compute_chunk_hash(&point.text)),
    );
    payload.insert(
        "timestamp".into(),
        Value::String(timestamp_rfc3339.to_string()),
    );
    payload.insert("text".into(), Value::String(point.text.clone()));
    Value::Object(payload)
}

/// Compute a deterministic SHA-256 hash for the chunk text.
pub fn compute_chunk_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Current timestamp formatted for payload storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Derive the Qdrant point identifier for a chunk.
///
/// Deterministic in `(document, chunk_id)`, so re-ingesting a document
/// overwrites its existing points instead of accumulating duplicates.
pub(crate) fn point_id_for(document: &str, chunk_id: &str) -> String {
    let key = format!("{document}/{chunk_id}");
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string()
}
