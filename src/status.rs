//! Per-document processing status with TTL-based eviction.
//!
//! The pipeline itself never touches this store; the service layer records
//! transitions around each run and the HTTP surface polls them. Entries are
//! pruned lazily whenever the store is touched, so a long-idle server does not
//! accumulate status records without bound.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Lifecycle states of a document moving through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    /// Upload accepted, processing not yet started.
    Pending,
    /// Pipeline run in progress.
    Processing,
    /// Pipeline completed and chunks were indexed.
    Completed,
    /// Pipeline run ended with an error.
    Failed,
}

/// Status record tracked for a single uploaded document.
#[derive(Debug, Clone, Serialize)]
pub struct StatusEntry {
    /// Current lifecycle state.
    pub status: ProcessingStatus,
    /// Original file name supplied by the uploader.
    pub document_name: String,
    /// Optional human-readable detail, set on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

struct TimedEntry {
    entry: StatusEntry,
    updated_at: Instant,
}

/// In-memory status map keyed by document id, with a fixed TTL.
pub struct StatusStore {
    ttl: Duration,
    entries: RwLock<HashMap<Uuid, TimedEntry>>,
}

impl StatusStore {
    /// Create a store whose entries expire `ttl` after their last update.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register a freshly uploaded document as pending.
    pub async fn register(&self, id: Uuid, document_name: String) {
        let mut guard = self.entries.write().await;
        prune(&mut guard, self.ttl);
        guard.insert(
            id,
            TimedEntry {
                entry: StatusEntry {
                    status: ProcessingStatus::Pending,
                    document_name,
                    message: None,
                },
                updated_at: Instant::now(),
            },
        );
    }

    /// Transition a document to a new state, optionally attaching a message.
    pub async fn set(&self, id: Uuid, status: ProcessingStatus, message: Option<String>) {
        let mut guard = self.entries.write().await;
        prune(&mut guard, self.ttl);
        if let Some(timed) = guard.get_mut(&id) {
            timed.entry.status = status;
            timed.entry.message = message;
            timed.updated_at = Instant::now();
        } else {
            tracing::warn!(document_id = %id, ?status, "Status update for unknown document");
        }
    }

    /// Look up the current status of a document, if it is still tracked.
    pub async fn get(&self, id: Uuid) -> Option<StatusEntry> {
        let guard = self.entries.read().await;
        guard
            .get(&id)
            .filter(|timed| timed.updated_at.elapsed() < self.ttl)
            .map(|timed| timed.entry.clone())
    }
}

fn prune(entries: &mut HashMap<Uuid, TimedEntry>, ttl: Duration) {
    entries.retain(|_, timed| timed.updated_at.elapsed() < ttl);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_and_transition() {
        let store = StatusStore::new(Duration::from_secs(60));
        let id = Uuid::new_v4();
        store.register(id, "book.pdf".into()).await;

        let entry = store.get(id).await.expect("entry present");
        assert_eq!(entry.status, ProcessingStatus::Pending);
        assert_eq!(entry.document_name, "book.pdf");

        store
            .set(id, ProcessingStatus::Failed, Some("corrupt file".into()))
            .await;
        let entry = store.get(id).await.expect("entry present");
        assert_eq!(entry.status, ProcessingStatus::Failed);
        assert_eq!(entry.message.as_deref(), Some("corrupt file"));
    }

    #[tokio::test]
    async fn expired_entries_are_invisible_and_pruned() {
        let store = StatusStore::new(Duration::from_millis(10));
        let id = Uuid::new_v4();
        store.register(id, "book.pdf".into()).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(store.get(id).await.is_none());

        // Any write prunes the dead entry from the backing map.
        store.register(Uuid::new_v4(), "other.pdf".into()).await;
        let guard = store.entries.read().await;
        assert!(!guard.contains_key(&id));
    }

    #[tokio::test]
    async fn unknown_document_yields_none() {
        let store = StatusStore::new(Duration::from_secs(60));
        assert!(store.get(Uuid::new_v4()).await.is_none());
    }
}
