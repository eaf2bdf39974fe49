//! Indexing service orchestrating parsing, embedding, and vector storage.

use crate::config::get_config;
use crate::embedding::EmbeddingClient;
use crate::metrics::{IngestMetrics, MetricsSnapshot};
use crate::processing::assemble::write_result_json;
use crate::processing::pipeline::PdfPipeline;
use crate::processing::types::{IndexError, IngestOutcome, QueryHit, QueryRequest, SearchError};
use crate::qdrant::{ChunkPoint, QdrantService, QueryFilterArgs};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Operations exposed to the HTTP surface.
///
/// The trait boundary exists so route handlers can be exercised against a
/// scripted stub without a running Qdrant instance.
#[async_trait]
pub trait IngestApi: Send + Sync {
    /// Parse, chunk, embed, and index a single PDF document.
    async fn process_document(&self, path: PathBuf) -> Result<IngestOutcome, IndexError>;

    /// Run a similarity search over indexed chunks.
    async fn query(&self, request: QueryRequest) -> Result<Vec<QueryHit>, SearchError>;

    /// Snapshot of ingestion counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Production implementation backed by Qdrant and an embedding client.
pub struct IndexingService {
    pipeline: Arc<PdfPipeline>,
    embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
    qdrant_service: QdrantService,
    metrics: Arc<IngestMetrics>,
}

impl IndexingService {
    /// Build the service and ensure the configured collection exists with its
    /// payload indexes.
    pub async fn new(
        pipeline: Arc<PdfPipeline>,
        embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
    ) -> Result<Self, IndexError> {
        let config = get_config();
        let qdrant_service = QdrantService::new().map_err(IndexError::Qdrant)?;

        qdrant_service
            .create_collection_if_not_exists(
                &config.qdrant_collection_name,
                config.embedding_dimension as u64,
            )
            .await
            .map_err(IndexError::Qdrant)?;
        qdrant_service
            .ensure_payload_indexes(&config.qdrant_collection_name)
            .await
            .map_err(IndexError::Qdrant)?;

        Ok(Self {
            pipeline,
            embedding_client,
            qdrant_service,
            metrics: Arc::new(IngestMetrics::new()),
        })
    }

    fn processed_output_path(document_path: &Path) -> Option<PathBuf> {
        let processed_dir = get_config().processed_dir.as_ref()?;
        let stem = document_path.file_stem()?.to_string_lossy();
        Some(PathBuf::from(processed_dir).join(format!("{stem}.json")))
    }
}

#[async_trait]
impl IngestApi for IndexingService {
    async fn process_document(&self, path: PathBuf) -> Result<IngestOutcome, IndexError> {
        let config = get_config();
        let pipeline = Arc::clone(&self.pipeline);
        let pipeline_path = path.clone();

        // PDF parsing and NER are CPU-bound; keep them off the async runtime.
        let result = tokio::task::spawn_blocking(move || pipeline.process(&pipeline_path))
            .await
            .map_err(|err| IndexError::TaskFailed(err.to_string()))?
            .map_err(|err| {
                self.metrics.record_failure();
                IndexError::Pipeline(err)
            })?;

        if let Some(output_path) = Self::processed_output_path(&path) {
            write_result_json(&result, &output_path).map_err(|err| {
                self.metrics.record_failure();
                IndexError::Pipeline(err)
            })?;
        }

        let texts: Vec<String> = result.chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self
            .embedding_client
            .generate_embeddings(texts)
            .await
            .map_err(|err| {
                self.metrics.record_failure();
                IndexError::Embedding(err)
            })?;
        if vectors.len() != result.chunks.len() {
            self.metrics.record_failure();
            return Err(IndexError::Embedding(
                crate::embedding::EmbeddingClientError::GenerationFailed(format!(
                    "expected {} vectors, got {}",
                    result.chunks.len(),
                    vectors.len()
                )),
            ));
        }

        let points: Vec<ChunkPoint> = result
            .chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| ChunkPoint {
                chunk_id: chunk.chunk_id.clone(),
                document: result.document_info.filename.clone(),
                page_number: chunk.page_number,
                people_mentioned: chunk.people_mentioned.clone(),
                text: chunk.content.clone(),
                vector,
            })
            .collect();

        let points_upserted = self
            .qdrant_service
            .upsert_points(&config.qdrant_collection_name, points)
            .await
            .map_err(|err| {
                self.metrics.record_failure();
                IndexError::Qdrant(err)
            })?;

        let chunk_count = result.chunks.len();
        self.metrics.record_document(chunk_count as u64);
        tracing::info!(
            document = %result.document_info.filename,
            chunks = chunk_count,
            points = points_upserted,
            "Document indexed"
        );

        Ok(IngestOutcome {
            chunk_count,
            page_count: result.document_info.total_pages,
            people_mentioned: result.metadata.total_people_mentioned,
            points_upserted,
        })
    }

    async fn query(&self, request: QueryRequest) -> Result<Vec<QueryHit>, SearchError> {
        let config = get_config();

        let mut vectors = self
            .embedding_client
            .generate_embeddings(vec![request.query_text.clone()])
            .await
            .map_err(SearchError::Embedding)?;
        let vector = match vectors.pop() {
            Some(vector) if !vector.is_empty() => vector,
            _ => return Err(SearchError::EmptyEmbedding),
        };

        let limit = request
            .limit
            .unwrap_or(config.search_default_limit)
            .clamp(1, config.search_max_limit);

        let filter_args = QueryFilterArgs {
            character: request.character.clone(),
            document: request.document.clone(),
        };

        let scored = self
            .qdrant_service
            .search_points(
                &config.qdrant_collection_name,
                vector,
                &filter_args,
                limit,
                Some(config.search_score_threshold),
            )
            .await
            .map_err(SearchError::Qdrant)?;

        Ok(scored.into_iter().map(scored_point_to_hit).collect())
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

fn scored_point_to_hit(point: crate::qdrant::ScoredPoint) -> QueryHit {
    let payload = point.payload.unwrap_or_default();

    let text = payload
        .get("text")
        .and_then(Value::as_str)
        .map(str::to_string);
    let document = payload
        .get("document")
        .and_then(Value::as_str)
        .map(str::to_string);
    let page_number = payload.get("page_number").and_then(Value::as_u64);
    let people_mentioned = payload.get("people_mentioned").and_then(|value| {
        value.as_array().map(|names| {
            names
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
    });

    QueryHit {
        id: point.id,
        score: point.score,
        text,
        document,
        page_number,
        people_mentioned,
    }
}
