//! HTTP client wrapper for interacting with Qdrant.

use crate::config::get_config;
use crate::qdrant::{
    filters::build_query_filter,
    payload::{build_payload, current_timestamp_rfc3339, point_id_for},
    types::{
        ChunkPoint, QdrantError, QueryFilterArgs, QueryResponse, QueryResponseResult, ScoredPoint,
    },
};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};

/// Maximum number of points sent in a single upsert request.
pub const UPSERT_BATCH_SIZE: usize = 100;

/// Lightweight HTTP client for Qdrant operations.
pub struct QdrantService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
}

impl QdrantService {
    /// Construct a new client using configuration derived from the environment.
    pub fn new() -> Result<Self, QdrantError> {
        let config = get_config();
        let client = Client::builder().user_agent("lorevault/0.1").build()?;

        let base_url = normalize_base_url(&config.qdrant_url).map_err(QdrantError::InvalidUrl)?;
        tracing::debug!(url = %base_url, "Initialized Qdrant HTTP client");

        Ok(Self {
            client,
            base_url,
            api_key: config.qdrant_api_key.clone(),
        })
    }

    /// Create a collection only when it is missing from Qdrant.
    pub async fn create_collection_if_not_exists(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        if self.collection_exists(collection_name).await? {
            return Ok(());
        }

        tracing::debug!(
            collection = collection_name,
            vector_size,
            "Creating collection"
        );
        self.create_collection(collection_name, vector_size).await
    }

    /// Create or update a collection with the specified vector size.
    pub async fn create_collection(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{collection_name}"))
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection = collection_name, "Collection ensured/created");
        })
        .await
    }

    /// Upsert chunk points into the given collection.
    ///
    /// Points are sent in batches of at most [`UPSERT_BATCH_SIZE`]; the first
    /// batch that fails aborts the upload and its error is propagated.
    /// Remaining batches are not attempted, and nothing is silently dropped.
    pub async fn upsert_points(
        &self,
        collection_name: &str,
        points: Vec<ChunkPoint>,
    ) -> Result<usize, QdrantError> {
        if points.is_empty() {
            return Ok(0);
        }

        let now = current_timestamp_rfc3339();
        let mut upserted = 0;

        for batch in points.chunks(UPSERT_BATCH_SIZE) {
            let serialized: Vec<Value> = batch
                .iter()
                .map(|point| {
                    json!({
                        "id": point_id_for(&point.document, &point.chunk_id),
                        "vector": point.vector,
                        "payload": build_payload(point, &now),
                    })
                })
                .collect();

            let batch_len = serialized.len();
            let response = self
                .request(
                    Method::PUT,
                    &format!("collections/{collection_name}/points"),
                )
                .query(&[("wait", true)])
                .json(&json!({ "points": serialized }))
                .send()
                .await?;

            self.ensure_success(response, || {
                tracing::debug!(
                    collection = collection_name,
                    points = batch_len,
                    "Batch upserted"
                );
            })
            .await?;
            upserted += batch_len;
        }

        Ok(upserted)
    }

    /// Perform a similarity search against a collection, returning scored payloads.
    pub async fn search_points(
        &self,
        collection_name: &str,
        vector: Vec<f32>,
        filter_args: &QueryFilterArgs,
        limit: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<ScoredPoint>, QdrantError> {
        let mut body = json!({
            "query": vector,
            "limit": limit,
            "with_payload": true,
        });
        let object = body
            .as_object_mut()
            .expect("query body should remain an object");

        if let Some(threshold) = score_threshold {
            object.insert("score_threshold".into(), Value::from(threshold));
        }
        if let Some(filter) = build_query_filter(filter_args) {
            object.insert("filter".into(), filter);
        }

        let response = self
            .request(
                Method::POST,
                &format!("collections/{collection_name}/points/query"),
            )
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(collection = collection_name, error = %error, "Qdrant search failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        let points = match payload.result {
            QueryResponseResult::Points(points) => points,
            QueryResponseResult::Object { points } => points,
        };
        Ok(points
            .into_iter()
            .map(|point| ScoredPoint {
                id: stringify_point_id(point.id),
                score: point.score,
                payload: point.payload,
            })
            .collect())
    }

    /// Ensure standard payload indexes exist for the chunk filters.
    pub async fn ensure_payload_indexes(&self, collection_name: &str) -> Result<(), QdrantError> {
        let fields: [(&str, &str); 5] = [
            ("document", "keyword"),
            ("people_mentioned", "keyword"),
            ("chunk_id", "keyword"),
            ("page_number", "integer"),
            ("timestamp", "datetime"),
        ];

        for (field, schema) in fields {
            let body = json!({
                "field_name": field,
                "field_schema": schema,
            });

            let response = self
                .request(Method::PUT, &format!("collections/{collection_name}/index"))
                .json(&body)
                .send()
                .await?;

            if response.status().is_success() || response.status() == StatusCode::CONFLICT {
                tracing::debug!(collection = collection_name, field, schema, "Payload index ensured");
            } else {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::warn!(collection = collection_name, field, error = %error, "Failed to ensure payload index");
            }
        }

        Ok(())
    }

    async fn collection_exists(&self, collection_name: &str) -> Result<bool, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{collection_name}"))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(collection = collection_name, error = %error, "Collection existence check failed");
                Err(error)
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        req
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), QdrantError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, Method::PUT, MockServer};
    use reqwest::Client;

    fn service_for(server: &MockServer) -> QdrantService {
        QdrantService {
            client: Client::builder()
                .user_agent("lorevault-test")
                .build()
                .expect("client"),
            base_url: server.base_url(),
            api_key: None,
        }
    }

    fn chunk_point(index: usize) -> ChunkPoint {
        ChunkPoint {
            chunk_id: format!("chunk_{index}"),
            document: "book.pdf".into(),
            page_number: 1,
            people_mentioned: vec![],
            text: format!("chunk text {index}"),
            vector: vec![0.5, 0.5],
        }
    }

    #[tokio::test]
    async fn upsert_splits_into_batches_of_at_most_100() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/books/points");
                then.status(200).json_body(serde_json::json!({
                    "status": "ok",
                    "result": { "operation_id": 0, "status": "completed" }
                }));
            })
            .await;

        let service = service_for(&server);
        let points: Vec<ChunkPoint> = (0..230).map(chunk_point).collect();
        let upserted = service
            .upsert_points("books", points)
            .await
            .expect("upsert");

        assert_eq!(upserted, 230);
        // 100 + 100 + 30
        mock.assert_hits(3);
    }

    #[tokio::test]
    async fn upsert_propagates_first_batch_error() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/books/points");
                then.status(500).body("disk full");
            })
            .await;

        let service = service_for(&server);
        let points: Vec<ChunkPoint> = (0..250).map(chunk_point).collect();
        let error = service.upsert_points("books", points).await.unwrap_err();

        assert!(matches!(error, QdrantError::UnexpectedStatus { .. }));
        // Later batches are not attempted once a batch fails.
        mock.assert_hits(1);
    }

    #[tokio::test]
    async fn search_points_sends_character_filter() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/books/points/query")
                    .json_body_partial(
                        serde_json::json!({
                            "filter": {
                                "must": [
                                    {
                                        "key": "people_mentioned",
                                        "match": { "value": "jane doe" }
                                    }
                                ]
                            }
                        })
                        .to_string(),
                    );
                then.status(200).json_body(serde_json::json!({
                    "status": "ok",
                    "time": 0.0,
                    "result": [
                        {
                            "id": "point-1",
                            "score": 0.87,
                            "payload": {
                                "text": "Jane Doe crossed the garden.",
                                "document": "book.pdf"
                            }
                        }
                    ]
                }));
            })
            .await;

        let service = service_for(&server);
        let hits = service
            .search_points(
                "books",
                vec![0.1, 0.2],
                &QueryFilterArgs {
                    character: Some("Jane Doe".into()),
                    document: None,
                },
                5,
                Some(0.25),
            )
            .await
            .expect("search");

        mock.assert();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "point-1");
        assert!((hits[0].score - 0.87).abs() < f32::EPSILON);
        let payload = hits[0].payload.as_ref().expect("payload");
        assert_eq!(payload["document"], "book.pdf");
    }
}
