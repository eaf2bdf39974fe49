//! HTTP surface: document upload, status polling, similarity search, metrics.

use crate::processing::{IndexError, IngestApi, PipelineError, QueryRequest, SearchError};
use crate::status::{ProcessingStatus, StatusStore};
use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

/// Shared state threaded through every route handler.
#[derive(Clone)]
pub struct AppState {
    /// Indexing and search backend.
    pub service: Arc<dyn IngestApi>,
    /// Status store polled by upload clients.
    pub status: Arc<StatusStore>,
    /// Directory uploaded PDFs are spooled into before processing.
    pub upload_dir: PathBuf,
}

/// Build the application router with all routes and CORS applied.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/documents", post(upload_document))
        .route("/documents/:id", get(document_status))
        .route("/query", post(run_query))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<SearchError> for ApiError {
    fn from(error: SearchError) -> Self {
        tracing::error!(error = %error, "Search request failed");
        ApiError::Internal(error.to_string())
    }
}

#[derive(Serialize)]
struct UploadAccepted {
    id: Uuid,
    status: ProcessingStatus,
    document_name: String,
}

async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut saved: Option<(Uuid, String, PathBuf)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(format!("invalid multipart body: {err}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let document_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "document.pdf".to_string());
        if !document_name.to_lowercase().ends_with(".pdf") {
            return Err(ApiError::BadRequest(format!(
                "only PDF uploads are accepted, got '{document_name}'"
            )));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::BadRequest(format!("failed to read upload: {err}")))?;
        if bytes.is_empty() {
            return Err(ApiError::BadRequest("uploaded file is empty".to_string()));
        }

        let id = Uuid::new_v4();
        let path = state.upload_dir.join(format!("{id}.pdf"));
        tokio::fs::create_dir_all(&state.upload_dir)
            .await
            .map_err(|err| ApiError::Internal(format!("failed to create upload dir: {err}")))?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|err| ApiError::Internal(format!("failed to store upload: {err}")))?;

        saved = Some((id, document_name, path));
        break;
    }

    let Some((id, document_name, path)) = saved else {
        return Err(ApiError::BadRequest(
            "multipart body must contain a 'file' field".to_string(),
        ));
    };

    state.status.register(id, document_name.clone()).await;
    tracing::info!(document_id = %id, document = %document_name, "Upload accepted");

    let service = Arc::clone(&state.service);
    let status = Arc::clone(&state.status);
    tokio::spawn(async move {
        status.set(id, ProcessingStatus::Processing, None).await;
        match service.process_document(path).await {
            Ok(outcome) => {
                status
                    .set(
                        id,
                        ProcessingStatus::Completed,
                        Some(format!(
                            "indexed {} chunks across {} pages",
                            outcome.chunk_count, outcome.page_count
                        )),
                    )
                    .await;
            }
            Err(error) => {
                tracing::error!(document_id = %id, error = %error, "Document processing failed");
                status
                    .set(id, ProcessingStatus::Failed, Some(failure_message(&error)))
                    .await;
            }
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadAccepted {
            id,
            status: ProcessingStatus::Pending,
            document_name,
        }),
    ))
}

/// Render an ingestion failure for status pollers, marking input problems
/// (missing, corrupt, or empty documents) as the uploader's fault.
fn failure_message(error: &IndexError) -> String {
    let rejected_input = matches!(
        error,
        IndexError::Pipeline(
            PipelineError::DocumentNotFound(_)
                | PipelineError::CorruptDocument { .. }
                | PipelineError::EmptyDocument
        )
    );
    if rejected_input {
        format!("rejected input: {error}")
    } else {
        format!("internal error: {error}")
    }
}

async fn document_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    match state.status.get(id).await {
        Some(entry) => Ok(Json(entry)),
        None => Err(ApiError::NotFound(format!("no status for document {id}"))),
    }
}

#[derive(Deserialize)]
struct QueryBody {
    question: String,
    #[serde(default)]
    character: Option<String>,
    #[serde(default)]
    document: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

async fn run_query(
    State(state): State<AppState>,
    Json(body): Json<QueryBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.question.trim().is_empty() {
        return Err(ApiError::BadRequest("question must not be empty".to_string()));
    }

    let hits = state
        .service
        .query(QueryRequest {
            query_text: body.question,
            character: body.character,
            document: body.document,
            limit: body.limit,
        })
        .await?;

    Ok(Json(json!({ "results": hits })))
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.metrics_snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsSnapshot;
    use crate::processing::{IngestOutcome, QueryHit};
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    struct StubService {
        fail_processing: bool,
    }

    #[async_trait]
    impl IngestApi for StubService {
        async fn process_document(&self, path: PathBuf) -> Result<IngestOutcome, IndexError> {
            if self.fail_processing {
                return Err(IndexError::Pipeline(PipelineError::DocumentNotFound(path)));
            }
            Ok(IngestOutcome {
                chunk_count: 4,
                page_count: 2,
                people_mentioned: 1,
                points_upserted: 4,
            })
        }

        async fn query(&self, request: QueryRequest) -> Result<Vec<QueryHit>, SearchError> {
            Ok(vec![QueryHit {
                id: "p1".into(),
                score: 0.9,
                text: Some(format!("answering: {}", request.query_text)),
                document: Some("book.pdf".into()),
                page_number: Some(1),
                people_mentioned: request.character.map(|name| vec![name.to_lowercase()]),
            }])
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                documents_processed: 2,
                documents_failed: 0,
                chunks_indexed: 8,
            }
        }
    }

    fn test_router(fail_processing: bool, upload_dir: PathBuf) -> Router {
        create_router(AppState {
            service: Arc::new(StubService { fail_processing }),
            status: Arc::new(StatusStore::new(Duration::from_secs(60))),
            upload_dir,
        })
    }

    fn multipart_upload(filename: &str, contents: &[u8]) -> Request<Body> {
        let boundary = "test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
        body.extend_from_slice(contents);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/documents")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn upload_accepts_pdf_and_returns_pending() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_router(false, dir.path().to_path_buf());

        let response = app
            .oneshot(multipart_upload("book.pdf", b"%PDF-1.4 fake"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = json_body(response).await;
        assert_eq!(body["status"], "pending");
        assert_eq!(body["document_name"], "book.pdf");
        assert!(body["id"].as_str().is_some());
    }

    #[tokio::test]
    async fn upload_rejects_non_pdf() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_router(false, dir.path().to_path_buf());

        let response = app
            .oneshot(multipart_upload("notes.txt", b"plain text"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upload_rejects_missing_file_field() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_router(false, dir.path().to_path_buf());

        let request = Request::builder()
            .method("POST")
            .uri("/documents")
            .header(
                "content-type",
                "multipart/form-data; boundary=test-boundary",
            )
            .body(Body::from("--test-boundary--\r\n"))
            .expect("request");

        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn status_endpoint_reports_processing_outcome() {
        let dir = tempfile::tempdir().expect("tempdir");
        let status = Arc::new(StatusStore::new(Duration::from_secs(60)));
        let app = create_router(AppState {
            service: Arc::new(StubService {
                fail_processing: true,
            }),
            status: Arc::clone(&status),
            upload_dir: dir.path().to_path_buf(),
        });

        let response = app
            .clone()
            .oneshot(multipart_upload("book.pdf", b"%PDF-1.4 fake"))
            .await
            .expect("response");
        let body = json_body(response).await;
        let id: Uuid = body["id"].as_str().expect("id").parse().expect("uuid");

        // Give the background task time to run against the stub.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/documents/{id}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "failed");
        let message = body["message"].as_str().expect("message");
        assert!(message.starts_with("rejected input:"), "{message}");
        assert!(message.contains("not found"));
    }

    #[tokio::test]
    async fn status_endpoint_returns_404_for_unknown_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_router(false, dir.path().to_path_buf());

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/documents/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn query_returns_hits() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_router(false, dir.path().to_path_buf());

        let request = Request::builder()
            .method("POST")
            .uri("/query")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({
                    "question": "who crossed the garden?",
                    "character": "Jane Doe"
                })
                .to_string(),
            ))
            .expect("request");

        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let results = body["results"].as_array().expect("results");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["people_mentioned"][0], "jane doe");
    }

    #[tokio::test]
    async fn query_rejects_blank_question() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_router(false, dir.path().to_path_buf());

        let request = Request::builder()
            .method("POST")
            .uri("/query")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({ "question": "   " }).to_string()))
            .expect("request");

        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn metrics_endpoint_reports_counters() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_router(false, dir.path().to_path_buf());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["documents_processed"], 2);
        assert_eq!(body["chunks_indexed"], 8);
    }
}
