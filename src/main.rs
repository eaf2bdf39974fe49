//! Binary entrypoint: load configuration, wire the pipeline, serve HTTP.

use lorevault::api::{AppState, create_router};
use lorevault::config::{get_config, init_config};
use lorevault::embedding::get_embedding_client;
use lorevault::logging::init_tracing;
use lorevault::ner::{EntityExtractor, load_recognizer};
use lorevault::processing::{IndexingService, PdfPipeline, RecursiveChunker};
use lorevault::status::StatusStore;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config();
    init_tracing();

    let config = get_config();
    tracing::info!(
        collection = %config.qdrant_collection_name,
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        "Starting lorevault"
    );

    let recognizer = load_recognizer()?;
    let chunker = RecursiveChunker::with_defaults(config.chunk_size, config.chunk_overlap)?;
    let pipeline = Arc::new(PdfPipeline::new(chunker, EntityExtractor::new(recognizer)));

    let service = IndexingService::new(pipeline, get_embedding_client()).await?;
    let status = Arc::new(StatusStore::new(Duration::from_secs(config.status_ttl_secs)));

    let app = create_router(AppState {
        service: Arc::new(service),
        status,
        upload_dir: PathBuf::from(&config.upload_dir),
    });

    let listener = bind_listener(config.server_port).await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "Listening");
    println!("lorevault listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Bind the configured port, or scan a small local range when none is set.
async fn bind_listener(configured_port: Option<u16>) -> anyhow::Result<TcpListener> {
    if let Some(port) = configured_port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        return Ok(TcpListener::bind(addr).await?);
    }

    for port in 8600..8700u16 {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        if let Ok(listener) = TcpListener::bind(addr).await {
            return Ok(listener);
        }
    }
    anyhow::bail!("no free port in 8600..8700");
}
