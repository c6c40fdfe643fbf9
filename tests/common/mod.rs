use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use sizetrack::server::{Server, ServerConfig};
use sizetrack::{
    FileArtifactStore, FileHistoryStore, HistoryStore, PlotRenderer, SizeAggregator,
    SizeHistoryRecord,
};

pub fn setup_temp_dir() -> Result<TempDir> {
    tempfile::tempdir().map_err(anyhow::Error::from)
}

#[allow(dead_code)]
pub fn open_store(dir: &Path) -> Result<Arc<FileHistoryStore>> {
    Ok(Arc::new(FileHistoryStore::open(dir)?))
}

#[allow(dead_code)]
pub fn seed_record(
    store: &FileHistoryStore,
    bucket: &str,
    timestamp: i64,
    size_bytes: u64,
    object_count: u64,
) -> Result<()> {
    store.append(&SizeHistoryRecord {
        bucket: bucket.to_string(),
        timestamp,
        size_bytes,
        object_count,
        flagged: false,
    })?;
    Ok(())
}

/// Spawn a server on an ephemeral port; returns its base URL and the task
/// handle to abort when done
#[allow(dead_code)]
pub async fn start_test_server(
    history: Arc<FileHistoryStore>,
    artifact_dir: &Path,
) -> Result<(String, tokio::task::JoinHandle<()>)> {
    let artifacts = Arc::new(FileArtifactStore::open(artifact_dir)?);
    let aggregator = Arc::new(SizeAggregator::new(Arc::clone(&history)));
    let renderer = Arc::new(PlotRenderer::new(Arc::clone(&history), artifacts));

    let server = Server::new(
        history,
        aggregator,
        renderer,
        ServerConfig {
            version: "test".to_string(),
        },
    );
    let app = server.router();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}", listener.local_addr()?);
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Ok((base_url, server_handle))
}
