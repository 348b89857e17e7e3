use rmcp::{ServiceExt, transport::stdio};
use stddoc_mcp::{Config, DocServer, DocSession, DocState, FileStore, KeyValueStore, MemoryStore};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the MCP protocol
    stddoc_mcp::tracing::init();

    let config = Config::load()?;
    tracing::info!(version = %config.version, doc_root = %config.doc_root, "Starting stddoc-mcp MCP server");

    let storage: Arc<dyn KeyValueStore> = match config.storage_dir() {
        Some(dir) => {
            tracing::debug!(dir = %dir.display(), "Persisting favorites and history");
            Arc::new(FileStore::new(dir))
        }
        None => {
            tracing::warn!("No storage directory available, favorites and history will not persist");
            Arc::new(MemoryStore::new())
        }
    };

    let state = Arc::new(DocState::from_config(&config)?);
    let session = Arc::new(DocSession::new(state, config.version.clone(), storage)?);

    // Preload so the first search does not wait on the network
    drop(session.load().await);

    let server = DocServer::new(session);
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("Error serving MCP server: {:?}", e);
    })?;

    service.waiting().await?;

    Ok(())
}
