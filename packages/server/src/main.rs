use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{HeaderValue, Method, header};
use common::storage::filesystem::FilesystemBlobStore;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use support_server::config::{AppConfig, CorsConfig};
use support_server::extract::DocumentExtractor;
use support_server::files::FileService;
use support_server::knowledge::{IndexingWorker, SeaOrmKnowledgeIndex};
use support_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = support_server::database::init_db(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    info!("Database connected and schema synced");

    let blob_store = Arc::new(
        FilesystemBlobStore::new(config.storage.root.clone(), config.storage.max_blob_size)
            .await
            .context("Failed to initialize blob storage")?,
    );
    info!(root = %config.storage.root.display(), "Blob storage ready");

    let index = Arc::new(SeaOrmKnowledgeIndex::new(db.clone()));
    let files = Arc::new(FileService::new(
        blob_store.clone(),
        index,
        Arc::new(DocumentExtractor),
        config.server.public_url.clone(),
    ));

    // TODO: Store handle for graceful shutdown. Currently the task runs until process exit.
    let _indexing_handle = IndexingWorker::new(db, config.indexing.clone()).spawn();

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    let cors = build_cors_layer(&config.server.cors);

    let state = AppState {
        config,
        files,
        blob_store,
    };
    let app = support_server::build_router(state).layer(cors);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_cors_layer(cors: &CorsConfig) -> CorsLayer {
    let mut origins = Vec::new();
    for origin in &cors.allow_origins {
        match HeaderValue::from_str(origin) {
            Ok(value) => origins.push(value),
            Err(err) => warn!("Ignoring invalid CORS origin '{origin}': {err}"),
        }
    }

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_origin(origins)
        .max_age(Duration::from_secs(cors.max_age))
}
