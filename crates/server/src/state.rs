//! # Application State
//!
//! Builds every collaborator the core crate defines and wires them into a
//! single `AppState`, shared by all request handlers. Grounded on the
//! teacher's `state::build_app_state`.

use crate::config::Config;
use ragdoc_core::{
    HttpChatClient, HttpEmbeddingClient, IngestionPipeline, ParserRegistry, RagOrchestrator,
    SearchService, SqliteStore, Store, UploadCoordinator,
};
use ragdoc_parser::{PdfParser, TxtParser};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub search: Arc<SearchService>,
    pub rag: Arc<RagOrchestrator>,
    pub upload: Arc<UploadCoordinator>,
    pub config: Arc<Config>,
}

/// Initializes the database, provider clients, parser registry, and the
/// ingestion worker pool, then assembles the services request handlers use.
pub async fn build_app_state(config: Config) -> anyhow::Result<AppState> {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(&config.db_path).await?);
    tracing::info!(db_path = %config.db_path, "initialized document store");

    let timeout = Duration::from_secs(config.provider_request_timeout_secs);

    let embedder: Arc<dyn ragdoc_core::EmbeddingClient> = Arc::new(HttpEmbeddingClient::new(
        config.embedding_provider.api_url.clone(),
        config.embedding_provider.model_name.clone(),
        config.embedding_provider.api_key.clone(),
        timeout,
    )?);

    let chat: Arc<dyn ragdoc_core::ChatClient> = Arc::new(HttpChatClient::new(
        config.chat_provider.api_url.clone(),
        config.chat_provider.model_name.clone(),
        config.chat_provider.api_key.clone(),
        timeout,
    )?);

    let parsers = Arc::new(
        ParserRegistry::new()
            .register(Box::new(TxtParser))
            .register(Box::new(PdfParser)),
    );

    let pipeline = Arc::new(IngestionPipeline::spawn(
        store.clone(),
        embedder.clone(),
        parsers,
        config.ingestion_worker_count,
        config.chunk_size,
        config.chunk_overlap,
    ));

    let search = Arc::new(SearchService::new(store.clone(), embedder));
    let rag = Arc::new(RagOrchestrator::new(search.clone(), chat));

    let upload = Arc::new(
        UploadCoordinator::new(store.clone(), PathBuf::from(&config.upload_dir), pipeline)
            .with_max_upload_bytes(config.max_upload_bytes),
    );

    Ok(AppState { store, search, rag, upload, config: Arc::new(config) })
}
