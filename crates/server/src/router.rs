use crate::handlers::{documents, rag, search};
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Creates the Axum router with every route from spec §6, layered with
/// request tracing and an upload body-size limit matching the configured
/// `max_upload_bytes`.
pub fn create_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes as usize;

    Router::new()
        .route(
            "/documents/upload",
            post(documents::upload_handler).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/documents", get(documents::list_documents_handler))
        .route("/documents/{id}", get(documents::get_document_handler))
        .route("/documents/{id}", delete(documents::delete_document_handler))
        .route("/documents/{id}/chunks", get(documents::get_chunks_handler))
        .route("/search/semantic", get(search::semantic_handler))
        .route("/search/keyword", get(search::keyword_handler))
        .route("/search/hybrid", get(search::hybrid_handler))
        .route("/search/stats", get(search::stats_handler))
        .route("/rag/chat", post(rag::chat_handler))
        .route("/rag/health", get(rag::health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
