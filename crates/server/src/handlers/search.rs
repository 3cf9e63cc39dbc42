//! Search handlers (spec §6 `/search/...`). Each mode maps directly onto a
//! `SearchService` method; provider failures surface as 503 here, per the
//! taxonomy's "Inside search: propagated as 503" rule.

use crate::errors::AppError;
use crate::state::AppState;
use crate::types::{
    HybridSearchQuery, HybridSearchResponse, HybridSearchResult, HybridWeights, KeywordSearchQuery,
    KeywordSearchResponse, KeywordSearchResult, SearchStatsResponse, SemanticSearchQuery,
    SemanticSearchResponse, SemanticSearchResult,
};
use axum::extract::{Query, State};
use axum::Json;
use ragdoc_core::RagError;

fn require_query(query: &str) -> Result<(), AppError> {
    if query.trim().is_empty() {
        return Err(AppError::from(RagError::Validation("query must not be empty".to_string())));
    }
    Ok(())
}

pub async fn semantic_handler(
    State(state): State<AppState>,
    Query(q): Query<SemanticSearchQuery>,
) -> Result<Json<SemanticSearchResponse>, AppError> {
    require_query(&q.query)?;
    let top_k = q.top_k.unwrap_or(state.config.search_top_k_default);

    let hits = state
        .search
        .semantic(&q.query, top_k, q.document_id.as_deref(), q.min_similarity)
        .await
        .map_err(AppError::for_search)?;

    let results = hits
        .into_iter()
        .map(|hit| SemanticSearchResult {
            chunk_id: hit.chunk.id,
            document_id: hit.chunk.document_id,
            document_name: hit.document_filename,
            chunk_index: hit.chunk.chunk_index,
            text: hit.chunk.text,
            similarity_score: hit.similarity.unwrap_or(0.0),
        })
        .collect();

    Ok(Json(SemanticSearchResponse { results }))
}

pub async fn keyword_handler(
    State(state): State<AppState>,
    Query(q): Query<KeywordSearchQuery>,
) -> Result<Json<KeywordSearchResponse>, AppError> {
    require_query(&q.query)?;
    let top_k = q.top_k.unwrap_or(state.config.search_top_k_default);

    let hits = state
        .search
        .lexical(&q.query, top_k, q.document_id.as_deref())
        .await
        .map_err(AppError::for_search)?;

    let results = hits
        .into_iter()
        .map(|hit| KeywordSearchResult {
            chunk_id: hit.chunk.id,
            document_id: hit.chunk.document_id,
            document_name: hit.document_filename,
            chunk_index: hit.chunk.chunk_index,
            text: hit.chunk.text,
            relevance_score: hit.lexical.unwrap_or(0.0),
        })
        .collect();

    Ok(Json(KeywordSearchResponse { results }))
}

pub async fn hybrid_handler(
    State(state): State<AppState>,
    Query(q): Query<HybridSearchQuery>,
) -> Result<Json<HybridSearchResponse>, AppError> {
    require_query(&q.query)?;
    let top_k = q.top_k.unwrap_or(state.config.search_top_k_default);
    let semantic_weight = q.semantic_weight.unwrap_or(state.config.semantic_weight);
    let keyword_weight = q.keyword_weight.unwrap_or(state.config.keyword_weight);

    let hits = state
        .search
        .hybrid(&q.query, top_k, q.document_id.as_deref(), semantic_weight, keyword_weight)
        .await
        .map_err(AppError::for_search)?;

    let results = hits
        .into_iter()
        .map(|hit| HybridSearchResult {
            chunk_id: hit.chunk.id,
            document_id: hit.chunk.document_id,
            document_name: hit.document_filename,
            chunk_index: hit.chunk.chunk_index,
            text: hit.chunk.text,
            combined_score: hit.combined,
            semantic_score: hit.similarity.unwrap_or(0.0),
            keyword_score: hit.lexical.unwrap_or(0.0),
        })
        .collect();

    Ok(Json(HybridSearchResponse {
        results,
        weights: HybridWeights { semantic_weight, keyword_weight },
    }))
}

pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<SearchStatsResponse>, AppError> {
    Ok(Json(compute_stats(&state).await?))
}

/// Shared by `/search/stats` and `/rag/health`. No aggregate count exists
/// on the Store trait, so this walks every document's chunks; fine at the
/// scale this service targets, not meant for a documents table in the
/// millions.
pub(crate) async fn compute_stats(state: &AppState) -> Result<SearchStatsResponse, RagError> {
    let total_documents = state.store.count_documents(None).await?;
    let documents = state.store.list_documents(0, total_documents.max(1), None).await?;

    let mut total_chunks = 0i64;
    let mut chunks_with_embeddings = 0i64;
    for document in &documents {
        let chunks = state.store.get_chunks(&document.id).await?;
        total_chunks += chunks.len() as i64;
        chunks_with_embeddings += chunks.iter().filter(|c| c.vector.is_some()).count() as i64;
    }

    let searchable_percentage = if total_chunks > 0 {
        (chunks_with_embeddings as f64 / total_chunks as f64) * 100.0
    } else {
        0.0
    };

    Ok(SearchStatsResponse { total_documents, total_chunks, chunks_with_embeddings, searchable_percentage })
}
