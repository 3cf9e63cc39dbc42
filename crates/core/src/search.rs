//! # SearchService (C6)
//!
//! Ranks chunks for a query under three modes. Grounded on the teacher's
//! `handlers::search::hybrid_search_handler` two-stage fetch-then-fuse
//! shape, generalized from RRF/LLM-rerank fusion to the weighted-sum
//! fusion this crate's contract requires.

use crate::errors::RagError;
use crate::providers::EmbeddingClient;
use crate::store::Store;
use crate::types::{ContextChunk, ScoredChunk};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

/// Candidate expansion multiplier for hybrid fusion, capped at this
/// absolute ceiling regardless of `k`.
const HYBRID_EXPANSION_CAP: usize = 40;

pub struct SearchService {
    store: Arc<dyn Store>,
    embedder: Arc<dyn EmbeddingClient>,
}

impl SearchService {
    pub fn new(store: Arc<dyn Store>, embedder: Arc<dyn EmbeddingClient>) -> Self {
        Self { store, embedder }
    }

    pub async fn semantic(
        &self,
        query: &str,
        k: usize,
        filter_document_id: Option<&str>,
        min_similarity: Option<f64>,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        let query_vector = self.embedder.embed_one(query).await?;
        self.store
            .search_vector(&query_vector, k, filter_document_id, min_similarity)
            .await
    }

    pub async fn lexical(
        &self,
        query: &str,
        k: usize,
        filter_document_id: Option<&str>,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        self.store.search_substring(query, k, filter_document_id).await
    }

    /// `combined = wS * s_sem + wK * s_lex`, missing components treated
    /// as 0. `wS, wK >= 0` and `wS + wK > 0`.
    pub async fn hybrid(
        &self,
        query: &str,
        k: usize,
        filter_document_id: Option<&str>,
        w_semantic: f64,
        w_lexical: f64,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        if w_semantic < 0.0 || w_lexical < 0.0 || w_semantic + w_lexical <= 0.0 {
            return Err(RagError::Validation(
                "hybrid weights must be non-negative and sum to more than zero".to_string(),
            ));
        }

        let expanded = (k.saturating_mul(4)).min(HYBRID_EXPANSION_CAP).max(k);

        let (semantic, lexical) = tokio::join!(
            self.semantic(query, expanded, filter_document_id, None),
            self.lexical(query, expanded, filter_document_id)
        );
        let semantic = semantic?;
        let lexical = lexical?;

        let mut by_id: HashMap<String, ScoredChunk> = HashMap::new();
        for hit in semantic {
            by_id.insert(hit.chunk.id.clone(), hit);
        }
        for hit in lexical {
            by_id
                .entry(hit.chunk.id.clone())
                .and_modify(|existing| existing.lexical = hit.lexical)
                .or_insert(hit);
        }

        let mut combined: Vec<ScoredChunk> = by_id
            .into_values()
            .map(|mut hit| {
                let s_sem = hit.similarity.unwrap_or(0.0);
                let s_lex = hit.lexical.unwrap_or(0.0);
                hit.combined = w_semantic * s_sem + w_lexical * s_lex;
                hit
            })
            .collect();

        sort_and_truncate(&mut combined, k);
        Ok(combined)
    }

    /// Same as `hybrid`, but fetches each result's immediate predecessor
    /// and successor chunk for presentation. Used by the orchestrator.
    pub async fn hybrid_with_context(
        &self,
        query: &str,
        k: usize,
        filter_document_id: Option<&str>,
        w_semantic: f64,
        w_lexical: f64,
    ) -> Result<Vec<ContextChunk>, RagError> {
        let hits = self.hybrid(query, k, filter_document_id, w_semantic, w_lexical).await?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let (predecessor, successor) = self
                .store
                .get_chunk_neighbors(&hit.chunk.document_id, hit.chunk.chunk_index)
                .await?;
            results.push(ContextChunk { scored: hit, predecessor, successor });
        }
        Ok(results)
    }
}

/// Sorts descending by `combined`, breaking ties on `(document_id,
/// chunk_index)` ascending for deterministic output, then truncates to
/// `k`.
fn sort_and_truncate(results: &mut Vec<ScoredChunk>, k: usize) {
    results.sort_by(|a, b| {
        b.combined
            .partial_cmp(&a.combined)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.chunk.document_id.cmp(&b.chunk.document_id))
            .then_with(|| a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
    });
    results.truncate(k);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::types::{FileType, NewChunk, NewDocument};
    use async_trait::async_trait;

    #[derive(Debug, Clone)]
    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl EmbeddingClient for FixedEmbedder {
        async fn embed_one(&self, _text: &str) -> Result<Vec<f32>, RagError> {
            Ok(self.0.clone())
        }
        async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
            Ok(texts.iter().map(|_| self.0.clone()).collect())
        }
    }

    async fn seeded_store() -> Arc<dyn Store> {
        let store = SqliteStore::new(":memory:").await.unwrap();
        let doc = store
            .create_document(NewDocument {
                id: "doc-1".to_string(),
                filename: "a.txt".to_string(),
                file_type: FileType::Txt,
                size_bytes: 10,
                content_hash: "hash-1".to_string(),
                storage_path: "/data/hash-1".to_string(),
            })
            .await
            .unwrap();
        store
            .update_document_status(&doc.id, crate::errors::ProcessingStatus::Processing, None, None)
            .await
            .unwrap();
        store
            .create_chunks_batch(
                &doc.id,
                vec![
                    NewChunk { chunk_index: 0, text: "rust is great".to_string(), vector: Some(vec![1.0, 0.0]) },
                    NewChunk { chunk_index: 1, text: "python is fine".to_string(), vector: Some(vec![0.0, 1.0]) },
                ],
            )
            .await
            .unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn hybrid_rejects_invalid_weights() {
        let store = seeded_store().await;
        let embedder: Arc<dyn EmbeddingClient> = Arc::new(FixedEmbedder(vec![1.0, 0.0]));
        let search = SearchService::new(store, embedder);
        let result = search.hybrid("rust", 5, None, 0.0, 0.0).await;
        assert!(matches!(result, Err(RagError::Validation(_))));
    }

    #[tokio::test]
    async fn hybrid_combines_semantic_and_lexical_scores() {
        let store = seeded_store().await;
        let embedder: Arc<dyn EmbeddingClient> = Arc::new(FixedEmbedder(vec![1.0, 0.0]));
        let search = SearchService::new(store, embedder);
        let results = search.hybrid("rust", 5, None, 0.7, 0.3).await.unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].chunk.text, "rust is great");
    }

    #[tokio::test]
    async fn context_mode_fetches_neighbors() {
        let store = seeded_store().await;
        let embedder: Arc<dyn EmbeddingClient> = Arc::new(FixedEmbedder(vec![1.0, 0.0]));
        let search = SearchService::new(store, embedder);
        let results = search.hybrid_with_context("rust", 5, None, 0.7, 0.3).await.unwrap();
        let top = results.iter().find(|c| c.scored.chunk.chunk_index == 0).unwrap();
        assert!(top.predecessor.is_none());
        assert!(top.successor.is_some());
    }
}
