//! # Store (C4)
//!
//! Durable persistence and retrieval of Documents and Chunks with vector
//! similarity. Everything else in this crate reaches the database only
//! through this trait.

pub mod schema;
pub mod sqlite;

use crate::errors::{ProcessingStatus, RagError};
use crate::types::{Chunk, Document, DocumentCounts, NewChunk, NewDocument, ScoredChunk};
use async_trait::async_trait;
use std::fmt::Debug;

pub use sqlite::SqliteStore;

#[async_trait]
pub trait Store: Send + Sync + Debug {
    /// Inserts a new Document in `pending`. If a Document with the same
    /// `content_hash` already exists, fails with `RagError::DuplicateContent`
    /// carrying its id so the caller can collapse to it.
    async fn create_document(&self, new: NewDocument) -> Result<Document, RagError>;

    async fn get_document(&self, id: &str) -> Result<Document, RagError>;

    async fn get_document_by_hash(&self, hash: &str) -> Result<Option<Document>, RagError>;

    async fn list_documents(
        &self,
        offset: i64,
        limit: i64,
        status_filter: Option<ProcessingStatus>,
    ) -> Result<Vec<Document>, RagError>;

    async fn count_documents(&self, status_filter: Option<ProcessingStatus>) -> Result<i64, RagError>;

    /// Guarded by `ProcessingStatus::can_transition_to`; illegal
    /// transitions fail with `RagError::InvalidTransition`.
    async fn update_document_status(
        &self,
        id: &str,
        new_status: ProcessingStatus,
        failure_message: Option<String>,
        counts: Option<DocumentCounts>,
    ) -> Result<(), RagError>;

    /// Cascades to Chunks; removal of the on-disk file is the caller's
    /// responsibility (the Store only owns the database rows).
    async fn delete_document(&self, id: &str) -> Result<(), RagError>;

    /// Atomic: either all rows in `chunks` appear or none do.
    async fn create_chunks_batch(&self, document_id: &str, chunks: Vec<NewChunk>) -> Result<(), RagError>;

    async fn get_chunks(&self, document_id: &str) -> Result<Vec<Chunk>, RagError>;

    /// The chunk immediately before and after `chunk_index` in the same
    /// Document, for the orchestrator's context mode.
    async fn get_chunk_neighbors(
        &self,
        document_id: &str,
        chunk_index: i64,
    ) -> Result<(Option<Chunk>, Option<Chunk>), RagError>;

    /// Top-`k` Chunks by cosine similarity, descending, ties broken on
    /// `(document_id, chunk_index)`.
    async fn search_vector(
        &self,
        query_vector: &[f32],
        k: usize,
        filter_document_id: Option<&str>,
        min_similarity: Option<f64>,
    ) -> Result<Vec<ScoredChunk>, RagError>;

    /// Up to `k` Chunks whose text contains `query_text` as a
    /// case-insensitive substring, scored by normalized occurrence
    /// frequency.
    async fn search_substring(
        &self,
        query_text: &str,
        k: usize,
        filter_document_id: Option<&str>,
    ) -> Result<Vec<ScoredChunk>, RagError>;
}
