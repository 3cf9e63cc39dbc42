//! Shared data types for documents, chunks, and search results.

use crate::errors::ProcessingStatus;
use serde::{Deserialize, Serialize};

/// File types the ingestion pipeline accepts (spec §4.8 allow-list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Txt,
    Pdf,
}

impl FileType {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" => Some(FileType::Txt),
            "pdf" => Some(FileType::Pdf),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Txt => "txt",
            FileType::Pdf => "pdf",
        }
    }
}

/// An ingested file (spec §3 "Document").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    pub file_type: FileType,
    pub size_bytes: i64,
    pub content_hash: String,
    pub storage_path: String,
    pub character_count: i64,
    pub word_count: i64,
    pub page_count: i64,
    pub chunk_count: i64,
    pub processing_status: ProcessingStatus,
    pub failure_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A passage of a Document (spec §3 "Chunk").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub char_length: i64,
    pub vector: Option<Vec<f32>>,
}

/// A chunk ready to be persisted by `Store::create_chunks_batch`.
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub chunk_index: i64,
    pub text: String,
    pub vector: Option<Vec<f32>>,
}

/// A Document ready to be persisted by `Store::create_document`.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub id: String,
    pub filename: String,
    pub file_type: FileType,
    pub size_bytes: i64,
    pub content_hash: String,
    pub storage_path: String,
}

/// Extracted counts recorded alongside a `completed` transition (spec
/// §4.5 step 5).
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentCounts {
    pub character_count: i64,
    pub word_count: i64,
    pub page_count: i64,
    pub chunk_count: i64,
}

/// A scored hit from any of the three search modes.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub document_filename: String,
    pub similarity: Option<f64>,
    pub lexical: Option<f64>,
    pub combined: f64,
}

/// A hybrid hit plus its immediate neighbors in the same Document, used
/// by the orchestrator's context mode. Neighbors are presentation-only
/// and never affect ranking.
#[derive(Debug, Clone, Serialize)]
pub struct ContextChunk {
    pub scored: ScoredChunk,
    pub predecessor: Option<Chunk>,
    pub successor: Option<Chunk>,
}
