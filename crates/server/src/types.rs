//! Request/response DTOs for the HTTP surface (spec §6).

use ragdoc_core::{Chunk, Document, ProcessingStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct UploadMetadata {
    pub character_count: i64,
    pub word_count: i64,
    pub page_count: i64,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub document_id: String,
    pub filename: String,
    pub size: i64,
    pub hash: String,
    pub chunks_created: i64,
    pub status: ProcessingStatus,
    pub metadata: UploadMetadata,
}

impl From<Document> for UploadResponse {
    fn from(doc: Document) -> Self {
        Self {
            document_id: doc.id,
            filename: doc.filename,
            size: doc.size_bytes,
            hash: doc.content_hash,
            chunks_created: doc.chunk_count,
            status: doc.processing_status,
            metadata: UploadMetadata {
                character_count: doc.character_count,
                word_count: doc.word_count,
                page_count: doc.page_count,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub document_id: String,
    pub filename: String,
    pub file_type: String,
    pub size_bytes: i64,
    pub content_hash: String,
    pub character_count: i64,
    pub word_count: i64,
    pub page_count: i64,
    pub chunk_count: i64,
    pub processing_status: ProcessingStatus,
    pub failure_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            document_id: doc.id,
            filename: doc.filename,
            file_type: doc.file_type.as_str().to_string(),
            size_bytes: doc.size_bytes,
            content_hash: doc.content_hash,
            character_count: doc.character_count,
            word_count: doc.word_count,
            page_count: doc.page_count,
            chunk_count: doc.chunk_count,
            processing_status: doc.processing_status,
            failure_message: doc.failure_message,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct ListDocumentsQuery {
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListDocumentsResponse {
    pub documents: Vec<DocumentResponse>,
    pub total_count: i64,
}

#[derive(Debug, Serialize)]
pub struct ChunkResponse {
    pub chunk_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub has_vector: bool,
}

impl From<Chunk> for ChunkResponse {
    fn from(chunk: Chunk) -> Self {
        Self {
            chunk_id: chunk.id,
            chunk_index: chunk.chunk_index,
            has_vector: chunk.vector.is_some(),
            text: chunk.text,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChunkListResponse {
    pub chunks: Vec<ChunkResponse>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct SemanticSearchQuery {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub min_similarity: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct KeywordSearchQuery {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub document_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HybridSearchQuery {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub semantic_weight: Option<f64>,
    #[serde(default)]
    pub keyword_weight: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SemanticSearchResult {
    pub chunk_id: String,
    pub document_id: String,
    pub document_name: String,
    pub chunk_index: i64,
    pub text: String,
    pub similarity_score: f64,
}

#[derive(Debug, Serialize)]
pub struct SemanticSearchResponse {
    pub results: Vec<SemanticSearchResult>,
}

#[derive(Debug, Serialize)]
pub struct KeywordSearchResult {
    pub chunk_id: String,
    pub document_id: String,
    pub document_name: String,
    pub chunk_index: i64,
    pub text: String,
    pub relevance_score: f64,
}

#[derive(Debug, Serialize)]
pub struct KeywordSearchResponse {
    pub results: Vec<KeywordSearchResult>,
}

#[derive(Debug, Serialize)]
pub struct HybridSearchResult {
    pub chunk_id: String,
    pub document_id: String,
    pub document_name: String,
    pub chunk_index: i64,
    pub text: String,
    pub combined_score: f64,
    pub semantic_score: f64,
    pub keyword_score: f64,
}

#[derive(Debug, Serialize)]
pub struct HybridWeights {
    pub semantic_weight: f64,
    pub keyword_weight: f64,
}

#[derive(Debug, Serialize)]
pub struct HybridSearchResponse {
    pub results: Vec<HybridSearchResult>,
    pub weights: HybridWeights,
}

#[derive(Debug, Serialize)]
pub struct SearchStatsResponse {
    pub total_documents: i64,
    pub total_chunks: i64,
    pub chunks_with_embeddings: i64,
    pub searchable_percentage: f64,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequestMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatRequestMessage>,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ChatSourceResponse {
    pub index: usize,
    pub document_id: String,
    pub document_filename: String,
    pub chunk_index: i64,
    pub relevance_score: f64,
    pub text_preview: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponseBody {
    pub answer: String,
    pub sources: Vec<ChatSourceResponse>,
    pub context_used: usize,
    pub model: String,
    pub tokens_used: u32,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub statistics: SearchStatsResponse,
}
