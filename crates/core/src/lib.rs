//! # ragdoc-core
//!
//! The document RAG engine: chunking, embedding/chat provider adapters,
//! persistence, ingestion, search, and grounded-answer orchestration.
//! `ragdoc-server` is a thin HTTP shell around this crate.

pub mod chunker;
pub mod errors;
pub mod ingestion;
pub mod parser;
pub mod providers;
pub mod rag;
pub mod search;
pub mod store;
pub mod types;
pub mod upload;

pub use errors::{ProcessingStatus, RagError};
pub use ingestion::IngestionPipeline;
pub use parser::{ExtractedText, Parser, ParserRegistry};
pub use providers::{ChatClient, EmbeddingClient, HttpChatClient, HttpEmbeddingClient};
pub use rag::{RagAnswer, RagOrchestrator, SourceRef};
pub use search::SearchService;
pub use store::{SqliteStore, Store};
pub use types::{
    Chunk, ContextChunk, Document, DocumentCounts, FileType, NewChunk, NewDocument, ScoredChunk,
};
pub use upload::{UploadCoordinator, MAX_UPLOAD_BYTES};
