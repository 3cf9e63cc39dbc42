//! The `Parser` collaborator contract. Concrete implementations
//! (`ragdoc-parser::TxtParser`, `ragdoc-parser::PdfParser`) are plugin
//! crates the same way `anyrag-pdf`/`anyrag-text` implement the
//! teacher's `Ingestor` trait against `anyrag-lib`.

use crate::errors::RagError;
use crate::types::FileType;
use async_trait::async_trait;
use std::fmt::Debug;

/// Extracted plain text plus the page count the Document record tracks
/// (1 for formats without pagination, such as `.txt`).
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: i64,
}

#[async_trait]
pub trait Parser: Send + Sync + Debug {
    fn file_type(&self) -> FileType;

    /// Extracts text from raw file bytes. No OCR fallback (spec's
    /// named-but-excluded collaborator); a file with no extractable
    /// text yields an empty `ExtractedText::text`, which the ingestion
    /// pipeline treats as the `no_content` failure.
    async fn extract(&self, bytes: &[u8]) -> Result<ExtractedText, RagError>;
}

/// Dispatches to the registered `Parser` for a Document's declared
/// `FileType`.
#[derive(Debug, Default)]
pub struct ParserRegistry {
    parsers: Vec<Box<dyn Parser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self { parsers: Vec::new() }
    }

    pub fn register(mut self, parser: Box<dyn Parser>) -> Self {
        self.parsers.push(parser);
        self
    }

    pub fn get(&self, file_type: FileType) -> Result<&dyn Parser, RagError> {
        self.parsers
            .iter()
            .find(|p| p.file_type() == file_type)
            .map(|p| p.as_ref())
            .ok_or_else(|| RagError::Validation(format!("no parser registered for {file_type:?}")))
    }
}
