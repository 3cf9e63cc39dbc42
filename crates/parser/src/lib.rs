//! # ragdoc-parser
//!
//! Plugin crate implementing `ragdoc_core::Parser` for the file types the
//! ingestion pipeline accepts: plain text (passthrough) and PDF (local
//! text extraction, grounded on the teacher's `extract_text_from_pdf`).

use async_trait::async_trait;
use pdf::content::{Op, TextDrawAdjusted};
use pdf::file::FileOptions;
use ragdoc_core::errors::RagError;
use ragdoc_core::parser::{ExtractedText, Parser};
use ragdoc_core::types::FileType;
use tracing::{info, warn};

/// UTF-8 lossy passthrough; no chunking or normalization happens here,
/// that is the Chunker's job.
#[derive(Debug, Clone, Copy, Default)]
pub struct TxtParser;

#[async_trait]
impl Parser for TxtParser {
    fn file_type(&self) -> FileType {
        FileType::Txt
    }

    async fn extract(&self, bytes: &[u8]) -> Result<ExtractedText, RagError> {
        let text = String::from_utf8_lossy(bytes).into_owned();
        Ok(ExtractedText { text, page_count: 1 })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfParser;

#[async_trait]
impl Parser for PdfParser {
    fn file_type(&self) -> FileType {
        FileType::Pdf
    }

    async fn extract(&self, bytes: &[u8]) -> Result<ExtractedText, RagError> {
        let data = bytes.to_vec();
        let result = tokio::task::spawn_blocking(move || extract_text_from_pdf(&data))
            .await
            .map_err(|e| RagError::Provider(format!("PDF parsing task panicked: {e}")))?;
        result
    }
}

/// Walks every page's content stream, collecting `TextDraw` and
/// `TextDrawAdjusted` runs. CPU-bound, so callers run it via
/// `spawn_blocking` rather than on an async worker thread.
fn extract_text_from_pdf(data: &[u8]) -> Result<ExtractedText, RagError> {
    let file = FileOptions::cached()
        .load(data)
        .map_err(|e| RagError::Validation(format!("failed to parse PDF: {e}")))?;
    let resolver = file.resolver();
    let mut full_text = String::new();
    let page_count = file.num_pages();

    for page_num in 0..page_count {
        let page = match file.get_page(page_num) {
            Ok(page) => page,
            Err(e) => {
                warn!(page_num, error = %e, "failed to load PDF page, skipping");
                continue;
            }
        };
        let Some(content) = &page.contents else {
            warn!(page_num, "page has no content stream");
            continue;
        };
        let operations = content
            .operations(&resolver)
            .map_err(|e| RagError::Validation(format!("failed to read PDF page operators: {e}")))?;
        for op in operations.iter() {
            match op {
                Op::TextDraw { text } => full_text.push_str(&text.to_string_lossy()),
                Op::TextDrawAdjusted { array } => {
                    for item in array.iter() {
                        if let TextDrawAdjusted::Text(text) = item {
                            full_text.push_str(&text.to_string_lossy());
                        }
                    }
                }
                _ => {}
            }
        }
        full_text.push_str("\n\n");
    }

    info!(page_count, chars = full_text.len(), "extracted text from PDF");
    Ok(ExtractedText { text: full_text, page_count: page_count as i64 })
}
