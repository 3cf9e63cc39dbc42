//! # UploadCoordinator (C8)
//!
//! Accepts a file, produces a Document in `pending`, and enqueues
//! ingestion. Grounded on the teacher's content-hash-as-identity
//! pattern (`ingest::pdf`'s `Uuid::new_v5`/MD5 dedup key), generalized
//! to SHA-256 because spec §3 names it explicitly as the content hash.

use crate::errors::RagError;
use crate::ingestion::IngestionPipeline;
use crate::store::Store;
use crate::types::{Document, FileType, NewDocument};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Default cap on upload size (spec §4.8).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub struct UploadCoordinator {
    store: Arc<dyn Store>,
    upload_dir: PathBuf,
    pipeline: Arc<IngestionPipeline>,
    max_upload_bytes: u64,
}

impl UploadCoordinator {
    pub fn new(store: Arc<dyn Store>, upload_dir: PathBuf, pipeline: Arc<IngestionPipeline>) -> Self {
        Self { store, upload_dir, pipeline, max_upload_bytes: MAX_UPLOAD_BYTES }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: u64) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Validates type and size, dedups by content hash, persists the
    /// bytes, creates the Document, and hands it to the ingestion
    /// scheduler. Uploading identical bytes twice returns the same
    /// Document both times, doing no extra work the second time.
    pub async fn upload(
        &self,
        filename: &str,
        declared_extension: &str,
        bytes: Vec<u8>,
    ) -> Result<Document, RagError> {
        let file_type = FileType::from_extension(declared_extension).ok_or_else(|| {
            RagError::Validation(format!("unsupported file type: {declared_extension}"))
        })?;

        if bytes.len() as u64 > self.max_upload_bytes {
            return Err(RagError::Validation(format!(
                "upload exceeds maximum size of {} bytes",
                self.max_upload_bytes
            )));
        }

        let content_hash = hex::encode(Sha256::digest(&bytes));

        if let Some(existing) = self.store.get_document_by_hash(&content_hash).await? {
            info!(document_id = %existing.id, "upload deduplicated against existing document");
            return Ok(existing);
        }

        let storage_path = self.upload_dir.join(&content_hash);
        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(|e| RagError::Store(format!("failed to create upload directory: {e}")))?;
        tokio::fs::write(&storage_path, &bytes)
            .await
            .map_err(|e| RagError::Store(format!("failed to write uploaded file: {e}")))?;

        let document = self
            .store
            .create_document(NewDocument {
                id: uuid::Uuid::new_v4().to_string(),
                filename: filename.to_string(),
                file_type,
                size_bytes: bytes.len() as i64,
                content_hash,
                storage_path: storage_path.to_string_lossy().into_owned(),
            })
            .await?;

        self.pipeline.enqueue(document.id.clone()).await?;
        Ok(document)
    }
}
