//! # IngestionPipeline (C5)
//!
//! Turns a newly-created Document (in `pending`) into either `completed`
//! or `failed`. The worker pool is a fixed-size set of tasks pulling
//! claimed document ids off a shared queue — a bounded generalization of
//! the teacher's one-`tokio::spawn`-per-upload style, grounded on
//! `chesterit21-rust-engine-app`'s `DocumentService::process_upload`
//! staged-progress shape, collapsed to the four-state DAG this crate's
//! `ProcessingStatus` enforces.

use crate::chunker;
use crate::errors::{ProcessingStatus, RagError};
use crate::parser::ParserRegistry;
use crate::providers::EmbeddingClient;
use crate::store::Store;
use crate::types::{DocumentCounts, NewChunk};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Queue depth before `enqueue` backpressures the caller.
const QUEUE_CAPACITY: usize = 1024;

pub struct IngestionPipeline {
    sender: mpsc::Sender<String>,
    _workers: JoinSet<()>,
}

impl IngestionPipeline {
    /// Spawns `worker_count` tasks sharing one claim queue.
    pub fn spawn(
        store: Arc<dyn Store>,
        embedder: Arc<dyn EmbeddingClient>,
        parsers: Arc<ParserRegistry>,
        worker_count: usize,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count.max(1) {
            let receiver = receiver.clone();
            let store = store.clone();
            let embedder = embedder.clone();
            let parsers = parsers.clone();
            workers.spawn(async move {
                loop {
                    let document_id = {
                        let mut receiver = receiver.lock().await;
                        receiver.recv().await
                    };
                    let Some(document_id) = document_id else {
                        info!(worker_id, "ingestion worker shutting down, queue closed");
                        return;
                    };
                    process_one(
                        &store,
                        &embedder,
                        &parsers,
                        &document_id,
                        chunk_size,
                        chunk_overlap,
                    )
                    .await;
                }
            });
        }

        Self { sender, _workers: workers }
    }

    /// Hands a claimed-pending Document id to the worker pool. Returns
    /// once the id is queued, not once ingestion completes.
    pub async fn enqueue(&self, document_id: String) -> Result<(), RagError> {
        self.sender
            .send(document_id)
            .await
            .map_err(|_| RagError::Store("ingestion queue is closed".to_string()))
    }
}

async fn process_one(
    store: &Arc<dyn Store>,
    embedder: &Arc<dyn EmbeddingClient>,
    parsers: &Arc<ParserRegistry>,
    document_id: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) {
    // Step 1: claim. Rejection means another worker got here first, or
    // the document isn't pending anymore; either way this run is done.
    if let Err(e) = store
        .update_document_status(document_id, ProcessingStatus::Processing, None, None)
        .await
    {
        match e {
            RagError::InvalidTransition { .. } => {
                info!(document_id, "document already claimed or not pending, skipping");
            }
            other => error!(document_id, error = %other, "failed to claim document"),
        }
        return;
    }

    if let Err(reason) = run_ingestion(store, embedder, parsers, document_id, chunk_size, chunk_overlap).await {
        warn!(document_id, reason = %reason, "ingestion failed");
        if let Err(e) = store
            .update_document_status(document_id, ProcessingStatus::Failed, Some(reason), None)
            .await
        {
            error!(document_id, error = %e, "failed to record ingestion failure");
        }
    }
}

/// Runs steps 2-5 of the pipeline contract. Returns `Err(reason)` on any
/// failure; the caller records it via `update_document_status`.
async fn run_ingestion(
    store: &Arc<dyn Store>,
    embedder: &Arc<dyn EmbeddingClient>,
    parsers: &Arc<ParserRegistry>,
    document_id: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<(), String> {
    let document = store.get_document(document_id).await.map_err(|e| e.to_string())?;

    // Step 2: parse.
    let bytes = tokio::fs::read(&document.storage_path)
        .await
        .map_err(|e| format!("parse_error: failed to read stored file: {e}"))?;
    let parser = parsers
        .get(document.file_type)
        .map_err(|e| format!("parse_error: {e}"))?;
    let extracted = parser
        .extract(&bytes)
        .await
        .map_err(|e| format!("parse_error: {e}"))?;

    // Step 3: chunk.
    let passages = chunker::chunk(&extracted.text, chunk_size, chunk_overlap)
        .map_err(|_| "no_content".to_string())?;
    if passages.is_empty() {
        return Err("no_content".to_string());
    }

    // Step 4: embed.
    let vectors = embedder
        .embed_many(&passages)
        .await
        .map_err(|e| format!("embedding_error: {e}"))?;
    if vectors.len() != passages.len() {
        return Err(format!(
            "embedding_error: provider returned {} vectors for {} chunks",
            vectors.len(),
            passages.len()
        ));
    }

    // Step 5: persist.
    let new_chunks: Vec<NewChunk> = passages
        .iter()
        .zip(vectors.into_iter())
        .enumerate()
        .map(|(index, (text, vector))| NewChunk {
            chunk_index: index as i64,
            text: text.clone(),
            vector: Some(vector),
        })
        .collect();
    let chunk_count = new_chunks.len() as i64;

    store
        .create_chunks_batch(document_id, new_chunks)
        .await
        .map_err(|e| format!("store_error: {e}"))?;

    let counts = DocumentCounts {
        character_count: extracted.text.chars().count() as i64,
        word_count: extracted.text.split_whitespace().count() as i64,
        page_count: extracted.page_count,
        chunk_count,
    };
    store
        .update_document_status(document_id, ProcessingStatus::Completed, None, Some(counts))
        .await
        .map_err(|e| format!("store_error: {e}"))?;

    info!(document_id, chunk_count, "ingestion completed");
    Ok(())
}
