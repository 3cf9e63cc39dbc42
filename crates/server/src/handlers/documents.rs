//! Document CRUD and upload handlers (spec §6 `/documents...`).

use crate::errors::AppError;
use crate::state::AppState;
use crate::types::{
    ChunkListResponse, DeleteResponse, DocumentResponse, ListDocumentsQuery, ListDocumentsResponse,
    UploadResponse,
};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::Multipart;
use ragdoc_core::{ProcessingStatus, RagError};
use tracing::warn;

pub async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let mut filename = None;
    let mut bytes = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RagError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            filename = field.file_name().map(|s| s.to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| RagError::Validation(format!("failed to read uploaded file: {e}")))?;
            bytes = Some(data.to_vec());
        }
    }

    let filename = filename.ok_or_else(|| RagError::Validation("missing 'file' field".to_string()))?;
    let bytes = bytes.ok_or_else(|| RagError::Validation("missing 'file' field".to_string()))?;
    let extension = filename.rsplit('.').next().unwrap_or("").to_string();

    let document = state.upload.upload(&filename, &extension, bytes).await?;
    Ok((StatusCode::CREATED, Json(document.into())))
}

pub async fn list_documents_handler(
    State(state): State<AppState>,
    Query(params): Query<ListDocumentsQuery>,
) -> Result<Json<ListDocumentsResponse>, AppError> {
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(20);
    let status_filter = match params.status {
        Some(s) => Some(
            ProcessingStatus::from_str(&s)
                .ok_or_else(|| RagError::Validation(format!("invalid status '{s}'")))?,
        ),
        None => None,
    };

    let documents = state.store.list_documents(offset, limit, status_filter).await?;
    let total_count = state.store.count_documents(status_filter).await?;

    Ok(Json(ListDocumentsResponse {
        documents: documents.into_iter().map(Into::into).collect(),
        total_count,
    }))
}

pub async fn get_document_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, AppError> {
    let document = state.store.get_document(&id).await?;
    Ok(Json(document.into()))
}

pub async fn get_chunks_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChunkListResponse>, AppError> {
    state.store.get_document(&id).await?;
    let chunks = state.store.get_chunks(&id).await?;
    Ok(Json(ChunkListResponse { chunks: chunks.into_iter().map(Into::into).collect() }))
}

pub async fn delete_document_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let document = state.store.get_document(&id).await?;
    state.store.delete_document(&id).await?;

    if let Err(e) = tokio::fs::remove_file(&document.storage_path).await {
        warn!(document_id = %id, error = %e, "failed to remove stored file after document delete");
    }

    Ok(Json(DeleteResponse { success: true }))
}
