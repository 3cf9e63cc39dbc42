//! RAG chat and health handlers (spec §6 `/rag/...`).

use crate::errors::AppError;
use crate::handlers::search::compute_stats;
use crate::state::AppState;
use crate::types::{ChatRequest, ChatResponseBody, ChatSourceResponse, HealthResponse};
use axum::extract::State;
use axum::Json;
use ragdoc_core::providers::ChatMessage;
use ragdoc_core::RagError;

pub async fn chat_handler(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponseBody>, AppError> {
    if req.query.trim().is_empty() {
        return Err(AppError::from(RagError::Validation("query must not be empty".to_string())));
    }

    let mut history = Vec::with_capacity(req.conversation_history.len());
    for message in req.conversation_history {
        let chat_message = match message.role.as_str() {
            "system" => ChatMessage::system(message.content),
            "user" => ChatMessage::user(message.content),
            "assistant" => ChatMessage::assistant(message.content),
            other => {
                return Err(AppError::from(RagError::Validation(format!(
                    "invalid message role '{other}'"
                ))))
            }
        };
        history.push(chat_message);
    }

    let top_k = Some(req.top_k.unwrap_or(state.config.rag_top_k_default));
    let temperature = req.temperature.unwrap_or(0.7);
    let max_tokens = req.max_tokens.unwrap_or(500);

    let answer = state
        .rag
        .ask(&req.query, &history, top_k, req.document_id.as_deref(), temperature, max_tokens)
        .await
        .map_err(AppError::for_chat)?;

    Ok(Json(ChatResponseBody {
        answer: answer.answer,
        sources: answer
            .sources
            .into_iter()
            .map(|s| ChatSourceResponse {
                index: s.index,
                document_id: s.document_id,
                document_filename: s.document_filename,
                chunk_index: s.chunk_index,
                relevance_score: s.relevance_score,
                text_preview: s.text_preview,
            })
            .collect(),
        context_used: answer.context_used,
        model: answer.model,
        tokens_used: answer.tokens_used,
    }))
}

pub async fn health_handler(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    let statistics = compute_stats(&state).await?;
    Ok(Json(HealthResponse { status: "ok".to_string(), statistics }))
}
