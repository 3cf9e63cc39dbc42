//! # RAGOrchestrator (C7)
//!
//! Turns a query plus optional prior turns into a grounded answer with
//! citations. Grounded on the teacher's two-stage "retrieve, then call
//! the AI provider" shape seen in `handlers::search` and
//! `ingest::knowledge::distill_and_augment`.

use crate::errors::RagError;
use crate::providers::{ChatClient, ChatMessage};
use crate::search::SearchService;
use crate::types::ContextChunk;
use serde::Serialize;
use std::sync::Arc;

/// Context is truncated before it would push total assembled length past
/// this many characters.
pub const MAX_CONTEXT_CHARS: usize = 6000;

pub const DEFAULT_TOP_K: usize = 8;
const DEFAULT_HYBRID_WEIGHT_SEMANTIC: f64 = 0.7;
const DEFAULT_HYBRID_WEIGHT_LEXICAL: f64 = 0.3;

const GROUNDING_SYSTEM_PROMPT: &str = "You are a document question-answering assistant. Answer only using \
the information in the provided context. If the context does not contain enough information to answer, say \
so plainly instead of guessing. Cite the sources you used by their [Source i] label. Never invent document \
names or content that is not present in the context. If the context is empty, say that no relevant \
information was found.";

const NO_CONTEXT_ANSWER: &str =
    "I don't have any indexed documents available to answer that question.";

#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    pub index: usize,
    pub document_id: String,
    pub document_filename: String,
    pub chunk_index: i64,
    pub relevance_score: f64,
    pub text_preview: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub context_used: usize,
    pub model: String,
    pub tokens_used: u32,
}

pub struct RagOrchestrator {
    search: Arc<SearchService>,
    chat: Arc<dyn ChatClient>,
}

impl RagOrchestrator {
    pub fn new(search: Arc<SearchService>, chat: Arc<dyn ChatClient>) -> Self {
        Self { search, chat }
    }

    pub async fn ask(
        &self,
        query: &str,
        history: &[ChatMessage],
        top_k: Option<usize>,
        filter_document_id: Option<&str>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<RagAnswer, RagError> {
        let top_k = top_k.unwrap_or(DEFAULT_TOP_K);
        let results = self
            .search
            .hybrid_with_context(
                query,
                top_k,
                filter_document_id,
                DEFAULT_HYBRID_WEIGHT_SEMANTIC,
                DEFAULT_HYBRID_WEIGHT_LEXICAL,
            )
            .await?;

        if results.is_empty() {
            return Ok(RagAnswer {
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
                context_used: 0,
                model: String::new(),
                tokens_used: 0,
            });
        }

        let (context_block, sources) = assemble_context(&results);

        let mut messages = vec![ChatMessage::system(format!(
            "{GROUNDING_SYSTEM_PROMPT}\n\n# Context\n{context_block}"
        ))];
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::user(query.to_string()));

        let response = self.chat.complete(&messages, temperature, max_tokens).await?;

        Ok(RagAnswer {
            answer: response.text,
            context_used: sources.len(),
            sources,
            model: response.model_tag,
            tokens_used: response.tokens_used,
        })
    }
}

/// Walks ranked results in order, formatting each as `[Source i:
/// <filename>]\n<text>\n`, stopping before a result would push the total
/// past `MAX_CONTEXT_CHARS`.
fn assemble_context(results: &[ContextChunk]) -> (String, Vec<SourceRef>) {
    let mut context_block = String::new();
    let mut sources = Vec::new();

    for (i, result) in results.iter().enumerate() {
        let index = i + 1;
        let chunk = &result.scored.chunk;
        let section = format!("[Source {index}: {}]\n{}\n", result.scored.document_filename, chunk.text);

        if !context_block.is_empty() && context_block.len() + section.len() > MAX_CONTEXT_CHARS {
            break;
        }
        if context_block.is_empty() && section.len() > MAX_CONTEXT_CHARS {
            // Even the first source alone would overflow; include it
            // truncated rather than produce an empty context.
            let truncated: String = section.chars().take(MAX_CONTEXT_CHARS).collect();
            context_block.push_str(&truncated);
            sources.push(source_ref(index, result));
            break;
        }

        context_block.push('\n');
        context_block.push_str(&section);
        sources.push(source_ref(index, result));
    }

    (context_block, sources)
}

fn source_ref(index: usize, result: &ContextChunk) -> SourceRef {
    let chunk = &result.scored.chunk;
    let preview: String = chunk.text.chars().take(200).collect();
    SourceRef {
        index,
        document_id: chunk.document_id.clone(),
        document_filename: result.scored.document_filename.clone(),
        chunk_index: chunk.chunk_index,
        relevance_score: result.scored.combined,
        text_preview: preview,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProcessingStatus;
    use crate::providers::HttpChatClient;
    use crate::store::{SqliteStore, Store};
    use crate::types::{FileType, NewChunk, NewDocument};
    use async_trait::async_trait;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Clone)]
    struct StubEmbedder;

    #[async_trait]
    impl crate::providers::EmbeddingClient for StubEmbedder {
        async fn embed_one(&self, _text: &str) -> Result<Vec<f32>, RagError> {
            Ok(vec![1.0, 0.0])
        }
        async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    #[tokio::test]
    async fn empty_retrieval_short_circuits() {
        let store = Arc::new(SqliteStore::new(":memory:").await.unwrap());
        let embedder: Arc<dyn crate::providers::EmbeddingClient> = Arc::new(StubEmbedder);
        let search = Arc::new(SearchService::new(store, embedder));

        let server = MockServer::start().await;
        let chat: Arc<dyn ChatClient> = Arc::new(
            HttpChatClient::new(
                format!("{}/chat/completions", server.uri()),
                "test-model".to_string(),
                None,
                std::time::Duration::from_secs(5),
            )
            .unwrap(),
        );

        let orchestrator = RagOrchestrator::new(search, chat);
        let answer = orchestrator.ask("what is rust?", &[], None, None, 0.7, 500).await.unwrap();
        assert_eq!(answer.context_used, 0);
        assert!(answer.sources.is_empty());
        assert_eq!(answer.answer, NO_CONTEXT_ANSWER);
    }

    #[tokio::test]
    async fn grounded_answer_cites_sources() {
        let store = SqliteStore::new(":memory:").await.unwrap();
        let doc = store
            .create_document(NewDocument {
                id: "doc-1".to_string(),
                filename: "rust.txt".to_string(),
                file_type: FileType::Txt,
                size_bytes: 20,
                content_hash: "hash-1".to_string(),
                storage_path: "/data/hash-1".to_string(),
            })
            .await
            .unwrap();
        store
            .update_document_status(&doc.id, ProcessingStatus::Processing, None, None)
            .await
            .unwrap();
        store
            .create_chunks_batch(
                &doc.id,
                vec![NewChunk { chunk_index: 0, text: "Rust is a systems language".to_string(), vector: Some(vec![1.0, 0.0]) }],
            )
            .await
            .unwrap();
        let store: Arc<dyn Store> = Arc::new(store);
        let embedder: Arc<dyn crate::providers::EmbeddingClient> = Arc::new(StubEmbedder);
        let search = Arc::new(SearchService::new(store, embedder));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "test-model",
                "choices": [{"message": {"content": "Rust is a systems language [Source 1]."}}],
                "usage": {"total_tokens": 10}
            })))
            .mount(&server)
            .await;
        let chat: Arc<dyn ChatClient> = Arc::new(
            HttpChatClient::new(
                format!("{}/chat/completions", server.uri()),
                "test-model".to_string(),
                None,
                std::time::Duration::from_secs(5),
            )
            .unwrap(),
        );

        let orchestrator = RagOrchestrator::new(search, chat);
        let answer = orchestrator
            .ask("what is rust?", &[], None, None, 0.7, 500)
            .await
            .unwrap();
        assert_eq!(answer.context_used, 1);
        assert_eq!(answer.sources[0].document_filename, "rust.txt");
        assert!(answer.answer.contains("Rust"));
    }
}
