//! # ChatClient (C3)
//!
//! A thin adapter over an external OpenAI-compatible chat-completions
//! provider. It makes no decisions about content; `RAGOrchestrator` owns
//! all prompt assembly.

use crate::errors::RagError;
use async_trait::async_trait;
use dyn_clone::DynClone;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub text: String,
    pub tokens_used: u32,
    pub model_tag: String,
}

#[async_trait]
pub trait ChatClient: Send + Sync + Debug + DynClone {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<ChatResponse, RagError>;
}

dyn_clone::clone_trait_object!(ChatClient);

#[derive(Serialize, Debug)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize, Debug)]
struct CompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: String,
}

#[derive(Deserialize, Debug, Default)]
struct Usage {
    #[serde(default)]
    total_tokens: u32,
}

/// A `ChatClient` backed by an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct HttpChatClient {
    client: ReqwestClient,
    api_url: String,
    model: String,
    api_key: Option<String>,
}

impl Debug for HttpChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChatClient")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl HttpChatClient {
    pub fn new(
        api_url: String,
        model: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RagError> {
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::Provider(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_url,
            model,
            api_key,
        })
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<ChatResponse, RagError> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
            temperature,
            max_tokens,
            stream: false,
        };
        debug!(message_count = messages.len(), "--> chat completion request");

        let mut request = self.client.post(&self.api_url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(RagError::Provider(format!(
                "chat provider returned {status}: {text}"
            )));
        }

        let parsed: CompletionResponse = serde_json::from_str(&text)
            .map_err(|e| RagError::Provider(format!("bad chat completion response: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Provider("chat provider returned no choices".to_string()))?;

        Ok(ChatResponse {
            text: choice.message.content,
            tokens_used: parsed.usage.unwrap_or_default().total_tokens,
            model_tag: parsed.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}
