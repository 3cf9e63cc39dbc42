//! # EmbeddingClient (C2)
//!
//! Produces fixed-dimension dense vectors for text via an external,
//! OpenAI-compatible embeddings API, batching calls to respect the
//! provider's per-request limit.

use crate::errors::RagError;
use async_trait::async_trait;
use dyn_clone::DynClone;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;
use tracing::debug;

/// The provider never sees more than this many strings in one request.
pub const MAX_BATCH: usize = 100;

#[async_trait]
pub trait EmbeddingClient: Send + Sync + Debug + DynClone {
    /// Embeds a single string.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError>;

    /// Embeds a batch of strings, preserving order. Internally partitions
    /// into batches of at most `MAX_BATCH` and issues sequential provider
    /// calls; a failure on any batch fails the whole call.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;
}

dyn_clone::clone_trait_object!(EmbeddingClient);

#[derive(Serialize, Debug)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize, Debug)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// An `EmbeddingClient` backed by an OpenAI-compatible `/embeddings` endpoint.
#[derive(Clone)]
pub struct HttpEmbeddingClient {
    client: ReqwestClient,
    api_url: String,
    model: String,
    api_key: Option<String>,
}

impl Debug for HttpEmbeddingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmbeddingClient")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl HttpEmbeddingClient {
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

    async fn call_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, RagError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };
        debug!(batch_size = inputs.len(), "--> embeddings request");

        let mut request = self.client.post(&self.api_url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(RagError::Provider(format!(
                "embeddings provider returned {status}: {text}"
            )));
        }

        let parsed: EmbeddingResponse = serde_json::from_str(&text)
            .map_err(|e| RagError::Provider(format!("bad embeddings response: {e}")))?;

        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut result = self.call_batch(&[text]).await?;
        result.pop().ok_or_else(|| {
            RagError::Provider("embeddings provider returned no vector".to_string())
        })
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH) {
            let refs: Vec<&str> = batch.iter().map(|s| s.as_str()).collect();
            let embeddings = self.call_batch(&refs).await?;
            if embeddings.len() != refs.len() {
                return Err(RagError::Provider(format!(
                    "embeddings provider returned {} vectors for {} inputs",
                    embeddings.len(),
                    refs.len()
                )));
            }
            all.extend(embeddings);
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn embed_many_batches_and_preserves_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"embedding": [1.0, 0.0]},
                    {"embedding": [0.0, 1.0]}
                ]
            })))
            .mount(&server)
            .await;

        let client = HttpEmbeddingClient::new(
            format!("{}/embeddings", server.uri()),
            "test-model".to_string(),
            None,
            Duration::from_secs(5),
        )
        .unwrap();

        let result = client
            .embed_many(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(result, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn provider_error_fails_whole_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = HttpEmbeddingClient::new(
            format!("{}/embeddings", server.uri()),
            "test-model".to_string(),
            None,
            Duration::from_secs(5),
        )
        .unwrap();

        let result = client.embed_many(&["a".to_string()]).await;
        assert!(result.is_err());
    }
}
