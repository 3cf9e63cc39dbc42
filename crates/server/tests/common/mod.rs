//! Shared end-to-end test harness: spawns the real router on an ephemeral
//! port, backed by an in-memory `turso` database and `wiremock` stand-ins
//! for the embedding/chat providers. Grounded on the teacher's
//! `tests/common::TestApp`.

#![allow(unused)]

use anyhow::Result;
use ragdoc_server::{config, router::create_router, state::build_app_state};
use reqwest::Client;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use wiremock::MockServer;

pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub mock_server: MockServer,
    _upload_dir: TempDir,
    _server_handle: JoinHandle<()>,
}

impl TestApp {
    pub async fn spawn() -> Result<Self> {
        let mock_server = MockServer::start().await;
        let upload_dir = TempDir::new()?;

        let config_yaml = format!(
            "server_port: 0\n\
             db_path: \":memory:\"\n\
             upload_dir: \"{}\"\n\
             ingestion_worker_count: 2\n\
             embedding_provider:\n  api_url: \"{}/embeddings\"\n  model_name: \"mock-embed\"\n\
             chat_provider:\n  api_url: \"{}/chat/completions\"\n  model_name: \"mock-chat\"\n",
            upload_dir.path().to_str().unwrap(),
            mock_server.uri(),
            mock_server.uri(),
        );

        let config_file = tempfile::Builder::new().suffix(".yml").tempfile()?;
        std::fs::write(config_file.path(), config_yaml)?;

        let config = config::get_config(Some(config_file.path().to_str().unwrap()))
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        let app_state = build_app_state(config).await?;
        let app = create_router(app_state);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = format!("http://{}", listener.local_addr()?);

        let server_handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            address,
            client: Client::new(),
            mock_server,
            _upload_dir: upload_dir,
            _server_handle: server_handle,
        })
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._server_handle.abort();
    }
}

/// Polls `GET /documents/{id}` until `processing_status` is `completed` or
/// `failed`, or `attempts` is exhausted.
pub async fn wait_for_ingestion(app: &TestApp, document_id: &str, attempts: usize) -> serde_json::Value {
    for _ in 0..attempts {
        let response = app
            .client
            .get(format!("{}/documents/{document_id}", app.address))
            .send()
            .await
            .unwrap();
        let body: serde_json::Value = response.json().await.unwrap();
        let status = body["processing_status"].as_str().unwrap_or("");
        if status == "completed" || status == "failed" {
            return body;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    panic!("document {document_id} did not reach a terminal state in time");
}
