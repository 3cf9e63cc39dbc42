//! External AI provider collaborators: C2 `EmbeddingClient` and C3 `ChatClient`.

pub mod chat;
pub mod embedding;

pub use chat::{ChatClient, ChatMessage, ChatRole, ChatResponse, HttpChatClient};
pub use embedding::{EmbeddingClient, HttpEmbeddingClient};
