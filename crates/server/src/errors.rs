//! Maps `ragdoc_core::RagError` onto HTTP responses.
//!
//! `RagError::Provider` means different things depending on where it
//! surfaced (spec §7): inside search it is a 503, inside chat a 502.
//! `AppError` carries that distinction explicitly rather than guessing
//! from the variant alone.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ragdoc_core::RagError;
use serde_json::json;
use tracing::error;

pub struct AppError {
    err: RagError,
    provider_status: StatusCode,
}

impl AppError {
    /// `RagError::Provider` from a search call surfaces as 503.
    pub fn for_search(err: RagError) -> Self {
        Self { err, provider_status: StatusCode::SERVICE_UNAVAILABLE }
    }

    /// `RagError::Provider` from a chat call surfaces as 502.
    pub fn for_chat(err: RagError) -> Self {
        Self { err, provider_status: StatusCode::BAD_GATEWAY }
    }
}

/// Default mapping for call sites with no specific provider-error policy
/// (documents/upload, CRUD): treat provider failures as upstream (502).
impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        Self { err, provider_status: StatusCode::BAD_GATEWAY }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.err {
            RagError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            RagError::DuplicateContent(id) => {
                // Not surfaced as an HTTP error path today (the upload
                // handler returns 200/201 directly), kept here so the
                // match stays exhaustive if a future caller propagates it.
                (StatusCode::OK, format!("duplicate of {id}"))
            }
            RagError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            RagError::InvalidTransition { from, to } => {
                error!(?from, ?to, "illegal status transition reached the HTTP edge");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
            RagError::Provider(msg) => {
                error!(error = %self.err, "provider error");
                (self.provider_status, msg.clone())
            }
            RagError::Store(msg) => {
                error!(error = %msg, "store error");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage error".to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
