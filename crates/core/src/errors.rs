//! Error taxonomy for the document RAG core.
//!
//! Every component boundary in this crate returns `RagError`. The HTTP edge
//! (in `ragdoc-server`) maps each variant to a status code; nothing in this
//! crate panics on a reachable error path.

use thiserror::Error;

/// The status a `Document` may hold, and the only legal transitions
/// between them (`pending -> processing -> {completed, failed}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ProcessingStatus::Pending),
            "processing" => Some(ProcessingStatus::Processing),
            "completed" => Some(ProcessingStatus::Completed),
            "failed" => Some(ProcessingStatus::Failed),
            _ => None,
        }
    }

    /// Whether `self -> next` is a legal transition under the DAG in
    /// spec §3: `pending -> processing -> {completed, failed}`, plus
    /// `failed -> processing` so a failed document can be re-claimed.
    pub fn can_transition_to(&self, next: ProcessingStatus) -> bool {
        matches!(
            (self, next),
            (ProcessingStatus::Pending, ProcessingStatus::Processing)
                | (ProcessingStatus::Processing, ProcessingStatus::Completed)
                | (ProcessingStatus::Processing, ProcessingStatus::Failed)
                | (ProcessingStatus::Failed, ProcessingStatus::Processing)
        )
    }
}

/// The unified error type for ingestion, search, and RAG operations.
#[derive(Error, Debug)]
pub enum RagError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("duplicate content; existing document id: {0}")]
    DuplicateContent(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("illegal status transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: ProcessingStatus,
        to: ProcessingStatus,
    },

    #[error("provider error: {0}")]
    Provider(String),

    #[error("store error: {0}")]
    Store(String),
}

impl From<turso::Error> for RagError {
    fn from(err: turso::Error) -> Self {
        RagError::Store(err.to_string())
    }
}

impl From<reqwest::Error> for RagError {
    fn from(err: reqwest::Error) -> Self {
        RagError::Provider(err.to_string())
    }
}

impl From<serde_json::Error> for RagError {
    fn from(err: serde_json::Error) -> Self {
        RagError::Provider(format!("deserialization error: {err}"))
    }
}
