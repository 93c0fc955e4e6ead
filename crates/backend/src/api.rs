use async_trait::async_trait;
use thiserror::Error;

use drill_core::model::DrillId;

use crate::wire::{AnswerRecord, DrillPayload, DrillRequest, ProgressPayload, SubmissionReceipt};

/// Errors surfaced by remote-service adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    #[error("not found")]
    NotFound,

    #[error("request failed with status {0}")]
    Status(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("connection error: {0}")]
    Connection(String),
}

/// Supplies drill sessions from the remote question inventory.
#[async_trait]
pub trait QuestionSupply: Send + Sync {
    /// Request a freshly generated drill shaped by `request`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the drill cannot be created or decoded.
    async fn create_drill(&self, request: &DrillRequest) -> Result<DrillPayload, BackendError>;

    /// Fetch an existing drill with its questions and saved progress.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if missing, or other request errors.
    async fn fetch_drill(&self, drill_id: &DrillId) -> Result<DrillPayload, BackendError>;

    /// Tell the service a drill left the generated state.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on request failure; callers treat this as
    /// best-effort and keep the local session authoritative.
    async fn mark_started(&self, drill_id: &DrillId) -> Result<(), BackendError>;
}

/// Persists partial progress so an interrupted drill can resume.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Save the current index, answers, and highlights for a drill.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on request failure; the save is best-effort.
    async fn save_progress(
        &self,
        drill_id: &DrillId,
        progress: &ProgressPayload,
    ) -> Result<(), BackendError>;
}

/// Receives the final answers of a submitted drill.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    /// Submit the scored answers, at most once per drill.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on request failure; the locally computed
    /// outcome stands regardless of remote acknowledgment.
    async fn submit(
        &self,
        drill_id: &DrillId,
        answers: &[AnswerRecord],
        time_taken_seconds: Option<u32>,
    ) -> Result<SubmissionReceipt, BackendError>;
}

/// Marks an externally referenced study task complete after submission.
#[async_trait]
pub trait TaskNotifier: Send + Sync {
    /// Flag `task_id` as completed by `drill_id`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on request failure; failures are logged by the
    /// caller, never retried, and never block navigation.
    async fn complete_task(&self, task_id: &str, drill_id: &DrillId) -> Result<(), BackendError>;
}
