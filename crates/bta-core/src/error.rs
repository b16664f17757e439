//! Centralized error types for BTA.

use bta_db::DbError;
use bta_llm::LlmError;
use bta_queue::{JobStatus, QueueError};
use thiserror::Error;

/// Main error type for BTA operations.
#[derive(Error, Debug)]
pub enum BtaError {
    #[error(
        "Unknown analysis type '{0}' (expected one of: summary, nutrition, exercise, verification)"
    )]
    UnknownAnalysisType(String),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("The report contains no extractable text")]
    EmptyReport,

    #[error("Could not read report: {0}")]
    ReportUnreadable(String),

    #[error("Required tool unavailable: {0}")]
    ToolUnavailable(String),

    #[error("Analysis not found: {0}")]
    AnalysisNotFound(i64),

    #[error("Task not found: {0}")]
    JobNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Task {id} is not finished yet (status: {status})")]
    JobNotReady { id: String, status: JobStatus },

    #[error("Task {id} failed: {error}")]
    JobFailed { id: String, error: String },

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for BTA operations.
pub type BtaResult<T> = Result<T, BtaError>;

impl BtaError {
    /// Create an invalid upload error.
    pub fn invalid_upload(msg: impl Into<String>) -> Self {
        Self::InvalidUpload(msg.into())
    }

    /// HTTP status this error should surface as.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnknownAnalysisType(_) | Self::InvalidUpload(_) => 400,
            Self::AnalysisNotFound(_) | Self::JobNotFound(_) | Self::UserNotFound(_) => 404,
            Self::JobNotReady { .. } => 409,
            Self::EmptyReport | Self::ReportUnreadable(_) => 422,
            Self::Llm(_) => 502,
            Self::Database(DbError::NotFound(_)) | Self::Queue(QueueError::NotFound(_)) => 404,
            Self::Database(DbError::Conflict(_)) => 409,
            Self::JobFailed { .. }
            | Self::Database(_)
            | Self::Queue(_)
            | Self::ToolUnavailable(_)
            | Self::Io(_)
            | Self::Config(_)
            | Self::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(BtaError::UnknownAnalysisType("x".into()).status_code(), 400);
        assert_eq!(BtaError::EmptyReport.status_code(), 422);
        assert_eq!(BtaError::JobNotFound("t".into()).status_code(), 404);
        assert_eq!(BtaError::Llm(LlmError::EmptyResponse).status_code(), 502);
        assert_eq!(
            BtaError::Database(DbError::Conflict("dup".into())).status_code(),
            409
        );
        assert_eq!(
            BtaError::JobNotReady { id: "t".into(), status: JobStatus::Pending }.status_code(),
            409
        );
        assert_eq!(
            BtaError::JobFailed { id: "t".into(), error: "model down".into() }.status_code(),
            500
        );
        assert_eq!(BtaError::ToolUnavailable("pdftotext".into()).status_code(), 500);
    }
}
