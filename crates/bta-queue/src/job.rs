//! Job and job-state models.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a queued analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Progress,
    Success,
    Failure,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Progress => "progress",
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }

    /// Success and Failure are final.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }

    /// Check if transition to another status is valid.
    pub fn can_transition_to(&self, to: &Self) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Progress)
                | (Self::Pending, Self::Failure)
                | (Self::Progress, Self::Success)
                | (Self::Progress, Self::Failure)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Work item handed to a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    /// Where the uploaded PDF was saved.
    pub file_path: String,
    /// Original upload name, for history records.
    pub file_name: String,
    pub query: String,
    pub analysis_type: String,
    pub user_id: Option<String>,
}

impl Job {
    /// Create a job with a fresh UUID.
    pub fn new(
        file_path: impl Into<String>,
        file_name: impl Into<String>,
        query: impl Into<String>,
        analysis_type: impl Into<String>,
        user_id: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_path: file_path.into(),
            file_name: file_name.into(),
            query: query.into(),
            analysis_type: analysis_type.into(),
            user_id,
        }
    }
}

/// Status record kept in the key-value store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    pub id: String,
    pub status: JobStatus,
    pub analysis_type: String,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

impl JobState {
    /// Initial pending state for a job.
    pub fn pending(job: &Job) -> Self {
        let now = now();
        Self {
            id: job.id.clone(),
            status: JobStatus::Pending,
            analysis_type: job.analysis_type.clone(),
            query: job.query.clone(),
            user_id: job.user_id.clone(),
            message: None,
            result: None,
            error: None,
            analysis_id: None,
            processing_time: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Move to `to`, rejecting transitions the lifecycle doesn't allow.
    pub fn transition(&mut self, to: JobStatus) -> Result<(), crate::QueueError> {
        if !self.status.can_transition_to(&to) {
            return Err(crate::QueueError::InvalidTransition { from: self.status, to });
        }
        self.status = to;
        self.updated_at = now();
        Ok(())
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
