//! History domain models.

use bta_db::queries::analyses::AnalysisRow;
use bta_db::queries::users::UserRow;
use serde::{Deserialize, Serialize};

/// Outcome recorded for an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Completed,
    Failed,
}

impl RecordStatus {
    /// Parse from string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "failed" => Self::Failed,
            _ => Self::Completed,
        }
    }

    /// Convert to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// A stored analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: i64,
    pub user_id: String,
    pub file_name: String,
    pub query: String,
    pub analysis_type: String,
    pub result: String,
    pub created_at: String,
    pub processing_time: f64,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl AnalysisRecord {
    /// Create a record from a database row.
    pub fn from_row(row: AnalysisRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            file_name: row.file_name,
            query: row.query,
            analysis_type: row.analysis_type,
            result: row.result,
            created_at: row.created_at,
            processing_time: row.processing_time,
            status: RecordStatus::from_str(&row.status),
            task_id: row.task_id,
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub email: Option<String>,
    pub created_at: String,
    pub total_analyses: i64,
}

impl User {
    pub fn from_row(row: UserRow) -> Self {
        Self {
            user_id: row.user_id,
            email: row.email,
            created_at: row.created_at,
            total_analyses: row.total_analyses,
        }
    }
}
