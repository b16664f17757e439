//! Analysis history and users.

pub mod model;

use bta_db::queries::analyses::{self as queries, NewAnalysis};
use bta_db::queries::users;
use bta_db::DbPool;
use tracing::debug;

use crate::analysis::AnalysisType;
use crate::error::{BtaError, BtaResult};
use model::{AnalysisRecord, RecordStatus, User};

/// Largest page a history query may request.
pub const MAX_HISTORY_LIMIT: u32 = 500;

/// Default history page size.
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// What to store for a finished (or failed) analysis.
#[derive(Debug, Clone)]
pub struct RecordInput<'a> {
    /// Anonymous submissions get a fresh id.
    pub user_id: Option<&'a str>,
    pub file_name: &'a str,
    pub query: &'a str,
    pub analysis_type: AnalysisType,
    pub result: &'a str,
    pub processing_time: f64,
    pub status: RecordStatus,
    pub task_id: Option<&'a str>,
}

/// Store an analysis and bump the user's counter on success.
pub fn record_analysis(pool: &DbPool, input: &RecordInput<'_>) -> BtaResult<i64> {
    let anonymous;
    let user_id = match input.user_id.filter(|u| !u.trim().is_empty()) {
        Some(u) => u,
        None => {
            anonymous = uuid::Uuid::new_v4().to_string();
            &anonymous
        }
    };

    let id = queries::insert_analysis(
        pool,
        &NewAnalysis {
            user_id,
            file_name: input.file_name,
            query: input.query,
            analysis_type: input.analysis_type.as_str(),
            result: input.result,
            processing_time: input.processing_time,
            status: input.status.as_str(),
            task_id: input.task_id,
        },
    )?;

    if input.status == RecordStatus::Completed {
        let known = users::increment_user_analyses(pool, user_id)?;
        debug!(user_id, known, "Updated user analysis count");
    }
    Ok(id)
}

/// Get one analysis.
pub fn get_analysis(pool: &DbPool, id: i64) -> BtaResult<AnalysisRecord> {
    match queries::get_analysis(pool, id) {
        Ok(row) => Ok(AnalysisRecord::from_row(row)),
        Err(bta_db::DbError::NotFound(_)) => Err(BtaError::AnalysisNotFound(id)),
        Err(e) => Err(e.into()),
    }
}

/// A user's analyses, newest first. `limit` is clamped to [`MAX_HISTORY_LIMIT`].
pub fn list_history(
    pool: &DbPool,
    user_id: &str,
    limit: Option<u32>,
) -> BtaResult<Vec<AnalysisRecord>> {
    let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT);
    let rows = queries::list_analyses_for_user(pool, user_id, limit)?;
    Ok(rows.into_iter().map(AnalysisRecord::from_row).collect())
}

/// Register a user.
pub fn create_user(pool: &DbPool, user_id: &str, email: Option<&str>) -> BtaResult<User> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(BtaError::invalid_upload("user_id must not be empty"));
    }
    let email = email.map(str::trim).filter(|e| !e.is_empty());
    if let Some(e) = email {
        if !e.contains('@') {
            return Err(BtaError::invalid_upload(format!("invalid email: {}", e)));
        }
    }
    let row = users::create_user(pool, user_id, email)?;
    Ok(User::from_row(row))
}

/// Look up a user.
pub fn get_user(pool: &DbPool, user_id: &str) -> BtaResult<User> {
    users::get_user(pool, user_id)?
        .map(User::from_row)
        .ok_or_else(|| BtaError::UserNotFound(user_id.to_string()))
}
