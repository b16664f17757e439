//! Queued analysis status and results.

use axum::{
    extract::{Path, State},
    Json,
};
use bta_queue::{JobState, JobStatus};
use serde::Serialize;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ResultResponse {
    pub task_id: String,
    pub status: JobStatus,
    pub query: String,
    pub analysis_type: String,
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
}

pub async fn get_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<JobState>> {
    Ok(Json(state.service.job_state(&task_id).await?))
}

/// 409 until the job finishes, 500 if it failed.
pub async fn get_result(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<ResultResponse>> {
    let job = state.service.job_result(&task_id).await?;

    Ok(Json(ResultResponse {
        task_id: job.id,
        status: job.status,
        query: job.query,
        analysis_type: job.analysis_type,
        result: job.result.unwrap_or_default(),
        analysis_id: job.analysis_id,
        processing_time: job.processing_time,
    }))
}
