//! Upload handlers.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use bta_core::{AnalysisType, Upload};
use bta_queue::JobStatus;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub status: &'static str,
    pub query: String,
    pub analysis_type: AnalysisType,
    pub creative_analysis: String,
    pub file_processed: String,
    pub analysis_id: i64,
    pub processing_time: f64,
}

#[derive(Debug, Serialize)]
pub struct SubmittedResponse {
    pub task_id: String,
    pub status: JobStatus,
}

/// Read the upload form: `file` plus optional `query`, `analysis_type`, `user_id`.
async fn read_upload(mut multipart: Multipart) -> ApiResult<Upload> {
    let mut upload = Upload::default();
    let mut has_file = false;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                upload.file_name = field.file_name().unwrap_or_default().to_string();
                upload.bytes = field.bytes().await?.to_vec();
                has_file = true;
            }
            "query" => upload.query = Some(field.text().await?),
            "analysis_type" => upload.analysis_type = Some(field.text().await?),
            "user_id" => upload.user_id = Some(field.text().await?),
            _ => {}
        }
    }

    if !has_file {
        return Err(ApiError::bad_request("Missing form field 'file'"));
    }
    Ok(upload)
}

/// Analyze a report and wait for the result.
pub async fn analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<AnalyzeResponse>> {
    let upload = read_upload(multipart).await?;
    let done = state.service.analyze_now(upload).await?;

    Ok(Json(AnalyzeResponse {
        status: "success",
        query: done.outcome.query,
        analysis_type: done.outcome.analysis_type,
        creative_analysis: done.outcome.text,
        file_processed: done.file_name,
        analysis_id: done.analysis_id,
        processing_time: done.outcome.processing_time,
    }))
}

/// Queue a report for analysis.
pub async fn analyze_async(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<SubmittedResponse>)> {
    let upload = read_upload(multipart).await?;
    let job = state.service.submit(upload).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmittedResponse {
            task_id: job.id,
            status: job.status,
        }),
    ))
}
