//! Analysis history handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use bta_core::history::model::AnalysisRecord;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub user_id: String,
    pub count: usize,
    pub analyses: Vec<AnalysisRecord>,
}

pub async fn get_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<Json<HistoryResponse>> {
    let analyses = state.service.history(&user_id, params.limit).await?;

    Ok(Json(HistoryResponse {
        user_id,
        count: analyses.len(),
        analyses,
    }))
}

pub async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<AnalysisRecord>> {
    Ok(Json(state.service.analysis(id).await?))
}
