use axum::Json;
use serde_json::{json, Value};

/// Health check.
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Blood Test Report Analyser API is running" }))
}
