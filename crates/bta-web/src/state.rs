//! Application state.

use bta_core::AnalysisService;
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AnalysisService>,
    /// Largest accepted request body, in bytes.
    pub upload_limit: usize,
}

impl AppState {
    pub fn new(service: Arc<AnalysisService>, upload_limit: usize) -> Self {
        Self {
            service,
            upload_limit,
        }
    }
}
