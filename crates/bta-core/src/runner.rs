//! Runs one analysis: read the report, prompt the selected agent, return text.

use bta_llm::ChatModel;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::agent::{self, Agent, TaskTemplate};
use crate::analysis::AnalysisType;
use crate::error::BtaResult;
use crate::report::{truncate_report, ReportReader};

/// Input for a single analysis.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub file_path: PathBuf,
    /// Already normalized (see [`crate::analysis::normalize_query`]).
    pub query: String,
    pub analysis_type: AnalysisType,
}

/// Generated analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub text: String,
    pub agent: &'static str,
    pub model: String,
    pub query: String,
    pub analysis_type: AnalysisType,
    /// Seconds from reading the report to receiving the completion.
    pub processing_time: f64,
}

/// Couples a model with a report reader.
pub struct AnalysisRunner {
    model: Arc<dyn ChatModel>,
    reader: Arc<dyn ReportReader>,
    max_report_chars: usize,
    temperature: Option<f32>,
}

impl AnalysisRunner {
    pub fn new(
        model: Arc<dyn ChatModel>,
        reader: Arc<dyn ReportReader>,
        max_report_chars: usize,
    ) -> Self {
        Self {
            model,
            reader,
            max_report_chars,
            temperature: None,
        }
    }

    /// Use one temperature for every agent.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    pub async fn run(&self, request: &AnalysisRequest) -> BtaResult<AnalysisOutcome> {
        let started = Instant::now();

        let full = self.reader.read(&request.file_path).await?;
        let report = truncate_report(&full, self.max_report_chars);
        if report.len() < full.len() {
            debug!(from = full.len(), to = report.len(), "Report truncated");
        }

        let agent = Agent::for_type(request.analysis_type);
        let task = TaskTemplate::for_type(request.analysis_type);
        let messages = agent::build_messages(agent, task, &request.query, report);
        let temperature = self.temperature.unwrap_or(agent.temperature);

        info!(
            agent = agent.name,
            analysis_type = %request.analysis_type,
            report_chars = report.len(),
            "Running analysis"
        );
        let text = self.model.complete(&messages, temperature).await?;
        let processing_time = started.elapsed().as_secs_f64();
        info!(agent = agent.name, processing_time, "Analysis finished");

        Ok(AnalysisOutcome {
            text: text.trim().to_string(),
            agent: agent.name,
            model: self.model.model_name().to_string(),
            query: request.query.clone(),
            analysis_type: request.analysis_type,
            processing_time,
        })
    }
}
