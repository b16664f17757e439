//! Runtime settings.
//!
//! The CLI collects these from flags and environment variables; library code
//! only ever sees the resolved [`Settings`].

use bta_llm::OpenAiConfig;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{BtaError, BtaResult};

/// Default SQLite history database.
pub const DEFAULT_DATABASE: &str = "./blood_analysis.db";

/// Default directory for uploaded reports.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Resolved configuration for the service and workers.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_path: PathBuf,
    pub data_dir: PathBuf,
    /// When unset, jobs go through an in-process queue.
    pub redis_url: Option<String>,
    pub llm: OpenAiConfig,
    /// Overrides every agent's own temperature when set.
    pub temperature: Option<f32>,
    /// Report text beyond this many bytes is cut before prompting.
    pub max_report_chars: usize,
    /// Largest accepted upload, in bytes.
    pub upload_limit: usize,
    /// How long job states stay in the status store.
    pub job_ttl: Duration,
    /// Uploads older than this are swept.
    pub cleanup_max_age: Duration,
    pub cleanup_interval: Duration,
    pub workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            redis_url: None,
            llm: OpenAiConfig::default(),
            temperature: None,
            max_report_chars: 24_000,
            upload_limit: 10 * 1024 * 1024,
            job_ttl: Duration::from_secs(24 * 60 * 60),
            cleanup_max_age: Duration::from_secs(60 * 60),
            cleanup_interval: Duration::from_secs(10 * 60),
            workers: 2,
        }
    }
}

impl Settings {
    /// Reject settings that can't work at all.
    pub fn validate(&self) -> BtaResult<()> {
        if self.max_report_chars == 0 {
            return Err(BtaError::Config("max_report_chars must be positive".into()));
        }
        if self.upload_limit == 0 {
            return Err(BtaError::Config("upload_limit must be positive".into()));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(BtaError::Config("temperature must be between 0 and 2".into()));
            }
        }
        if self.workers == 0 {
            return Err(BtaError::Config("at least one worker is required".into()));
        }
        if let Some(url) = &self.redis_url {
            if !url.starts_with("redis://") && !url.starts_with("rediss://") {
                return Err(BtaError::Config(format!("not a redis URL: {}", url)));
            }
        }
        Ok(())
    }
}
