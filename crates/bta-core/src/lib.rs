//! BTA Core Library
//!
//! Domain models and business logic for the blood test report analyser:
//! analysis types and the agent personas they map to, PDF report reading,
//! the analysis runner, the background workers and upload housekeeping.

pub mod agent;
pub mod analysis;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod history;
pub mod report;
pub mod runner;
pub mod service;
pub mod worker;

pub use analysis::AnalysisType;
pub use config::Settings;
pub use error::{BtaError, BtaResult};
pub use runner::{AnalysisOutcome, AnalysisRequest, AnalysisRunner};
pub use service::{AnalysisService, SyncAnalysis, Upload};
