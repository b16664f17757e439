//! CLI command definitions and handlers.

use anyhow::{Context, Result};
use bta_core::report::PdfToTextReader;
use bta_core::{AnalysisRunner, AnalysisService, Settings};
use bta_llm::OpenAiClient;
use bta_queue::{JobQueue, MemoryQueue, RedisQueue};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

pub mod analyze;
pub mod cleanup;
pub mod config;
pub mod history;
pub mod serve;
pub mod user;
pub mod worker;

/// Blood Test Report Analyser - LLM-assisted reading of lab reports
#[derive(Parser)]
#[command(name = "bta")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,

    #[command(flatten)]
    pub config: config::ConfigArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API with in-process workers
    Serve(serve::ServeArgs),

    /// Run standalone workers against Redis
    Worker(worker::WorkerArgs),

    /// Analyze a PDF report and print the result
    Analyze(analyze::AnalyzeArgs),

    /// Show a user's analysis history
    History(history::HistoryArgs),

    /// Manage users
    #[command(subcommand)]
    User(user::UserCommands),

    /// Remove stale uploaded reports
    Cleanup(cleanup::CleanupArgs),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let settings = self.config.to_settings()?;

        match self.command {
            Commands::Serve(args) => serve::execute(args, settings).await,
            Commands::Worker(args) => worker::execute(args, settings).await,
            Commands::Analyze(args) => analyze::execute(args, settings).await,
            Commands::History(args) => history::execute(args, settings).await,
            Commands::User(cmd) => user::execute(cmd, settings).await,
            Commands::Cleanup(args) => cleanup::execute(args, settings).await,
        }
    }
}

/// Wire up the service from resolved settings.
///
/// Jobs go to Redis when `REDIS_URL` is set, otherwise to an in-process queue.
pub async fn build_service(settings: &Settings) -> Result<Arc<AnalysisService>> {
    let db = open_db(settings)?;

    let queue: Arc<dyn JobQueue> = match &settings.redis_url {
        Some(url) => Arc::new(
            RedisQueue::connect(url, settings.job_ttl)
                .await
                .with_context(|| format!("Failed to connect to Redis at {}", url))?,
        ),
        None => Arc::new(MemoryQueue::with_retention(settings.job_ttl)),
    };

    let client = OpenAiClient::new(settings.llm.clone()).context("Failed to build LLM client")?;
    let runner = AnalysisRunner::new(
        Arc::new(client),
        Arc::new(PdfToTextReader::new()),
        settings.max_report_chars,
    )
    .with_temperature(settings.temperature);

    Ok(Arc::new(AnalysisService::new(
        Arc::new(runner),
        Arc::new(db),
        queue,
        bta_queue::create_broadcast_channel(),
        settings.data_dir.clone(),
    )))
}

/// Open only the history database.
pub fn open_db(settings: &Settings) -> Result<bta_db::DbPool> {
    bta_db::init_pool(&settings.database_path).with_context(|| {
        format!("Failed to open database {}", settings.database_path.display())
    })
}

/// Resolve once Ctrl+C (or SIGTERM on unix) is received.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown requested");
}
