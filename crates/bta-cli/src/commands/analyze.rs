//! One-shot analysis command.

use anyhow::{Context, Result};
use bta_core::{Settings, Upload};
use clap::Args;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

use super::build_service;
use crate::output;

#[derive(Args)]
pub struct AnalyzeArgs {
    /// PDF blood test report
    pub file: PathBuf,

    /// Question to answer about the report
    #[arg(short, long)]
    pub query: Option<String>,

    /// summary, nutrition, exercise or verification
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub analysis_type: Option<String>,

    /// Record the analysis under this user
    #[arg(short, long)]
    pub user: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: AnalyzeArgs, settings: Settings) -> Result<()> {
    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let file_name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let service = build_service(&settings).await?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("Analyzing {}...", file_name));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = service
        .analyze_now(Upload {
            file_name,
            bytes,
            query: args.query,
            analysis_type: args.analysis_type,
            user_id: args.user,
        })
        .await;
    pb.finish_and_clear();

    let done = result?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&done)?);
        return Ok(());
    }

    output::print_analysis(&done);
    println!(
        "{} Saved as analysis {} ({:.1}s)",
        "✓".green(),
        done.analysis_id.to_string().cyan(),
        done.outcome.processing_time
    );
    Ok(())
}
