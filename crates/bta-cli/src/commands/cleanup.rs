//! Upload cleanup command.

use anyhow::{Context, Result};
use bta_core::cleanup::cleanup_old_files;
use bta_core::Settings;
use clap::Args;
use colored::Colorize;
use std::time::Duration;

#[derive(Args)]
pub struct CleanupArgs {
    /// Remove uploads older than this many seconds (defaults to BTA_CLEANUP_MAX_AGE_SECS)
    #[arg(long)]
    pub max_age_secs: Option<u64>,
}

pub async fn execute(args: CleanupArgs, settings: Settings) -> Result<()> {
    let max_age = args
        .max_age_secs
        .map(Duration::from_secs)
        .unwrap_or(settings.cleanup_max_age);

    let dir = settings.data_dir.clone();
    let removed = tokio::task::spawn_blocking(move || cleanup_old_files(&dir, max_age))
        .await?
        .with_context(|| format!("Failed to sweep {}", settings.data_dir.display()))?;

    if removed == 0 {
        println!("{}", "No stale uploads.".dimmed());
    } else {
        println!(
            "{} Removed {} stale upload{}",
            "✓".green(),
            removed,
            if removed == 1 { "" } else { "s" }
        );
    }
    Ok(())
}
