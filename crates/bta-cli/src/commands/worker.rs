//! Standalone worker command.

use anyhow::{bail, Result};
use bta_core::cleanup::spawn_sweeper;
use bta_core::worker::WorkerPool;
use bta_core::Settings;
use clap::Args;
use colored::Colorize;
use tokio::sync::watch;

use super::{build_service, shutdown_signal};

#[derive(Args)]
pub struct WorkerArgs {
    /// Number of jobs processed at once
    #[arg(short, long, env = "BTA_WORKERS", default_value = "2")]
    pub concurrency: usize,
}

pub async fn execute(args: WorkerArgs, settings: Settings) -> Result<()> {
    if settings.redis_url.is_none() {
        bail!("Standalone workers need a shared queue: set REDIS_URL or pass --redis-url");
    }

    let service = build_service(&settings).await?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let pool = WorkerPool::spawn(args.concurrency.max(1), service, shutdown_rx.clone());
    let sweeper = spawn_sweeper(
        settings.data_dir.clone(),
        settings.cleanup_max_age,
        settings.cleanup_interval,
        shutdown_rx,
    );

    println!(
        "{} {} workers consuming {}",
        "✓".green(),
        pool.len(),
        "bta:queue".cyan()
    );
    println!("  {}", "Ctrl+C to stop".dimmed());

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);
    // Jobs in progress run to completion.
    pool.join().await;
    let _ = sweeper.await;

    println!("{} Workers stopped", "✓".green());
    Ok(())
}
