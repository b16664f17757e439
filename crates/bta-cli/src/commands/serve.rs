//! Web server command.

use anyhow::Result;
use bta_core::cleanup::spawn_sweeper;
use bta_core::worker::WorkerPool;
use bta_core::Settings;
use bta_web::AppState;
use clap::Args;
use colored::Colorize;
use tokio::sync::watch;

use super::{build_service, shutdown_signal};

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long, env = "BTA_PORT", default_value = "8000")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, env = "BTA_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Number of in-process workers
    #[arg(long, env = "BTA_WORKERS", default_value = "2")]
    pub workers: usize,

    /// Don't start workers (queued jobs wait for `bta worker`)
    #[arg(long)]
    pub no_workers: bool,
}

pub async fn execute(args: ServeArgs, settings: Settings) -> Result<()> {
    let settings = Settings {
        workers: args.workers.max(1),
        ..settings
    };
    let service = build_service(&settings).await?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let workers = if args.no_workers {
        if settings.redis_url.is_none() {
            tracing::warn!("No workers and no Redis: queued analyses will never run");
        }
        None
    } else {
        Some(WorkerPool::spawn(settings.workers, service.clone(), shutdown_rx.clone()))
    };
    let sweeper = spawn_sweeper(
        settings.data_dir.clone(),
        settings.cleanup_max_age,
        settings.cleanup_interval,
        shutdown_rx,
    );

    let queue = if settings.redis_url.is_some() { "redis" } else { "in-process" };
    println!();
    println!(
        "  {} {}",
        "BTA".cyan().bold(),
        "Blood Test Report Analyser".bold()
    );
    println!();
    println!("  {}        http://{}:{}", "API".green(), args.host, args.port);
    println!("  {}  ws://{}:{}/ws", "WebSocket".green(), args.host, args.port);
    println!(
        "  {}    {} ({} workers)",
        "Queue".green(),
        queue,
        workers.as_ref().map_or(0, |w| w.len())
    );
    println!(
        "  {}    {} @ {}",
        "Model".green(),
        settings.llm.model,
        settings.llm.base_url
    );
    println!();
    println!("  {}", "Ctrl+C to stop".dimmed());
    println!();

    let state = AppState::new(service, settings.upload_limit);
    let result = bta_web::run_server(state, &args.host, args.port, shutdown_signal()).await;

    let _ = shutdown_tx.send(true);
    if let Some(workers) = workers {
        workers.join().await;
    }
    let _ = sweeper.await;

    result
}
