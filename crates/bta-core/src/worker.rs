//! Background workers that drain the job queue.

use bta_queue::JobQueue;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::service::AnalysisService;

/// How long one dequeue call waits before checking for shutdown again.
const POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Pause after a queue error before polling again.
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// A fixed set of worker tasks.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `count` workers. They run until `shutdown` flips to true.
    pub fn spawn(
        count: usize,
        service: Arc<AnalysisService>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let handles = (0..count)
            .map(|n| {
                let service = Arc::clone(&service);
                let shutdown = shutdown.clone();
                tokio::spawn(run_worker(n, service, shutdown))
            })
            .collect();
        info!(count, "Workers started");
        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker to exit.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Worker task panicked");
            }
        }
    }
}

async fn run_worker(n: usize, service: Arc<AnalysisService>, mut shutdown: watch::Receiver<bool>) {
    debug!(worker = n, "Worker polling");
    loop {
        if *shutdown.borrow() {
            break;
        }

        let next = tokio::select! {
            next = service.queue().dequeue(POLL_TIMEOUT) => next,
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
        };

        match next {
            Ok(Some(job)) => {
                let task_id = job.id.clone();
                info!(worker = n, task_id = %task_id, "Picked up job");
                // A job in hand is finished even if shutdown is requested meanwhile.
                if let Err(e) = service.process_job(job).await {
                    error!(worker = n, task_id = %task_id, error = %e, "Job processing failed");
                }
            }
            Ok(None) => {}
            Err(e) => {
                error!(worker = n, error = %e, "Queue unavailable");
                tokio::time::sleep(ERROR_BACKOFF).await;
            }
        }
    }
    debug!(worker = n, "Worker stopped");
}
