//! In-process queue backend.
//!
//! Jobs travel over a tokio channel and states live in a map. Suitable for a
//! single `bta serve` process and for tests; nothing survives a restart.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::debug;

use crate::client::{QueueError, QueueResult};
use crate::job::{Job, JobState};
use crate::queue::JobQueue;

/// Finished states older than this are dropped on the next enqueue.
const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

pub struct MemoryQueue {
    tx: mpsc::UnboundedSender<Job>,
    rx: Mutex<mpsc::UnboundedReceiver<Job>>,
    states: RwLock<HashMap<String, JobState>>,
    queued: AtomicUsize,
    retention: Duration,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    /// Keep finished job states for `retention`.
    pub fn with_retention(retention: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            states: RwLock::new(HashMap::new()),
            queued: AtomicUsize::new(0),
            retention,
        }
    }

    async fn prune(&self) {
        let retention = chrono::Duration::from_std(self.retention)
            .unwrap_or_else(|_| chrono::Duration::days(365));
        let cutoff = chrono::Utc::now() - retention;
        let mut states = self.states.write().await;
        let before = states.len();
        states.retain(|_, s| {
            !s.status.is_terminal()
                || chrono::DateTime::parse_from_rfc3339(&s.updated_at)
                    .map(|t| t >= cutoff)
                    .unwrap_or(true)
        });
        let dropped = before - states.len();
        if dropped > 0 {
            debug!(dropped, "Pruned finished job states");
        }
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, job: Job) -> QueueResult<JobState> {
        self.prune().await;
        let state = JobState::pending(&job);
        self.states.write().await.insert(job.id.clone(), state.clone());
        self.tx.send(job).map_err(|_| QueueError::Closed)?;
        self.queued.fetch_add(1, Ordering::SeqCst);
        Ok(state)
    }

    async fn dequeue(&self, timeout: Duration) -> QueueResult<Option<Job>> {
        let mut rx = self.rx.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(job)) => {
                self.queued.fetch_sub(1, Ordering::SeqCst);
                Ok(Some(job))
            }
            Ok(None) => Err(QueueError::Closed),
            Err(_) => Ok(None),
        }
    }

    async fn state(&self, id: &str) -> QueueResult<Option<JobState>> {
        Ok(self.states.read().await.get(id).cloned())
    }

    async fn put_state(&self, state: &JobState) -> QueueResult<()> {
        self.states.write().await.insert(state.id.clone(), state.clone());
        Ok(())
    }

    async fn pending_count(&self) -> QueueResult<usize> {
        Ok(self.queued.load(Ordering::SeqCst))
    }
}
