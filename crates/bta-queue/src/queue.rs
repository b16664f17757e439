//! The queue abstraction shared by the API and the workers.

use async_trait::async_trait;
use std::time::Duration;

use crate::client::{QueueError, QueueResult};
use crate::job::{Job, JobState, JobStatus};

/// A task queue with a status store attached.
///
/// Backends provide the storage primitives; the status transitions are
/// implemented once here on top of them.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Store a pending state for `job` and push it onto the queue.
    async fn enqueue(&self, job: Job) -> QueueResult<JobState>;

    /// Pop the next job, waiting up to `timeout`.
    async fn dequeue(&self, timeout: Duration) -> QueueResult<Option<Job>>;

    /// Current state of a job, if it is known.
    async fn state(&self, id: &str) -> QueueResult<Option<JobState>>;

    /// Overwrite a job's state.
    async fn put_state(&self, state: &JobState) -> QueueResult<()>;

    /// Number of jobs waiting to be picked up.
    async fn pending_count(&self) -> QueueResult<usize>;

    /// Mark a job as being worked on.
    async fn set_progress(&self, id: &str, message: &str) -> QueueResult<JobState> {
        let mut state = self.require(id).await?;
        state.transition(JobStatus::Progress)?;
        state.message = Some(message.to_string());
        self.put_state(&state).await?;
        Ok(state)
    }

    /// Record a successful result.
    async fn complete(
        &self,
        id: &str,
        result: &str,
        analysis_id: Option<i64>,
        processing_time: f64,
    ) -> QueueResult<JobState> {
        let mut state = self.require(id).await?;
        state.transition(JobStatus::Success)?;
        state.message = None;
        state.result = Some(result.to_string());
        state.analysis_id = analysis_id;
        state.processing_time = Some(processing_time);
        self.put_state(&state).await?;
        Ok(state)
    }

    /// Record a failure.
    async fn fail(&self, id: &str, error: &str) -> QueueResult<JobState> {
        let mut state = self.require(id).await?;
        state.transition(JobStatus::Failure)?;
        state.message = None;
        state.error = Some(error.to_string());
        self.put_state(&state).await?;
        Ok(state)
    }

    /// Like [`JobQueue::state`] but unknown ids are an error.
    async fn require(&self, id: &str) -> QueueResult<JobState> {
        self.state(id)
            .await?
            .ok_or_else(|| QueueError::NotFound(id.to_string()))
    }
}
