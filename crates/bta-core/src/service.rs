//! Analysis service: the operations the HTTP API and the CLI expose.
//!
//! Owns the runner, the history database and the queue. Synchronous
//! analyses run inline; queued analyses are picked up by
//! [`crate::worker::WorkerPool`], which calls back into
//! [`AnalysisService::process_job`].

use bta_db::DbPool;
use bta_queue::{EventSender, Job, JobEvent, JobQueue, JobState, JobStatus, QueueError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::analysis::{normalize_query, AnalysisType};
use crate::cleanup::{remove_upload, upload_path};
use crate::error::{BtaError, BtaResult};
use crate::history::model::{AnalysisRecord, RecordStatus, User};
use crate::history::{self, RecordInput};
use crate::report::is_pdf;
use crate::runner::{AnalysisOutcome, AnalysisRequest, AnalysisRunner};

/// Progress message shown while a worker holds a job.
pub const PROGRESS_MESSAGE: &str = "Analyzing blood report...";

/// A report submitted for analysis.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub query: Option<String>,
    pub analysis_type: Option<String>,
    pub user_id: Option<String>,
}

/// Result of a synchronous analysis.
#[derive(Debug, Clone, Serialize)]
pub struct SyncAnalysis {
    pub analysis_id: i64,
    pub file_name: String,
    pub outcome: AnalysisOutcome,
}

/// Validated upload ready to be stored.
struct Accepted {
    analysis_type: AnalysisType,
    query: String,
    file_name: String,
    user_id: Option<String>,
}

pub struct AnalysisService {
    runner: Arc<AnalysisRunner>,
    db: Arc<DbPool>,
    queue: Arc<dyn JobQueue>,
    events: EventSender,
    data_dir: PathBuf,
}

impl AnalysisService {
    pub fn new(
        runner: Arc<AnalysisRunner>,
        db: Arc<DbPool>,
        queue: Arc<dyn JobQueue>,
        events: EventSender,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            db,
            queue,
            events,
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn queue(&self) -> &Arc<dyn JobQueue> {
        &self.queue
    }

    /// Subscribe to job status events.
    pub fn subscribe(&self) -> bta_queue::EventReceiver {
        self.events.subscribe()
    }

    /// Run an analysis inline. The stored upload is removed afterwards
    /// whatever the outcome.
    pub async fn analyze_now(&self, upload: Upload) -> BtaResult<SyncAnalysis> {
        let accepted = validate(&upload)?;
        let path = self.store_upload(&upload.bytes).await?;

        let request = AnalysisRequest {
            file_path: path.clone(),
            query: accepted.query.clone(),
            analysis_type: accepted.analysis_type,
        };
        let started = Instant::now();
        let result = self.runner.run(&request).await;
        remove_upload(&path).await;

        match result {
            Ok(outcome) => {
                let analysis_id = self
                    .record(
                        &accepted,
                        &outcome.text,
                        outcome.processing_time,
                        RecordStatus::Completed,
                        None,
                    )
                    .await?;
                Ok(SyncAnalysis {
                    analysis_id,
                    file_name: accepted.file_name,
                    outcome,
                })
            }
            Err(e) => {
                warn!(error = %e, "Synchronous analysis failed");
                let message = format!("Error: {}", e);
                let elapsed = started.elapsed().as_secs_f64();
                if let Err(db_err) = self
                    .record(&accepted, &message, elapsed, RecordStatus::Failed, None)
                    .await
                {
                    error!(error = %db_err, "Failed to record failed analysis");
                }
                Err(e)
            }
        }
    }

    /// Store the upload and queue it. Returns the pending job state.
    pub async fn submit(&self, upload: Upload) -> BtaResult<JobState> {
        let accepted = validate(&upload)?;
        let path = self.store_upload(&upload.bytes).await?;

        let job = Job::new(
            path.to_string_lossy(),
            accepted.file_name,
            accepted.query,
            accepted.analysis_type.as_str(),
            accepted.user_id,
        );
        let state = match self.queue.enqueue(job).await {
            Ok(state) => state,
            Err(e) => {
                remove_upload(&path).await;
                return Err(e.into());
            }
        };

        info!(task_id = %state.id, analysis_type = %state.analysis_type, "Analysis queued");
        self.publish(&state);
        Ok(state)
    }

    /// Current status of a queued analysis.
    pub async fn job_state(&self, task_id: &str) -> BtaResult<JobState> {
        self.queue
            .state(task_id)
            .await?
            .ok_or_else(|| BtaError::JobNotFound(task_id.to_string()))
    }

    /// Finished state of a queued analysis.
    ///
    /// Unfinished jobs are [`BtaError::JobNotReady`] and failed ones
    /// [`BtaError::JobFailed`].
    pub async fn job_result(&self, task_id: &str) -> BtaResult<JobState> {
        let state = match self.queue.state(task_id).await? {
            Some(state) => state,
            None => {
                // The status store may have expired the job; history keeps it.
                let owned = task_id.to_string();
                let record = self
                    .db_call(move |db| {
                        Ok(bta_db::queries::analyses::get_analysis_by_task(db, &owned)?)
                    })
                    .await?
                    .map(AnalysisRecord::from_row)
                    .ok_or_else(|| BtaError::JobNotFound(task_id.to_string()))?;
                return match record.status {
                    RecordStatus::Failed => Err(BtaError::JobFailed {
                        id: task_id.to_string(),
                        error: record.result,
                    }),
                    RecordStatus::Completed => Ok(expired_state(task_id, record)),
                };
            }
        };

        match state.status {
            JobStatus::Success => Ok(state),
            JobStatus::Failure => Err(BtaError::JobFailed {
                id: state.id.clone(),
                error: state.error.unwrap_or_default(),
            }),
            status => Err(BtaError::JobNotReady { id: state.id, status }),
        }
    }

    /// Work one queued job through to a terminal state.
    pub async fn process_job(&self, job: Job) -> BtaResult<JobState> {
        let path = PathBuf::from(&job.file_path);
        let state = match self.queue.set_progress(&job.id, PROGRESS_MESSAGE).await {
            Ok(state) => state,
            Err(e @ QueueError::InvalidTransition { .. }) => {
                // Delivered twice; whoever claimed it first owns the upload.
                warn!(task_id = %job.id, error = %e, "Skipping job that is already claimed");
                return Err(e.into());
            }
            Err(e) => {
                warn!(task_id = %job.id, error = %e, "Dropping job without a live state");
                remove_upload(&path).await;
                return Err(e.into());
            }
        };
        self.publish(&state);

        let started = Instant::now();
        let outcome = match job.analysis_type.parse::<AnalysisType>() {
            Ok(analysis_type) => {
                let request = AnalysisRequest {
                    file_path: path.clone(),
                    query: normalize_query(Some(&job.query)),
                    analysis_type,
                };
                self.runner.run(&request).await
            }
            Err(e) => Err(e),
        };
        remove_upload(&path).await;

        let accepted = Accepted {
            analysis_type: job.analysis_type.parse().unwrap_or_default(),
            query: job.query.clone(),
            file_name: job.file_name.clone(),
            user_id: job.user_id.clone(),
        };

        let state = match outcome {
            Ok(outcome) => {
                let analysis_id = self
                    .record(
                        &accepted,
                        &outcome.text,
                        outcome.processing_time,
                        RecordStatus::Completed,
                        Some(&job.id),
                    )
                    .await;
                match analysis_id {
                    Ok(id) => {
                        self.queue
                            .complete(&job.id, &outcome.text, Some(id), outcome.processing_time)
                            .await?
                    }
                    Err(e) => {
                        error!(task_id = %job.id, error = %e, "Failed to record analysis");
                        self.queue.fail(&job.id, &e.to_string()).await?
                    }
                }
            }
            Err(e) => {
                warn!(task_id = %job.id, error = %e, "Queued analysis failed");
                let message = format!("Error: {}", e);
                let elapsed = started.elapsed().as_secs_f64();
                if let Err(db_err) = self
                    .record(&accepted, &message, elapsed, RecordStatus::Failed, Some(&job.id))
                    .await
                {
                    error!(task_id = %job.id, error = %db_err, "Failed to record failed analysis");
                }
                self.queue.fail(&job.id, &e.to_string()).await?
            }
        };

        info!(task_id = %job.id, status = %state.status, "Job finished");
        self.publish(&state);
        Ok(state)
    }

    /// A user's analysis history.
    pub async fn history(
        &self,
        user_id: &str,
        limit: Option<u32>,
    ) -> BtaResult<Vec<AnalysisRecord>> {
        let user_id = user_id.to_string();
        self.db_call(move |db| history::list_history(db, &user_id, limit)).await
    }

    /// One stored analysis.
    pub async fn analysis(&self, id: i64) -> BtaResult<AnalysisRecord> {
        self.db_call(move |db| history::get_analysis(db, id)).await
    }

    pub async fn create_user(&self, user_id: &str, email: Option<&str>) -> BtaResult<User> {
        let user_id = user_id.to_string();
        let email = email.map(str::to_string);
        self.db_call(move |db| history::create_user(db, &user_id, email.as_deref()))
            .await
    }

    pub async fn user(&self, user_id: &str) -> BtaResult<User> {
        let user_id = user_id.to_string();
        self.db_call(move |db| history::get_user(db, &user_id)).await
    }

    async fn store_upload(&self, bytes: &[u8]) -> BtaResult<PathBuf> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        let path = upload_path(&self.data_dir, &uuid::Uuid::new_v4().to_string());
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    async fn record(
        &self,
        accepted: &Accepted,
        result: &str,
        processing_time: f64,
        status: RecordStatus,
        task_id: Option<&str>,
    ) -> BtaResult<i64> {
        let user_id = accepted.user_id.clone();
        let file_name = accepted.file_name.clone();
        let query = accepted.query.clone();
        let analysis_type = accepted.analysis_type;
        let result = result.to_string();
        let task_id = task_id.map(str::to_string);
        self.db_call(move |db| {
            history::record_analysis(
                db,
                &RecordInput {
                    user_id: user_id.as_deref(),
                    file_name: &file_name,
                    query: &query,
                    analysis_type,
                    result: &result,
                    processing_time,
                    status,
                    task_id: task_id.as_deref(),
                },
            )
        })
        .await
    }

    /// Run a blocking database call off the async runtime.
    async fn db_call<T, F>(&self, f: F) -> BtaResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&DbPool) -> BtaResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| BtaError::Internal(e.to_string()))?
    }

    fn publish(&self, state: &JobState) {
        let _ = self.events.send(JobEvent {
            task_id: state.id.clone(),
            status: state.status,
            message: state.message.clone(),
        });
    }
}

/// Check an upload before anything touches the disk.
fn validate(upload: &Upload) -> BtaResult<Accepted> {
    let analysis_type = AnalysisType::parse_optional(upload.analysis_type.as_deref())?;
    if upload.bytes.is_empty() {
        return Err(BtaError::invalid_upload("file is empty"));
    }
    if !is_pdf(&upload.bytes) {
        return Err(BtaError::invalid_upload("file is not a PDF document"));
    }
    let file_name = Path::new(upload.file_name.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("report.pdf")
        .to_string();
    Ok(Accepted {
        analysis_type,
        query: normalize_query(upload.query.as_deref()),
        file_name,
        user_id: upload
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string),
    })
}

/// Rebuild a success state from history once the status store forgot the job.
fn expired_state(task_id: &str, record: AnalysisRecord) -> JobState {
    JobState {
        id: task_id.to_string(),
        status: JobStatus::Success,
        analysis_type: record.analysis_type,
        query: record.query,
        user_id: Some(record.user_id),
        message: None,
        result: Some(record.result),
        error: None,
        analysis_id: Some(record.id),
        processing_time: Some(record.processing_time),
        created_at: record.created_at.clone(),
        updated_at: record.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testing::{EchoModel, StaticReader};
    use bta_queue::MemoryQueue;
    use std::time::Duration;

    const PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n";

    struct Fixture {
        service: AnalysisService,
        model: Arc<EchoModel>,
        queue: Arc<MemoryQueue>,
        _dir: tempfile::TempDir,
    }

    fn fixture_with(model: EchoModel, report: &'static str) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(model);
        let reader = Arc::new(StaticReader(report));
        let runner = Arc::new(AnalysisRunner::new(model.clone(), reader, 10_000));
        let queue = Arc::new(MemoryQueue::new());
        let service = AnalysisService::new(
            runner,
            Arc::new(bta_db::init_memory_pool().unwrap()),
            queue.clone(),
            bta_queue::create_broadcast_channel(),
            dir.path().join("data"),
        );
        Fixture { service, model, queue, _dir: dir }
    }

    fn fixture() -> Fixture {
        fixture_with(EchoModel::default(), "Hemoglobin 13.5 g/dL")
    }

    fn upload(analysis_type: Option<&str>, user_id: Option<&str>) -> Upload {
        Upload {
            file_name: "lab.pdf".into(),
            bytes: PDF.to_vec(),
            query: None,
            analysis_type: analysis_type.map(str::to_string),
            user_id: user_id.map(str::to_string),
        }
    }

    fn uploads_left(service: &AnalysisService) -> usize {
        std::fs::read_dir(service.data_dir()).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_analyze_now_returns_text_and_records() {
        let fx = fixture();
        let result = fx
            .service
            .analyze_now(upload(Some("nutrition"), Some("alice")))
            .await
            .unwrap();

        assert!(!result.outcome.text.is_empty());
        assert_eq!(result.outcome.agent, "nutritionist");
        assert_eq!(result.outcome.query, crate::analysis::DEFAULT_QUERY);
        assert_eq!(result.file_name, "lab.pdf");
        assert_eq!(uploads_left(&fx.service), 0);

        let history = fx.service.history("alice", None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, result.analysis_id);
        assert_eq!(history[0].analysis_type, "nutrition");
    }

    #[tokio::test]
    async fn test_unknown_type_rejected_before_storage() {
        let fx = fixture();
        let err = fx.service.analyze_now(upload(Some("astrology"), None)).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(fx.model.calls.lock().unwrap().is_empty());
        assert_eq!(uploads_left(&fx.service), 0);

        let err = fx.service.submit(upload(Some("astrology"), None)).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(fx.queue.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_non_pdf_rejected() {
        let fx = fixture();
        let mut bad = upload(None, None);
        bad.bytes = b"just some text".to_vec();
        let err = fx.service.analyze_now(bad).await.unwrap_err();
        assert!(matches!(err, BtaError::InvalidUpload(_)));

        let mut empty = upload(None, None);
        empty.bytes.clear();
        assert!(fx.service.submit(empty).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_sync_analysis_is_recorded() {
        let fx = fixture_with(EchoModel { fail: true, ..Default::default() }, "x");
        let err = fx.service.analyze_now(upload(None, Some("bob"))).await.unwrap_err();
        assert_eq!(err.status_code(), 502);

        let history = fx.service.history("bob", None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, RecordStatus::Failed);
        assert!(history[0].result.starts_with("Error: "));
        assert_eq!(uploads_left(&fx.service), 0);
    }

    #[tokio::test]
    async fn test_queued_job_lifecycle() {
        let fx = fixture();
        let mut events = fx.service.subscribe();
        fx.service.create_user("carol", None).await.unwrap();

        let state = fx.service.submit(upload(Some("exercise"), Some("carol"))).await.unwrap();
        assert_eq!(state.status, JobStatus::Pending);
        assert!(matches!(
            fx.service.job_result(&state.id).await,
            Err(BtaError::JobNotReady { status: JobStatus::Pending, .. })
        ));

        let job = fx.queue.dequeue(Duration::from_millis(50)).await.unwrap().unwrap();
        assert!(Path::new(&job.file_path).exists());
        let done = fx.service.process_job(job.clone()).await.unwrap();
        assert_eq!(done.status, JobStatus::Success);
        assert!(!Path::new(&job.file_path).exists());

        let result = fx.service.job_result(&state.id).await.unwrap();
        assert!(result.result.as_deref().is_some_and(|r| !r.is_empty()));
        let analysis_id = result.analysis_id.unwrap();
        let record = fx.service.analysis(analysis_id).await.unwrap();
        assert_eq!(record.task_id.as_deref(), Some(state.id.as_str()));
        assert_eq!(fx.service.user("carol").await.unwrap().total_analyses, 1);

        let statuses: Vec<JobStatus> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|e| e.status)
            .collect();
        assert_eq!(
            statuses,
            vec![JobStatus::Pending, JobStatus::Progress, JobStatus::Success]
        );
    }

    fn slow_failing_model() -> EchoModel {
        EchoModel {
            fail: true,
            delay: Duration::from_millis(30),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_failed_analysis_keeps_elapsed_time() {
        let fx = fixture_with(slow_failing_model(), "x");
        fx.service.analyze_now(upload(None, Some("fay"))).await.unwrap_err();

        let state = fx.service.submit(upload(None, Some("fay"))).await.unwrap();
        let job = fx.queue.dequeue(Duration::from_millis(50)).await.unwrap().unwrap();
        fx.service.process_job(job).await.unwrap();
        assert_eq!(fx.service.job_state(&state.id).await.unwrap().status, JobStatus::Failure);

        let history = fx.service.history("fay", None).await.unwrap();
        assert_eq!(history.len(), 2);
        for record in history {
            assert_eq!(record.status, RecordStatus::Failed);
            assert!(record.processing_time >= 0.03, "got {}", record.processing_time);
        }
    }

    #[tokio::test]
    async fn test_duplicate_delivery_runs_once() {
        let fx = fixture();
        let state = fx.service.submit(upload(None, Some("gus"))).await.unwrap();
        let job = fx.queue.dequeue(Duration::from_millis(50)).await.unwrap().unwrap();
        fx.queue.set_progress(&state.id, "claimed elsewhere").await.unwrap();

        let err = fx.service.process_job(job.clone()).await.unwrap_err();
        assert!(matches!(err, BtaError::Queue(QueueError::InvalidTransition { .. })));
        // The first claimant still needs the upload.
        assert!(Path::new(&job.file_path).exists());
        assert!(fx.model.calls.lock().unwrap().is_empty());
        assert!(fx.service.history("gus", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_queued_job_failure() {
        let fx = fixture_with(EchoModel { fail: true, ..Default::default() }, "x");
        let state = fx.service.submit(upload(None, Some("dave"))).await.unwrap();
        let job = fx.queue.dequeue(Duration::from_millis(50)).await.unwrap().unwrap();

        let done = fx.service.process_job(job).await.unwrap();
        assert_eq!(done.status, JobStatus::Failure);

        let err = fx.service.job_result(&state.id).await.unwrap_err();
        assert!(matches!(err, BtaError::JobFailed { .. }));
        let history = fx.service.history("dave", None).await.unwrap();
        assert_eq!(history[0].status, RecordStatus::Failed);
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let fx = fixture();
        assert!(matches!(
            fx.service.job_state("missing").await,
            Err(BtaError::JobNotFound(_))
        ));
        assert!(matches!(
            fx.service.job_result("missing").await,
            Err(BtaError::JobNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_result_survives_status_expiry() {
        let fx = fixture();
        let state = fx.service.submit(upload(None, Some("erin"))).await.unwrap();
        let job = fx.queue.dequeue(Duration::from_millis(50)).await.unwrap().unwrap();
        fx.service.process_job(job).await.unwrap();

        // A fresh status store has never heard of the job.
        let service = AnalysisService::new(
            fx.service.runner.clone(),
            fx.service.db.clone(),
            Arc::new(MemoryQueue::new()),
            bta_queue::create_broadcast_channel(),
            fx.service.data_dir().to_path_buf(),
        );
        let result = service.job_result(&state.id).await.unwrap();
        assert_eq!(result.status, JobStatus::Success);
        assert!(result.result.is_some());
    }

    #[test]
    fn test_validate_sanitizes_file_name() {
        let mut up = upload(None, Some("  "));
        up.file_name = "../../etc/lab.pdf".into();
        let accepted = validate(&up).unwrap();
        assert_eq!(accepted.file_name, "lab.pdf");
        assert!(accepted.user_id.is_none());

        up.file_name = String::new();
        assert_eq!(validate(&up).unwrap().file_name, "report.pdf");
    }
}
