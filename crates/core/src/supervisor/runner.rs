//! Job supervisor implementation.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, RwLock, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::pipeline::{
    ConversionPipeline, Job, JobId, JobPaths, JobRequest, Notification, Outcome,
};
use crate::tools::ToolRunner;

use super::error::SupervisorError;
use super::handle::JobHandle;
use super::types::JobStatus;

/// An entry in the active set.
struct ActiveJob {
    status: JobStatus,
    paths: JobPaths,
    cancel: CancellationToken,
}

type ActiveJobs = Arc<RwLock<HashMap<JobId, ActiveJob>>>;

/// Runs every enqueued job on its own task.
///
/// Jobs share nothing mutable with each other. Each one reports through
/// its own notification stream, which a relay task also folds into the
/// snapshots returned by [`JobSupervisor::status`] and
/// [`JobSupervisor::jobs`].
pub struct JobSupervisor<R: ToolRunner + 'static> {
    pipeline: Arc<ConversionPipeline<R>>,
    jobs: ActiveJobs,
    admission: Option<Arc<Semaphore>>,
}

impl<R: ToolRunner + 'static> JobSupervisor<R> {
    pub fn new(pipeline: ConversionPipeline<R>) -> Self {
        let admission = pipeline
            .config()
            .max_concurrent_jobs
            .map(|limit| Arc::new(Semaphore::new(limit)));

        Self {
            pipeline: Arc::new(pipeline),
            jobs: Arc::new(RwLock::new(HashMap::new())),
            admission,
        }
    }

    pub fn pipeline(&self) -> &ConversionPipeline<R> {
        &self.pipeline
    }

    /// Creates a job and starts it in the background.
    ///
    /// Returns immediately; with an admission limit the job waits in the
    /// `Queued` state until a slot frees up. Fails only when the request
    /// cannot become a job.
    pub async fn enqueue(&self, request: JobRequest) -> Result<JobHandle, SupervisorError> {
        let job = self.pipeline.create_job(&request)?;
        let id = job.id;

        {
            let mut jobs = self.jobs.write().await;
            if let Some(other) = find_collision(&jobs, &job.paths) {
                warn!(
                    job = %id,
                    other = %other,
                    source = %request.source_path.display(),
                    "Working files overlap with another running job"
                );
            }
            jobs.insert(
                id,
                ActiveJob {
                    status: JobStatus::queued(id, request.source_path.clone()),
                    paths: job.paths.clone(),
                    cancel: job.cancel.clone(),
                },
            );
        }
        metrics::JOBS_ENQUEUED.inc();
        info!(job = %id, source = %request.source_path.display(), "Job enqueued");

        let buffer = self.pipeline.config().notification_buffer;
        let (pipeline_tx, pipeline_rx) = mpsc::channel(buffer);
        let (consumer_tx, consumer_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();

        tokio::spawn(relay(
            id,
            pipeline_rx,
            consumer_tx,
            Arc::clone(&self.jobs),
            outcome_tx,
        ));

        let handle = JobHandle::new(
            id,
            request.source_path,
            job.cancel.clone(),
            consumer_rx,
            outcome_rx,
        );

        let pipeline = Arc::clone(&self.pipeline);
        let admission = self.admission.clone();
        tokio::spawn(async move {
            run_job(pipeline, admission, job, pipeline_tx).await;
        });

        Ok(handle)
    }

    /// Requests cancellation of a job. A job that already finished is left
    /// alone.
    pub async fn cancel(&self, id: &JobId) -> Result<(), SupervisorError> {
        let jobs = self.jobs.read().await;
        let active = jobs.get(id).ok_or(SupervisorError::JobNotFound(*id))?;
        if !active.status.is_terminal() {
            debug!(job = %id, "Cancellation requested");
            active.cancel.cancel();
        }
        Ok(())
    }

    /// Cancels every job that has not finished. Returns how many were
    /// signalled.
    pub async fn cancel_all(&self) -> usize {
        let jobs = self.jobs.read().await;
        let mut count = 0;
        for active in jobs.values().filter(|a| !a.status.is_terminal()) {
            active.cancel.cancel();
            count += 1;
        }
        if count > 0 {
            info!(count, "Cancelling all running jobs");
        }
        count
    }

    pub async fn status(&self, id: &JobId) -> Option<JobStatus> {
        self.jobs.read().await.get(id).map(|a| a.status.clone())
    }

    /// Snapshots of the active set, oldest first.
    pub async fn jobs(&self) -> Vec<JobStatus> {
        let mut statuses: Vec<_> = self
            .jobs
            .read()
            .await
            .values()
            .map(|a| a.status.clone())
            .collect();
        statuses.sort_by_key(|s| s.enqueued_at);
        statuses
    }

    /// Removes a finished job from the active set.
    pub async fn dismiss(&self, id: &JobId) -> Result<JobStatus, SupervisorError> {
        let mut jobs = self.jobs.write().await;
        match jobs.get(id) {
            None => Err(SupervisorError::JobNotFound(*id)),
            Some(active) if !active.status.is_terminal() => {
                Err(SupervisorError::JobStillRunning(*id))
            }
            Some(_) => {
                let active = jobs.remove(id).ok_or(SupervisorError::JobNotFound(*id))?;
                debug!(job = %id, "Job dismissed");
                Ok(active.status)
            }
        }
    }
}

/// A running job whose files overlap with `paths`.
fn find_collision(jobs: &HashMap<JobId, ActiveJob>, paths: &JobPaths) -> Option<JobId> {
    jobs.iter()
        .find(|(_, active)| !active.status.is_terminal() && active.paths.collides_with(paths))
        .map(|(id, _)| *id)
}

/// Waits for admission, then runs the pipeline.
async fn run_job<R: ToolRunner + 'static>(
    pipeline: Arc<ConversionPipeline<R>>,
    admission: Option<Arc<Semaphore>>,
    job: Job,
    tx: mpsc::Sender<Notification>,
) {
    let _permit = match admission {
        Some(semaphore) => {
            let permit = tokio::select! {
                biased;
                _ = job.cancel.cancelled() => None,
                permit = semaphore.acquire_owned() => permit.ok(),
            };
            if permit.is_none() {
                info!(job = %job.id, "Job cancelled while queued");
                if tx.send(Notification::Cancelled).await.is_err() {
                    debug!(job = %job.id, "Relay gone before cancellation was reported");
                }
                return;
            }
            permit
        }
        None => None,
    };

    pipeline.run(&job, tx).await;
}

/// Forwards a job's notifications to its consumer, keeping the snapshot in
/// step and resolving the outcome once the terminal notification passes.
async fn relay(
    id: JobId,
    mut rx: mpsc::Receiver<Notification>,
    consumer: mpsc::UnboundedSender<Notification>,
    jobs: ActiveJobs,
    outcome_tx: oneshot::Sender<Outcome>,
) {
    let mut outcome = None;

    while let Some(notification) = rx.recv().await {
        if let Some(active) = jobs.write().await.get_mut(&id) {
            active.status.apply(&notification);
        }

        if let Some(terminal) = Outcome::from_notification(&notification) {
            metrics::JOBS_FINISHED
                .with_label_values(&[terminal.as_str()])
                .inc();
            outcome = Some(terminal);
        }

        // Nobody listening is fine
        let _ = consumer.send(notification);
    }

    match outcome {
        Some(outcome) => {
            let _ = outcome_tx.send(outcome);
        }
        None => warn!(job = %id, "Job ended without a terminal notification"),
    }
}
