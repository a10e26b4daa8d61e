//! Error types for the supervisor module.

use thiserror::Error;

use crate::pipeline::{JobError, JobId};

#[derive(Debug, Error)]
pub enum SupervisorError {
    /// No active job has this id.
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    /// The job has not reached a terminal state yet.
    #[error("job is still running: {0}")]
    JobStillRunning(JobId),

    /// Someone already took the job's notification stream.
    #[error("notification consumer already registered for job {0}")]
    ConsumerAlreadyRegistered(JobId),

    /// The request was refused before any job was created.
    #[error("job rejected: {0}")]
    Rejected(#[from] JobError),

    /// The job's task ended without reporting an outcome.
    #[error("job task aborted: {0}")]
    Aborted(JobId),
}
