//! Types for the supervisor module.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

use crate::pipeline::{FailureReason, JobId, Notification, Stage};

/// Lifecycle state of a supervised job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    /// Waiting for an admission permit.
    Queued,
    Running,
    Done,
    Cancelled,
    Failed { reason: FailureReason, detail: String },
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Done | JobState::Cancelled | JobState::Failed { .. }
        )
    }
}

/// Snapshot of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    pub id: JobId,
    pub source_path: PathBuf,
    /// Current stage, `None` until the first stage starts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    /// Progress within the current stage.
    pub progress: u8,
    #[serde(flatten)]
    pub state: JobState,
    pub enqueued_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobStatus {
    pub fn queued(id: JobId, source_path: PathBuf) -> Self {
        Self {
            id,
            source_path,
            stage: None,
            progress: 0,
            state: JobState::Queued,
            enqueued_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Folds one notification into the snapshot.
    pub fn apply(&mut self, notification: &Notification) {
        match notification {
            Notification::ProgressUpdate { percent } => self.progress = *percent,
            Notification::StageChanged { stage } => {
                self.stage = Some(*stage);
                self.progress = 0;
                self.state = JobState::Running;
            }
            Notification::Done => {
                self.stage = Some(Stage::Done);
                self.progress = 100;
                self.finish(JobState::Done);
            }
            Notification::Cancelled => self.finish(JobState::Cancelled),
            Notification::Failed { reason, detail } => self.finish(JobState::Failed {
                reason: *reason,
                detail: detail.clone(),
            }),
        }
    }

    fn finish(&mut self, state: JobState) {
        self.state = state;
        self.finished_at = Some(Utc::now());
    }
}
