//! Error types for the pipeline module.

use std::path::{Path, PathBuf};
use thiserror::Error;

use super::types::FailureReason;
use crate::tools::ToolCommand;

/// Why a pipeline run stopped early.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage failed. Halts the pipeline, never retried.
    #[error("{reason} for {}: {detail} (command: {command})", .source_path.display())]
    Stage {
        reason: FailureReason,
        command: String,
        source_path: PathBuf,
        detail: String,
    },

    /// Cancellation was observed. Reported as `Cancelled`, never as a failure.
    #[error("job cancelled")]
    Cancelled,
}

/// Why a job could not be created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// One of the derived working files is the source itself.
    #[error("{} would be overwritten by its own working file {}", .source_path.display(), .working_path.display())]
    SourceConflict {
        source_path: PathBuf,
        working_path: PathBuf,
    },
}

impl PipelineError {
    pub fn stage(
        reason: FailureReason,
        command: &ToolCommand,
        source_path: &Path,
        detail: impl Into<String>,
    ) -> Self {
        Self::Stage {
            reason,
            command: command.to_string(),
            source_path: source_path.to_path_buf(),
            detail: detail.into(),
        }
    }

    /// The failure reason, `None` for cancellation.
    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            Self::Stage { reason, .. } => Some(*reason),
            Self::Cancelled => None,
        }
    }
}
