//! Error types for the tool gateway.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while driving an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The executable could not be found.
    #[error("tool not found: {path}")]
    NotFound { path: PathBuf },

    /// The process could not be started.
    #[error("failed to launch {command}: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting for or signalling the process failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Maps a spawn error, distinguishing a missing executable.
    pub fn launch(program: &std::path::Path, command: String, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                path: program.to_path_buf(),
            }
        } else {
            Self::Launch { command, source }
        }
    }
}
