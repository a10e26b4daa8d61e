//! Error types for key recovery.

use std::path::PathBuf;
use thiserror::Error;

use crate::tools::ToolError;

/// Errors raised while enumerating lookup tables.
#[derive(Debug, Error)]
pub enum TableError {
    /// The tables directory could not be listed.
    #[error("failed to read tables directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the key recovery stage.
#[derive(Debug, Error)]
pub enum KeyRecoveryError {
    /// Cancellation was observed while tables were being tried.
    #[error("key recovery cancelled")]
    Cancelled,

    /// No table produced a key.
    #[error("no activation key found after trying {tables_tried} lookup table(s)")]
    NotFound { tables_tried: usize },

    /// The cracking tool could not be started.
    #[error(transparent)]
    Launch(#[from] ToolError),
}
