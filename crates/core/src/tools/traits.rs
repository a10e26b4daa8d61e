//! Trait definitions for the tool gateway.

use async_trait::async_trait;

use super::error::ToolError;
use super::types::{ToolCommand, ToolExit};

/// Starts external tool processes.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Starts `command` with its input closed and its error stream merged
    /// into its output stream.
    ///
    /// Exactly one OS process is created per successful call. The caller
    /// must eventually call [`ToolProcess::wait`], even after
    /// [`ToolProcess::terminate`].
    async fn launch(&self, command: &ToolCommand) -> Result<Box<dyn ToolProcess>, ToolError>;
}

/// A running external tool.
#[async_trait]
pub trait ToolProcess: Send {
    /// Reads the next line of combined output.
    ///
    /// Returns `None` at end of stream. Undecodable lines are skipped,
    /// they never end the stream.
    async fn next_line(&mut self) -> Option<String>;

    /// Requests a forceful stop. Succeeds if the process already exited.
    async fn terminate(&mut self) -> Result<(), ToolError>;

    /// Blocks until the process has exited and reaps it.
    async fn wait(&mut self) -> Result<ToolExit, ToolError>;
}
