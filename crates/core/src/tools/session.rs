//! Cancellable line streaming over one tool process.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::ToolError;
use super::traits::{ToolProcess, ToolRunner};
use super::types::{ToolCommand, ToolExit};

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Cancellation was observed; the process was terminated and reaped.
    Cancelled,
    /// The process exited on its own.
    Exited(ToolExit),
}

/// One running tool bound to a job's cancellation token.
///
/// Reads stop as soon as the token fires, and [`ToolSession::finish`]
/// always terminates (if cancelled) and then waits, so no process outlives
/// its session.
pub struct ToolSession {
    command: ToolCommand,
    process: Box<dyn ToolProcess>,
    cancel: CancellationToken,
}

impl ToolSession {
    /// Launches `command` through `runner`.
    pub async fn start<R>(
        runner: &R,
        command: ToolCommand,
        cancel: &CancellationToken,
    ) -> Result<Self, ToolError>
    where
        R: ToolRunner + ?Sized,
    {
        let process = runner.launch(&command).await?;
        Ok(Self {
            command,
            process,
            cancel: cancel.clone(),
        })
    }

    /// The command this session runs.
    pub fn command(&self) -> &ToolCommand {
        &self.command
    }

    /// Next output line, or `None` at end of stream or once cancelled.
    pub async fn next_line(&mut self) -> Option<String> {
        if self.cancel.is_cancelled() {
            return None;
        }

        let line = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            line = self.process.next_line() => line,
        };

        if let Some(ref line) = line {
            debug!(tool = %self.command.tool_name(), "{}", line);
        }
        line
    }

    /// Terminates the process if cancelled, then reaps it.
    ///
    /// Cancellation wins over the exit code: a process killed because of a
    /// cancel request exits non-zero, and that is not a tool failure.
    pub async fn finish(self) -> Result<SessionEnd, ToolError> {
        let terminate = self.cancel.is_cancelled();
        self.end(terminate).await
    }

    /// Terminates the process whether or not it is done, then reaps it.
    ///
    /// For tools that keep running after printing what the caller needed.
    pub async fn stop(self) -> Result<SessionEnd, ToolError> {
        self.end(true).await
    }

    async fn end(mut self, terminate: bool) -> Result<SessionEnd, ToolError> {
        if terminate {
            if let Err(e) = self.process.terminate().await {
                warn!(command = %self.command, error = %e, "Failed to terminate tool");
            }
        }

        let exit = self.process.wait().await?;
        debug!(command = %self.command, %exit, "Tool finished");

        if self.cancel.is_cancelled() {
            return Ok(SessionEnd::Cancelled);
        }
        Ok(SessionEnd::Exited(exit))
    }

    /// Reads all remaining output, then finishes.
    pub async fn collect(mut self) -> Result<(Vec<String>, SessionEnd), ToolError> {
        let mut lines = Vec::new();
        while let Some(line) = self.next_line().await {
            lines.push(line);
        }
        let end = self.finish().await?;
        Ok((lines, end))
    }
}
