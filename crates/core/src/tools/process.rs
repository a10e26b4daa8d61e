//! Tokio-backed tool runner.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::error::ToolError;
use super::traits::{ToolProcess, ToolRunner};
use super::types::{ToolCommand, ToolExit};

const READ_CHUNK: usize = 4096;

/// Runs tools as real OS processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemToolRunner;

impl SystemToolRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolRunner for SystemToolRunner {
    async fn launch(&self, command: &ToolCommand) -> Result<Box<dyn ToolProcess>, ToolError> {
        debug!(command = %command, "Launching tool");

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::launch(&command.program, command.to_string(), e))?;

        // Both pipes feed one channel, which is how stderr gets merged into stdout.
        let (tx, rx) = mpsc::unbounded_channel();
        let tool = command.tool_name();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(pump_lines(stdout, tx.clone(), tool.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(pump_lines(stderr, tx, tool));
        }

        Ok(Box::new(SystemToolProcess { child, lines: rx }))
    }
}

/// A child process plus the receiving end of its merged output.
struct SystemToolProcess {
    child: Child,
    lines: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl ToolProcess for SystemToolProcess {
    async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    async fn terminate(&mut self) -> Result<(), ToolError> {
        match self.child.start_kill() {
            Ok(()) => Ok(()),
            // Already reaped
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(ToolError::Io(e)),
        }
    }

    async fn wait(&mut self) -> Result<ToolExit, ToolError> {
        let status = self.child.wait().await?;
        Ok(ToolExit::from(status))
    }
}

/// Reads a pipe until EOF and forwards every decodable line.
async fn pump_lines<R>(mut reader: R, tx: mpsc::UnboundedSender<String>, tool: String)
where
    R: AsyncRead + Unpin,
{
    let mut splitter = LineSplitter::default();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                for raw in splitter.push(&chunk[..n]) {
                    if !forward(raw, &tx, &tool) {
                        return;
                    }
                }
            }
            Err(e) => {
                debug!(tool = %tool, error = %e, "Tool output stream failed");
                break;
            }
        }
    }

    if let Some(raw) = splitter.finish() {
        forward(raw, &tx, &tool);
    }
}

/// Returns `false` once nobody is listening anymore.
fn forward(raw: Vec<u8>, tx: &mpsc::UnboundedSender<String>, tool: &str) -> bool {
    match String::from_utf8(raw) {
        Ok(line) => tx.send(line).is_ok(),
        Err(_) => {
            trace!(tool = %tool, "Skipping undecodable output line");
            true
        }
    }
}

/// Splits a byte stream into lines on `\n` and `\r`.
///
/// ffmpeg redraws its stats line with bare carriage returns, so both count
/// as terminators. Empty lines are dropped.
#[derive(Debug, Default)]
pub(crate) struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    /// Feeds bytes, returning every line completed by them.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut lines = Vec::new();
        for &byte in bytes {
            if byte == b'\n' || byte == b'\r' {
                if !self.pending.is_empty() {
                    lines.push(std::mem::take(&mut self.pending));
                }
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    /// Returns the unterminated tail, if any.
    pub(crate) fn finish(&mut self) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_strings(lines: Vec<Vec<u8>>) -> Vec<String> {
        lines
            .into_iter()
            .map(|l| String::from_utf8(l).unwrap())
            .collect()
    }

    #[test]
    fn test_splitter_handles_both_terminators() {
        let mut splitter = LineSplitter::default();
        let lines = splitter.push(b"first\r\nsecond\rthird\npart");
        assert_eq!(as_strings(lines), vec!["first", "second", "third"]);
        assert_eq!(splitter.finish(), Some(b"part".to_vec()));
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn test_splitter_joins_across_chunks() {
        let mut splitter = LineSplitter::default();
        assert!(splitter.push(b"Dura").is_empty());
        let lines = splitter.push(b"tion: 01:00:00.00\n\n\n");
        assert_eq!(as_strings(lines), vec!["Duration: 01:00:00.00"]);
    }

    #[cfg(unix)]
    mod unix {
        use super::super::*;
        use std::time::Duration;

        fn sh(script: &str) -> ToolCommand {
            ToolCommand::new("sh").args(["-c", script])
        }

        async fn collect(process: &mut Box<dyn ToolProcess>) -> Vec<String> {
            let mut lines = Vec::new();
            while let Some(line) = process.next_line().await {
                lines.push(line);
            }
            lines
        }

        #[tokio::test]
        async fn test_merges_stdout_and_stderr() {
            let runner = SystemToolRunner::new();
            let mut process = runner
                .launch(&sh("echo to-stdout; echo to-stderr 1>&2"))
                .await
                .unwrap();

            let lines = collect(&mut process).await;
            assert_eq!(lines.len(), 2);
            assert!(lines.contains(&"to-stdout".to_string()));
            assert!(lines.contains(&"to-stderr".to_string()));
            assert!(process.wait().await.unwrap().success());
        }

        #[tokio::test]
        async fn test_carriage_returns_split_lines() {
            let runner = SystemToolRunner::new();
            let mut process = runner
                .launch(&sh("printf 'size=1 time=00:00:01.00\\rsize=2 time=00:00:02.00\\r\\n'"))
                .await
                .unwrap();

            let lines = collect(&mut process).await;
            assert_eq!(
                lines,
                vec!["size=1 time=00:00:01.00", "size=2 time=00:00:02.00"]
            );
            process.wait().await.unwrap();
        }

        #[tokio::test]
        async fn test_undecodable_lines_are_skipped() {
            let runner = SystemToolRunner::new();
            let mut process = runner
                .launch(&sh("printf 'before\\n\\377\\376\\nafter\\n'"))
                .await
                .unwrap();

            let lines = collect(&mut process).await;
            assert_eq!(lines, vec!["before", "after"]);
            assert!(process.wait().await.unwrap().success());
        }

        #[tokio::test]
        async fn test_exit_code_is_reported() {
            let runner = SystemToolRunner::new();
            let mut process = runner.launch(&sh("echo failing; exit 3")).await.unwrap();

            assert_eq!(collect(&mut process).await, vec!["failing"]);
            assert_eq!(process.wait().await.unwrap(), ToolExit::code(3));
        }

        #[tokio::test]
        async fn test_terminate_then_wait() {
            let runner = SystemToolRunner::new();
            let mut process = runner
                .launch(&ToolCommand::new("sleep").arg("30"))
                .await
                .unwrap();

            process.terminate().await.unwrap();
            let exit = tokio::time::timeout(Duration::from_secs(5), process.wait())
                .await
                .expect("terminated process should exit promptly")
                .unwrap();
            assert!(!exit.success());
        }

        #[tokio::test]
        async fn test_terminate_after_exit_is_harmless() {
            let runner = SystemToolRunner::new();
            let mut process = runner.launch(&sh("exit 0")).await.unwrap();

            assert!(process.wait().await.unwrap().success());
            assert!(process.terminate().await.is_ok());
        }

        #[tokio::test]
        async fn test_missing_executable() {
            let runner = SystemToolRunner::new();
            let result = runner
                .launch(&ToolCommand::new("/nonexistent/aax2m4b-tool"))
                .await;
            assert!(matches!(result, Err(ToolError::NotFound { .. })));
        }
    }
}
