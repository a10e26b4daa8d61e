//! Mock tool runner for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::tools::{ToolCommand, ToolError, ToolExit, ToolProcess, ToolRunner};

/// Scripted behaviour of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolScript {
    lines: Vec<String>,
    exit: ToolExit,
    hold_open: bool,
    line_delay: Option<Duration>,
    launch_fails: bool,
}

impl Default for ToolScript {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            exit: ToolExit::code(0),
            hold_open: false,
            line_delay: None,
            launch_fails: false,
        }
    }
}

impl ToolScript {
    /// Prints `lines`, then exits with code 0.
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Prints nothing and exits with code 0.
    pub fn silent() -> Self {
        Self::default()
    }

    /// The executable cannot be found.
    pub fn launch_failure() -> Self {
        Self {
            launch_fails: true,
            ..Default::default()
        }
    }

    /// Exit code reported once output is exhausted.
    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit = ToolExit::code(code);
        self
    }

    /// Keep the process running after the last line until it is terminated.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Sleep before each line.
    pub fn line_delay(mut self, delay: Duration) -> Self {
        self.line_delay = Some(delay);
        self
    }
}

#[derive(Debug, Clone)]
struct ScriptRule {
    tool: String,
    arg_contains: Option<String>,
    script: ToolScript,
}

impl ScriptRule {
    fn matches(&self, command: &ToolCommand) -> bool {
        if self.tool != command.tool_name() {
            return false;
        }
        match &self.arg_contains {
            Some(needle) => command.args.iter().any(|a| a.contains(needle.as_str())),
            None => true,
        }
    }
}

#[derive(Debug, Default)]
struct ProcessCounters {
    terminated: usize,
    active: usize,
    peak_active: usize,
}

/// Mock implementation of the [`ToolRunner`] trait.
///
/// Scripts are selected by the executable's file name. A script registered
/// with [`MockToolRunner::script_when_arg`] wins over a plain one for the
/// same tool, and later scripts override earlier ones. Unscripted tools
/// print nothing and succeed.
///
/// # Example
///
/// ```rust,ignore
/// use aax2m4b_core::testing::{MockToolRunner, ToolScript};
///
/// let runner = MockToolRunner::new();
/// runner.script("ffprobe", ToolScript::lines(["checksum == 0a1b"])).await;
/// runner
///     .script_when_arg("ffprobe", "-show_format", ToolScript::lines([r#"{"format":{}}"#]))
///     .await;
///
/// // ... run a pipeline against `runner` ...
///
/// assert_eq!(runner.invocations_of("ffprobe").await.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockToolRunner {
    rules: Arc<RwLock<Vec<ScriptRule>>>,
    invocations: Arc<RwLock<Vec<ToolCommand>>>,
    counters: Arc<RwLock<ProcessCounters>>,
}

impl MockToolRunner {
    /// Create a new mock runner with no scripts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script every invocation of `tool`.
    pub async fn script(&self, tool: &str, script: ToolScript) {
        self.rules.write().await.push(ScriptRule {
            tool: tool.to_string(),
            arg_contains: None,
            script,
        });
    }

    /// Script invocations of `tool` that have an argument containing `needle`.
    pub async fn script_when_arg(&self, tool: &str, needle: &str, script: ToolScript) {
        self.rules.write().await.push(ScriptRule {
            tool: tool.to_string(),
            arg_contains: Some(needle.to_string()),
            script,
        });
    }

    /// Every command launched so far, in order.
    pub async fn invocations(&self) -> Vec<ToolCommand> {
        self.invocations.read().await.clone()
    }

    /// Commands launched for one tool, in order.
    pub async fn invocations_of(&self, tool: &str) -> Vec<ToolCommand> {
        self.invocations
            .read()
            .await
            .iter()
            .filter(|c| c.tool_name() == tool)
            .cloned()
            .collect()
    }

    /// How many processes were asked to terminate.
    pub async fn terminated_count(&self) -> usize {
        self.counters.read().await.terminated
    }

    /// Processes launched but not yet reaped.
    pub async fn active_count(&self) -> usize {
        self.counters.read().await.active
    }

    /// Highest number of simultaneously running processes.
    pub async fn peak_active(&self) -> usize {
        self.counters.read().await.peak_active
    }

    async fn find_script(&self, command: &ToolCommand) -> ToolScript {
        let rules = self.rules.read().await;
        rules
            .iter()
            .rev()
            .find(|r| r.arg_contains.is_some() && r.matches(command))
            .or_else(|| rules.iter().rev().find(|r| r.matches(command)))
            .map(|r| r.script.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ToolRunner for MockToolRunner {
    async fn launch(&self, command: &ToolCommand) -> Result<Box<dyn ToolProcess>, ToolError> {
        self.invocations.write().await.push(command.clone());

        let script = self.find_script(command).await;
        if script.launch_fails {
            return Err(ToolError::NotFound {
                path: command.program.clone(),
            });
        }

        {
            let mut counters = self.counters.write().await;
            counters.active += 1;
            counters.peak_active = counters.peak_active.max(counters.active);
        }

        Ok(Box::new(MockToolProcess {
            lines: script.lines.into_iter().collect(),
            exit: script.exit,
            hold_open: script.hold_open,
            line_delay: script.line_delay,
            terminated: false,
            reaped: false,
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct MockToolProcess {
    lines: VecDeque<String>,
    exit: ToolExit,
    hold_open: bool,
    line_delay: Option<Duration>,
    terminated: bool,
    reaped: bool,
    counters: Arc<RwLock<ProcessCounters>>,
}

#[async_trait]
impl ToolProcess for MockToolProcess {
    async fn next_line(&mut self) -> Option<String> {
        if self.terminated {
            return None;
        }
        if self.lines.is_empty() {
            if self.hold_open {
                std::future::pending::<()>().await;
            }
            return None;
        }
        if let Some(delay) = self.line_delay {
            tokio::time::sleep(delay).await;
        }
        self.lines.pop_front()
    }

    async fn terminate(&mut self) -> Result<(), ToolError> {
        // A process that printed everything and does not hold open has exited
        let running = self.hold_open || !self.lines.is_empty();
        if running && !self.terminated && !self.reaped {
            self.terminated = true;
            self.counters.write().await.terminated += 1;
        }
        Ok(())
    }

    async fn wait(&mut self) -> Result<ToolExit, ToolError> {
        if self.hold_open && !self.terminated && !self.reaped {
            std::future::pending::<()>().await;
        }
        if !self.reaped {
            self.reaped = true;
            let mut counters = self.counters.write().await;
            counters.active = counters.active.saturating_sub(1);
        }
        if self.terminated {
            return Ok(ToolExit::killed());
        }
        Ok(self.exit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn drain(process: &mut Box<dyn ToolProcess>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = process.next_line().await {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn test_scripted_output_and_exit() {
        let runner = MockToolRunner::new();
        runner
            .script("rcrack", ToolScript::lines(["a", "b"]).exit_code(2))
            .await;

        let mut process = runner
            .launch(&ToolCommand::new("/res/rcrack").arg("x.rt"))
            .await
            .unwrap();
        assert_eq!(drain(&mut process).await, vec!["a", "b"]);
        assert_eq!(process.wait().await.unwrap(), ToolExit::code(2));

        let invocations = runner.invocations_of("rcrack").await;
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].args, vec!["x.rt"]);
        assert_eq!(runner.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_arg_specific_script_wins() {
        let runner = MockToolRunner::new();
        runner.script("ffprobe", ToolScript::lines(["plain"])).await;
        runner
            .script_when_arg("ffprobe", "-show_format", ToolScript::lines(["json"]))
            .await;

        let mut plain = runner
            .launch(&ToolCommand::new("ffprobe").arg("book.aax"))
            .await
            .unwrap();
        let mut json = runner
            .launch(&ToolCommand::new("ffprobe").args(["-show_format", "book.aax"]))
            .await
            .unwrap();

        assert_eq!(drain(&mut plain).await, vec!["plain"]);
        assert_eq!(drain(&mut json).await, vec!["json"]);
        assert_eq!(runner.peak_active().await, 2);
    }

    #[tokio::test]
    async fn test_unscripted_tool_succeeds_silently() {
        let runner = MockToolRunner::new();
        let mut process = runner.launch(&ToolCommand::new("mp4art")).await.unwrap();
        assert!(drain(&mut process).await.is_empty());
        assert!(process.wait().await.unwrap().success());
    }

    #[tokio::test]
    async fn test_launch_failure() {
        let runner = MockToolRunner::new();
        runner.script("ffmpeg", ToolScript::launch_failure()).await;

        let result = runner.launch(&ToolCommand::new("ffmpeg")).await;
        assert!(matches!(result, Err(ToolError::NotFound { .. })));
        assert_eq!(runner.invocations().await.len(), 1);
        assert_eq!(runner.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_held_open_process_ends_on_terminate() {
        let runner = MockToolRunner::new();
        runner.script("ffmpeg", ToolScript::silent().hold_open()).await;

        let mut process = runner.launch(&ToolCommand::new("ffmpeg")).await.unwrap();
        let blocked = tokio::time::timeout(Duration::from_millis(20), process.next_line()).await;
        assert!(blocked.is_err());

        process.terminate().await.unwrap();
        assert_eq!(process.next_line().await, None);
        assert_eq!(process.wait().await.unwrap(), ToolExit::killed());
        assert_eq!(runner.terminated_count().await, 1);
    }

    #[tokio::test]
    async fn test_terminate_after_exit_is_a_no_op() {
        let runner = MockToolRunner::new();
        runner
            .script("rcrack", ToolScript::lines(["done"]).exit_code(0))
            .await;

        let mut process = runner.launch(&ToolCommand::new("rcrack")).await.unwrap();
        assert_eq!(drain(&mut process).await, vec!["done"]);

        process.terminate().await.unwrap();
        assert!(process.wait().await.unwrap().success());
        assert_eq!(runner.terminated_count().await, 0);
    }
}
