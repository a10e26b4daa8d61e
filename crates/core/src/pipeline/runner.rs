//! The conversion stage machine.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::keys::{KeyRecovery, KeyRecoveryError, LookupTable};
use crate::metrics;
use crate::parser;
use crate::tools::{SessionEnd, ToolCommand, ToolExit, ToolPaths, ToolRunner, ToolSession};

use super::config::PipelineConfig;
use super::error::{JobError, PipelineError};
use super::metadata::MetadataBundle;
use super::notifier::Notifier;
use super::types::{FailureReason, Job, JobRequest, Notification, Outcome, Stage};

const STIK_AUDIOBOOK: &str = "Audiobook";
const COVER_ADDING_PERCENT: u8 = 50;

/// One finished tool invocation.
struct ToolRun {
    command: ToolCommand,
    exit: ToolExit,
    last_line: Option<String>,
}

impl ToolRun {
    fn detail(&self) -> String {
        match &self.last_line {
            Some(line) => format!("{}: {}", self.exit, line),
            None => self.exit.to_string(),
        }
    }
}

/// Drives one job through every stage, from checksum to cleanup.
///
/// Stages run strictly in order, each delegating to one external tool (key
/// recovery may run several, one at a time). Cancellation is checked before
/// every stage and on every output line.
pub struct ConversionPipeline<R: ToolRunner> {
    runner: Arc<R>,
    tools: ToolPaths,
    keys: KeyRecovery,
    config: PipelineConfig,
}

impl<R: ToolRunner> ConversionPipeline<R> {
    pub fn new(
        runner: Arc<R>,
        tools: ToolPaths,
        tables: Arc<[LookupTable]>,
        config: PipelineConfig,
    ) -> Self {
        let keys = KeyRecovery::new(tools.rcrack.clone(), tables);
        Self {
            runner,
            tools,
            keys,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn tables(&self) -> &[LookupTable] {
        self.keys.tables()
    }

    /// Creates a job with working paths laid out per the configuration.
    pub fn create_job(&self, request: &JobRequest) -> Result<Job, JobError> {
        Job::new(request, self.config.output_dir.as_deref())
    }

    /// Runs `job` to completion, sending its notifications on `tx`.
    ///
    /// Always ends with exactly one terminal notification matching the
    /// returned outcome.
    pub async fn run(&self, job: &Job, tx: mpsc::Sender<Notification>) -> Outcome {
        let mut notifier = Notifier::new(tx);
        info!(job = %job.id, source = %job.paths.source.display(), "Conversion started");

        let outcome = match self.run_stages(job, &mut notifier).await {
            Ok(()) => {
                info!(job = %job.id, output = %job.paths.output.display(), "Conversion finished");
                Outcome::Done
            }
            Err(PipelineError::Cancelled) => {
                info!(job = %job.id, "Conversion cancelled");
                Outcome::Cancelled
            }
            Err(PipelineError::Stage {
                reason,
                command,
                detail,
                ..
            }) => {
                warn!(job = %job.id, %reason, %command, %detail, "Conversion failed");
                metrics::STAGE_FAILURES
                    .with_label_values(&[reason.as_str()])
                    .inc();
                Outcome::Failed { reason, detail }
            }
        };

        // Partial output is never kept. The intermediate is only ours once Transcode started
        if !outcome.is_done() && notifier.reached(Stage::Transcode) {
            remove_best_effort(job, &job.paths.intermediate).await;
        }

        notifier.finish(&outcome).await;
        outcome
    }

    async fn run_stages(&self, job: &Job, n: &mut Notifier) -> Result<(), PipelineError> {
        let started = self.begin(job, n, Stage::ChecksumFetch).await?;
        let checksum = self.fetch_checksum(job, n).await?;
        self.end(job, n, Stage::ChecksumFetch, started).await;

        let started = self.begin(job, n, Stage::KeyRecovery).await?;
        let key = self.recover_key(job, n, &checksum).await?;
        self.end(job, n, Stage::KeyRecovery, started).await;

        let started = self.begin(job, n, Stage::MetadataFetch).await?;
        let metadata = self.fetch_metadata(job, n).await?;
        self.end(job, n, Stage::MetadataFetch, started).await;

        let started = self.begin(job, n, Stage::Transcode).await?;
        self.transcode(job, n, &key).await?;
        self.end(job, n, Stage::Transcode, started).await;

        let started = self.begin(job, n, Stage::TagWrite).await?;
        self.write_tags(job, n, &metadata).await?;
        self.end(job, n, Stage::TagWrite, started).await;

        let started = self.begin(job, n, Stage::CoverExtract).await?;
        self.extract_cover(job, n).await?;
        self.end(job, n, Stage::CoverExtract, started).await;

        let started = self.begin(job, n, Stage::CoverEmbed).await?;
        self.embed_cover(job, n).await?;
        self.end(job, n, Stage::CoverEmbed, started).await;

        let started = self.begin(job, n, Stage::Cleanup).await?;
        self.cleanup(job).await;
        self.end(job, n, Stage::Cleanup, started).await;

        check_cancelled(job)
    }

    async fn begin(
        &self,
        job: &Job,
        n: &mut Notifier,
        stage: Stage,
    ) -> Result<Instant, PipelineError> {
        check_cancelled(job)?;
        info!(job = %job.id, %stage, "Stage started");
        n.enter(stage).await;
        Ok(Instant::now())
    }

    async fn end(&self, job: &Job, n: &mut Notifier, stage: Stage, started: Instant) {
        n.complete_stage().await;
        let elapsed = started.elapsed();
        metrics::STAGE_DURATION
            .with_label_values(&[stage.as_str()])
            .observe(elapsed.as_secs_f64());
        debug!(job = %job.id, %stage, elapsed_ms = elapsed.as_millis() as u64, "Stage finished");
    }

    /// Runs one tool to completion, feeding every line to `on_line`.
    ///
    /// `on_line` returns the stage progress the line implies, if any.
    async fn run_tool<F>(
        &self,
        job: &Job,
        n: &mut Notifier,
        reason: FailureReason,
        command: ToolCommand,
        mut on_line: F,
    ) -> Result<ToolRun, PipelineError>
    where
        F: FnMut(&str) -> Option<u8>,
    {
        let mut session = ToolSession::start(self.runner.as_ref(), command.clone(), &job.cancel)
            .await
            .map_err(|e| PipelineError::stage(reason, &command, &job.paths.source, e.to_string()))?;

        let mut last_line = None;
        while let Some(line) = session.next_line().await {
            if let Some(percent) = on_line(&line) {
                n.update(percent).await;
            }
            last_line = Some(line);
        }

        match session.finish().await {
            Ok(SessionEnd::Cancelled) => Err(PipelineError::Cancelled),
            Ok(SessionEnd::Exited(exit)) => Ok(ToolRun {
                command,
                exit,
                last_line,
            }),
            Err(e) => Err(PipelineError::stage(
                reason,
                &command,
                &job.paths.source,
                e.to_string(),
            )),
        }
    }

    fn require_success(
        &self,
        job: &Job,
        reason: FailureReason,
        run: &ToolRun,
    ) -> Result<(), PipelineError> {
        if run.exit.success() {
            return Ok(());
        }
        Err(PipelineError::stage(
            reason,
            &run.command,
            &job.paths.source,
            run.detail(),
        ))
    }

    async fn fetch_checksum(&self, job: &Job, n: &mut Notifier) -> Result<String, PipelineError> {
        let reason = FailureReason::ChecksumUnavailable;
        let command = ToolCommand::new(&self.tools.ffprobe).path_arg(&job.paths.source);

        let mut checksum = None;
        let run = self
            .run_tool(job, n, reason, command, |line| {
                if checksum.is_none() {
                    checksum = parser::parse_checksum(line);
                }
                None
            })
            .await?;

        match checksum {
            Some(checksum) => {
                debug!(job = %job.id, %checksum, "Checksum found");
                Ok(checksum)
            }
            None => Err(PipelineError::stage(
                reason,
                &run.command,
                &job.paths.source,
                format!("no checksum in ffprobe output ({})", run.exit),
            )),
        }
    }

    async fn recover_key(
        &self,
        job: &Job,
        n: &mut Notifier,
        checksum: &str,
    ) -> Result<String, PipelineError> {
        match self
            .keys
            .recover(self.runner.as_ref(), checksum, &job.cancel, n)
            .await
        {
            Ok(key) => Ok(key),
            Err(KeyRecoveryError::Cancelled) => Err(PipelineError::Cancelled),
            Err(e) => {
                let command = ToolCommand::new(&self.tools.rcrack).args(["-h", checksum]);
                Err(PipelineError::stage(
                    FailureReason::KeyNotFound,
                    &command,
                    &job.paths.source,
                    e.to_string(),
                ))
            }
        }
    }

    async fn fetch_metadata(
        &self,
        job: &Job,
        n: &mut Notifier,
    ) -> Result<MetadataBundle, PipelineError> {
        let reason = FailureReason::MetadataUnavailable;
        let command = ToolCommand::new(&self.tools.ffprobe)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .path_arg(&job.paths.source);

        let mut output = Vec::new();
        let run = self
            .run_tool(job, n, reason, command, |line| {
                output.push(line.to_string());
                None
            })
            .await?;
        self.require_success(job, reason, &run)?;

        let metadata = MetadataBundle::from_ffprobe_json(&output.join("\n")).map_err(|e| {
            PipelineError::stage(
                reason,
                &run.command,
                &job.paths.source,
                format!("unparsable ffprobe output: {}", e),
            )
        })?;
        debug!(job = %job.id, tags = metadata.len(), "Metadata read");
        Ok(metadata)
    }

    async fn transcode(&self, job: &Job, n: &mut Notifier, key: &str) -> Result<(), PipelineError> {
        let reason = FailureReason::TranscodeFailed;
        let command = ToolCommand::new(&self.tools.ffmpeg)
            .args(["-activation_bytes", key, "-i"])
            .path_arg(&job.paths.source)
            .args([
                "-stats",
                "-y",
                "-vn",
                "-c:a",
                "copy",
                "-movflags",
                "use_metadata_tags",
                "-map_metadata",
                "0",
                "-map_metadata:s:a",
                "0:s:a",
            ])
            .path_arg(&job.paths.intermediate);

        // Set once, from the first duration line
        let mut total_seconds: Option<u64> = None;
        let run = self
            .run_tool(job, n, reason, command, |line| {
                if let Some(duration) = parser::parse_duration(line) {
                    if total_seconds.is_none() {
                        total_seconds = Some(duration.total_seconds());
                    }
                    return None;
                }
                let elapsed = parser::parse_elapsed(line)?;
                parser::percent_from_elapsed(elapsed.total_seconds(), total_seconds?)
            })
            .await?;
        self.require_success(job, reason, &run)
    }

    async fn write_tags(
        &self,
        job: &Job,
        n: &mut Notifier,
        metadata: &MetadataBundle,
    ) -> Result<(), PipelineError> {
        let reason = FailureReason::TagWriteFailed;
        let command = ToolCommand::new(&self.tools.atomic_parsley)
            .path_arg(&job.paths.intermediate)
            .args(metadata.tagging_args())
            .args([
                "--encodingTool",
                self.config.encoding_tool.as_str(),
                "--stik",
                STIK_AUDIOBOOK,
                "--output",
            ])
            .path_arg(&job.paths.output);

        let run = self
            .run_tool(job, n, reason, command, parser::parse_tagging_progress)
            .await?;
        self.require_success(job, reason, &run)
    }

    async fn extract_cover(&self, job: &Job, n: &mut Notifier) -> Result<(), PipelineError> {
        let reason = FailureReason::CoverExtractFailed;
        let command = ToolCommand::new(&self.tools.ffmpeg)
            .arg("-i")
            .path_arg(&job.paths.source)
            .args(["-y", "-v", "quiet", "-an", "-vcodec", "copy"])
            .path_arg(&job.paths.cover);

        let run = self.run_tool(job, n, reason, command, |_| None).await?;
        self.require_success(job, reason, &run)
    }

    async fn embed_cover(&self, job: &Job, n: &mut Notifier) -> Result<(), PipelineError> {
        let reason = FailureReason::CoverEmbedFailed;
        let command = ToolCommand::new(&self.tools.mp4art)
            .arg("--add")
            .path_arg(&job.paths.cover)
            .path_arg(&job.paths.output);

        let run = self
            .run_tool(job, n, reason, command, |line| {
                parser::is_cover_adding(line).then_some(COVER_ADDING_PERCENT)
            })
            .await?;
        self.require_success(job, reason, &run)
    }

    async fn cleanup(&self, job: &Job) {
        remove_best_effort(job, &job.paths.intermediate).await;
        if self.config.remove_cover_image {
            remove_best_effort(job, &job.paths.cover).await;
        }
    }
}

fn check_cancelled(job: &Job) -> Result<(), PipelineError> {
    if job.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    Ok(())
}

/// Deletes a working file, logging instead of failing.
async fn remove_best_effort(job: &Job, path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(job = %job.id, path = %path.display(), "Removed working file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(job = %job.id, path = %path.display(), "Working file already gone")
        }
        Err(e) => {
            warn!(job = %job.id, path = %path.display(), error = %e, "Failed to remove working file")
        }
    }
}
