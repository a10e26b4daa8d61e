//! Types for the pipeline module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::JobError;

/// Unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ChecksumFetch,
    KeyRecovery,
    MetadataFetch,
    Transcode,
    TagWrite,
    CoverExtract,
    CoverEmbed,
    Cleanup,
    Done,
}

impl Stage {
    /// Every stage, in order.
    pub const ALL: [Stage; 9] = [
        Stage::ChecksumFetch,
        Stage::KeyRecovery,
        Stage::MetadataFetch,
        Stage::Transcode,
        Stage::TagWrite,
        Stage::CoverExtract,
        Stage::CoverEmbed,
        Stage::Cleanup,
        Stage::Done,
    ];

    /// Position in the sequence, starting at 0.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The stage that follows, `None` after `Done`.
    pub fn next(self) -> Option<Stage> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::ChecksumFetch => "checksum_fetch",
            Stage::KeyRecovery => "key_recovery",
            Stage::MetadataFetch => "metadata_fetch",
            Stage::Transcode => "transcode",
            Stage::TagWrite => "tag_write",
            Stage::CoverExtract => "cover_extract",
            Stage::CoverEmbed => "cover_embed",
            Stage::Cleanup => "cleanup",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    ChecksumUnavailable,
    KeyNotFound,
    MetadataUnavailable,
    TranscodeFailed,
    TagWriteFailed,
    CoverExtractFailed,
    CoverEmbedFailed,
}

impl FailureReason {
    /// The stage that reports this failure.
    pub fn stage(self) -> Stage {
        match self {
            FailureReason::ChecksumUnavailable => Stage::ChecksumFetch,
            FailureReason::KeyNotFound => Stage::KeyRecovery,
            FailureReason::MetadataUnavailable => Stage::MetadataFetch,
            FailureReason::TranscodeFailed => Stage::Transcode,
            FailureReason::TagWriteFailed => Stage::TagWrite,
            FailureReason::CoverExtractFailed => Stage::CoverExtract,
            FailureReason::CoverEmbedFailed => Stage::CoverEmbed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::ChecksumUnavailable => "checksum_unavailable",
            FailureReason::KeyNotFound => "key_not_found",
            FailureReason::MetadataUnavailable => "metadata_unavailable",
            FailureReason::TranscodeFailed => "transcode_failed",
            FailureReason::TagWriteFailed => "tag_write_failed",
            FailureReason::CoverExtractFailed => "cover_extract_failed",
            FailureReason::CoverEmbedFailed => "cover_embed_failed",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FailureReason::ChecksumUnavailable => "checksum unavailable",
            FailureReason::KeyNotFound => "activation key not found",
            FailureReason::MetadataUnavailable => "metadata unavailable",
            FailureReason::TranscodeFailed => "transcode failed",
            FailureReason::TagWriteFailed => "tag write failed",
            FailureReason::CoverExtractFailed => "cover extraction failed",
            FailureReason::CoverEmbedFailed => "cover embedding failed",
        };
        f.write_str(text)
    }
}

/// Events emitted by a running job.
///
/// A job emits exactly one of `Done`, `Cancelled` or `Failed`, always last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    ProgressUpdate { percent: u8 },
    StageChanged { stage: Stage },
    Done,
    Cancelled,
    Failed { reason: FailureReason, detail: String },
}

impl Notification {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Notification::Done | Notification::Cancelled | Notification::Failed { .. }
        )
    }
}

/// Final result of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Done,
    Cancelled,
    Failed { reason: FailureReason, detail: String },
}

impl Outcome {
    /// The outcome a terminal notification reports.
    pub fn from_notification(notification: &Notification) -> Option<Self> {
        match notification {
            Notification::Done => Some(Outcome::Done),
            Notification::Cancelled => Some(Outcome::Cancelled),
            Notification::Failed { reason, detail } => Some(Outcome::Failed {
                reason: *reason,
                detail: detail.clone(),
            }),
            _ => None,
        }
    }

    /// The terminal notification for this outcome.
    pub fn notification(&self) -> Notification {
        match self {
            Outcome::Done => Notification::Done,
            Outcome::Cancelled => Notification::Cancelled,
            Outcome::Failed { reason, detail } => Notification::Failed {
                reason: *reason,
                detail: detail.clone(),
            },
        }
    }

    /// Label used in metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Done => "done",
            Outcome::Cancelled => "cancelled",
            Outcome::Failed { .. } => "failed",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done)
    }
}

/// A request to convert one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub source_path: PathBuf,
}

impl JobRequest {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
        }
    }
}

/// Files a job reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobPaths {
    /// The encrypted input.
    pub source: PathBuf,
    /// Decrypted audio, `<stem>.m4a`.
    pub intermediate: PathBuf,
    /// Tagged result, `<stem>.m4b`.
    pub output: PathBuf,
    /// Extracted artwork, `<stem>.jpg`.
    pub cover: PathBuf,
}

impl JobPaths {
    /// Derives the working paths from the source file name.
    ///
    /// Files go next to the source unless `output_dir` is given.
    pub fn derive(source: &Path, output_dir: Option<&Path>) -> Self {
        let stem = source
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_else(|| "output".into());
        let dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => source
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };
        let with_extension = |ext: &str| {
            let mut name = stem.clone();
            name.push(".");
            name.push(ext);
            dir.join(name)
        };

        Self {
            source: source.to_path_buf(),
            intermediate: with_extension("m4a"),
            output: with_extension("m4b"),
            cover: with_extension("jpg"),
        }
    }

    /// Files the job creates or overwrites.
    pub fn working_files(&self) -> [&Path; 3] {
        [
            self.intermediate.as_path(),
            self.output.as_path(),
            self.cover.as_path(),
        ]
    }

    /// Whether two jobs would touch the same file, one of them writing it.
    pub fn collides_with(&self, other: &JobPaths) -> bool {
        let writes_into = |a: &JobPaths, b: &JobPaths| {
            a.working_files()
                .iter()
                .any(|w| *w == b.source.as_path() || b.working_files().contains(w))
        };
        writes_into(self, other) || writes_into(other, self)
    }
}

/// One conversion task.
///
/// The cancellation token is the only part touched from outside the job's
/// own pipeline task. Once cancelled it stays cancelled.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub paths: JobPaths,
    pub cancel: CancellationToken,
}

impl Job {
    /// Fails when a working file would replace the source, e.g. for a
    /// `.m4a` input converted in place.
    pub fn new(request: &JobRequest, output_dir: Option<&Path>) -> Result<Self, JobError> {
        let paths = JobPaths::derive(&request.source_path, output_dir);
        if let Some(working) = paths.working_files().into_iter().find(|w| *w == paths.source) {
            return Err(JobError::SourceConflict {
                source_path: paths.source.clone(),
                working_path: working.to_path_buf(),
            });
        }

        Ok(Self {
            id: JobId::new(),
            paths,
            cancel: CancellationToken::new(),
        })
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_indices_are_consecutive() {
        for (i, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(stage.index(), i);
        }
        assert_eq!(Stage::ChecksumFetch.next(), Some(Stage::KeyRecovery));
        assert_eq!(Stage::Cleanup.next(), Some(Stage::Done));
        assert_eq!(Stage::Done.next(), None);
    }

    #[test]
    fn test_every_failure_belongs_to_a_tool_stage() {
        assert_eq!(FailureReason::KeyNotFound.stage(), Stage::KeyRecovery);
        assert_eq!(FailureReason::CoverEmbedFailed.stage(), Stage::CoverEmbed);
    }

    #[test]
    fn test_paths_next_to_source() {
        let paths = JobPaths::derive(Path::new("/books/My Book.aax"), None);
        assert_eq!(paths.intermediate, PathBuf::from("/books/My Book.m4a"));
        assert_eq!(paths.output, PathBuf::from("/books/My Book.m4b"));
        assert_eq!(paths.cover, PathBuf::from("/books/My Book.jpg"));
    }

    #[test]
    fn test_paths_in_output_dir() {
        let paths = JobPaths::derive(Path::new("/books/title.aax"), Some(Path::new("/out")));
        assert_eq!(paths.source, PathBuf::from("/books/title.aax"));
        assert_eq!(paths.intermediate, PathBuf::from("/out/title.m4a"));
        assert_eq!(paths.output, PathBuf::from("/out/title.m4b"));
    }

    #[test]
    fn test_notification_json() {
        let json = serde_json::to_value(Notification::StageChanged {
            stage: Stage::TagWrite,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "stage_changed", "stage": "tag_write"})
        );

        let failed = Notification::Failed {
            reason: FailureReason::KeyNotFound,
            detail: "no key".to_string(),
        };
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["reason"], "key_not_found");
        assert!(failed.is_terminal());
        assert!(!Notification::ProgressUpdate { percent: 5 }.is_terminal());
    }

    #[test]
    fn test_outcome_notification() {
        assert_eq!(Outcome::Done.notification(), Notification::Done);
        assert_eq!(Outcome::Cancelled.notification(), Notification::Cancelled);
        assert_eq!(Outcome::Cancelled.as_str(), "cancelled");
        assert_eq!(
            Outcome::from_notification(&Notification::Done),
            Some(Outcome::Done)
        );
        assert_eq!(
            Outcome::from_notification(&Notification::ProgressUpdate { percent: 3 }),
            None
        );
    }

    #[test]
    fn test_job_rejects_source_used_as_working_file() {
        let result = Job::new(&JobRequest::new("/music/song.m4a"), None);
        assert_eq!(
            result.unwrap_err(),
            JobError::SourceConflict {
                source_path: PathBuf::from("/music/song.m4a"),
                working_path: PathBuf::from("/music/song.m4a"),
            }
        );
        assert!(Job::new(&JobRequest::new("/music/book.m4b"), None).is_err());

        // Written elsewhere, the source is left alone
        assert!(Job::new(&JobRequest::new("/music/song.m4a"), Some(Path::new("/out"))).is_ok());
    }

    #[test]
    fn test_paths_collide_on_shared_output_dir() {
        let out = Some(Path::new("/out"));
        let a = JobPaths::derive(Path::new("/a/book.aax"), out);
        let b = JobPaths::derive(Path::new("/b/book.aax"), out);
        let c = JobPaths::derive(Path::new("/b/other.aax"), out);

        assert!(a.collides_with(&b));
        assert!(!a.collides_with(&c));
        assert!(!JobPaths::derive(Path::new("/a/book.aax"), None)
            .collides_with(&JobPaths::derive(Path::new("/b/book.aax"), None)));
    }

    #[test]
    fn test_paths_collide_when_one_writes_the_others_source() {
        let aax = JobPaths::derive(Path::new("/books/book.aax"), None);
        let m4a = JobPaths::derive(Path::new("/books/book.m4a"), Some(Path::new("/out")));
        assert!(aax.collides_with(&m4a));
        assert!(m4a.collides_with(&aax));
    }

    #[test]
    fn test_cancelled_job_stays_cancelled() {
        let job = Job::new(&JobRequest::new("/books/a.aax"), None).unwrap();
        assert!(!job.is_cancelled());
        job.cancel.cancel();
        assert!(job.clone().is_cancelled());
    }
}
