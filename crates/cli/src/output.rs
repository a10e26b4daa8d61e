//! Rendering of job notifications on stdout.

use serde::Serialize;
use std::path::Path;

use aax2m4b_core::{JobId, Notification, Outcome};

/// One notification tagged with the job it belongs to.
#[derive(Debug, Serialize)]
pub struct JobEvent<'a> {
    pub job: JobId,
    pub source: &'a Path,
    #[serde(flatten)]
    pub notification: &'a Notification,
}

impl JobEvent<'_> {
    /// A single JSON line.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// A short human-readable line, prefixed with the source file name.
    pub fn to_human(&self) -> String {
        let name = display_name(self.source);
        match self.notification {
            Notification::StageChanged { stage } => format!("[{}] {}", name, stage),
            Notification::ProgressUpdate { percent } => format!("[{}] {:>3}%", name, percent),
            Notification::Done => format!("[{}] done", name),
            Notification::Cancelled => format!("[{}] cancelled", name),
            Notification::Failed { reason, detail } => {
                format!("[{}] failed: {} ({})", name, reason, detail)
            }
        }
    }
}

/// Final line printed for a job once it has finished.
pub fn summary_line(source: &Path, outcome: &Outcome) -> String {
    match outcome {
        Outcome::Done => format!("{}: converted", source.display()),
        Outcome::Cancelled => format!("{}: cancelled", source.display()),
        Outcome::Failed { reason, detail } => {
            format!("{}: {} ({})", source.display(), reason, detail)
        }
    }
}

fn display_name(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.display().to_string())
}
