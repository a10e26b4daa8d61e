//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use aax2m4b_core::keys::LookupTable;
use aax2m4b_core::pipeline::{ConversionPipeline, Notification, PipelineConfig, Stage};
use aax2m4b_core::testing::{fixtures, MockToolRunner, ToolScript};
use aax2m4b_core::tools::{ToolPaths, ToolsConfig};
use tokio::sync::mpsc;

pub const KEY: &str = "cafed00d";

pub const PROBE_JSON: &str = r#"{
    "format": {
        "filename": "book.aax",
        "tags": {
            "title": "The Book",
            "album": "The Book",
            "artist": "Some Author",
            "genre": "Audiobook",
            "date": "2019"
        }
    }
}"#;

pub fn tool_paths() -> ToolPaths {
    ToolsConfig::with_resource_dir("/res").resolve_paths()
}

pub fn tables(names: &[&str]) -> Arc<[LookupTable]> {
    names
        .iter()
        .map(|n| LookupTable::new(format!("/tables/{}", n)))
        .collect::<Vec<_>>()
        .into()
}

pub fn pipeline(runner: &MockToolRunner, config: PipelineConfig) -> ConversionPipeline<MockToolRunner> {
    ConversionPipeline::new(
        Arc::new(runner.clone()),
        tool_paths(),
        tables(&["A.rt", "B.rt", "C.rt"]),
        config,
    )
}

pub fn source(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}

pub const CHECKSUM: &str = "0a1b2c3d4e5f";

/// Scripts every tool so that a job runs to `Done`.
pub async fn script_happy_path(runner: &MockToolRunner) {
    runner
        .script(
            "ffprobe",
            ToolScript::lines([
                "Input #0, aax, from 'book.aax':".to_string(),
                fixtures::checksum_line("0A1B2C3D4E5F"),
                fixtures::duration_line(120),
            ]),
        )
        .await;
    runner
        .script_when_arg(
            "ffprobe",
            "-show_format",
            ToolScript::lines(PROBE_JSON.lines()),
        )
        .await;
    runner
        .script("rcrack", ToolScript::lines([fixtures::rcrack_hit(CHECKSUM, KEY)]))
        .await;
    runner
        .script_when_arg(
            "ffmpeg",
            "-activation_bytes",
            ToolScript::lines([
                fixtures::duration_line(120),
                fixtures::elapsed_line(30),
                fixtures::elapsed_line(60),
                fixtures::elapsed_line(120),
            ]),
        )
        .await;
    runner.script("ffmpeg", ToolScript::silent()).await;
    runner
        .script(
            "AtomicParsley",
            ToolScript::lines([
                "Started writing to temp file.".to_string(),
                fixtures::tagging_progress(45),
                fixtures::tagging_progress(100),
                "Finished writing to temp file.".to_string(),
            ]),
        )
        .await;
    runner
        .script("mp4art", ToolScript::lines(["adding cover.jpg"]))
        .await;
}

/// Everything currently buffered in `rx`.
pub fn drain(rx: &mut mpsc::Receiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}

pub fn drain_unbounded(rx: &mut mpsc::UnboundedReceiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}

pub fn stages(notifications: &[Notification]) -> Vec<Stage> {
    notifications
        .iter()
        .filter_map(|n| match n {
            Notification::StageChanged { stage } => Some(*stage),
            _ => None,
        })
        .collect()
}

pub fn terminal_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| n.is_terminal()).count()
}

/// Progress values grouped by stage, in order.
pub fn progress_by_stage(notifications: &[Notification]) -> Vec<(Stage, Vec<u8>)> {
    let mut groups: Vec<(Stage, Vec<u8>)> = Vec::new();
    for n in notifications {
        match n {
            Notification::StageChanged { stage } => groups.push((*stage, Vec::new())),
            Notification::ProgressUpdate { percent } => {
                if let Some((_, values)) = groups.last_mut() {
                    values.push(*percent);
                }
            }
            _ => {}
        }
    }
    groups
}
