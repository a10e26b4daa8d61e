//! Conversion pipeline.
//!
//! Turns one AAX file into a tagged M4B through a fixed sequence of stages:
//!
//! 1. checksum fetch (`ffprobe`)
//! 2. key recovery (`rcrack`, one run per lookup table)
//! 3. metadata fetch (`ffprobe`, JSON output)
//! 4. transcode (`ffmpeg`, decrypts into the intermediate `.m4a`)
//! 5. tag write (`AtomicParsley`, writes the final `.m4b`)
//! 6. cover extract (`ffmpeg`)
//! 7. cover embed (`mp4art`)
//! 8. cleanup
//!
//! Progress and stage changes are reported as [`Notification`]s on a
//! channel supplied by the caller.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use aax2m4b_core::pipeline::{ConversionPipeline, JobRequest, PipelineConfig};
//! use aax2m4b_core::tools::{SystemToolRunner, ToolsConfig};
//!
//! let pipeline = ConversionPipeline::new(
//!     Arc::new(SystemToolRunner::new()),
//!     ToolsConfig::default().resolve_paths(),
//!     tables.into(),
//!     PipelineConfig::default(),
//! );
//!
//! let job = pipeline.create_job(&JobRequest::new("book.aax"))?;
//! let (tx, mut rx) = tokio::sync::mpsc::channel(64);
//! tokio::spawn(async move {
//!     while let Some(notification) = rx.recv().await {
//!         println!("{:?}", notification);
//!     }
//! });
//! let outcome = pipeline.run(&job, tx).await;
//! ```

mod config;
mod error;
mod metadata;
mod notifier;
mod runner;
mod types;

pub use config::PipelineConfig;
pub use error::{JobError, PipelineError};
pub use metadata::MetadataBundle;
pub use runner::ConversionPipeline;
pub use types::{
    FailureReason, Job, JobId, JobPaths, JobRequest, Notification, Outcome, Stage,
};
