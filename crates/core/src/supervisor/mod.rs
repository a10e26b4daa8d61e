//! Job supervisor.
//!
//! Accepts conversion requests, runs one pipeline task per job and keeps a
//! snapshot of every job until it is dismissed. Jobs run concurrently, with
//! an optional cap (`pipeline.max_concurrent_jobs`).
//!
//! # Example
//!
//! ```ignore
//! use aax2m4b_core::pipeline::JobRequest;
//! use aax2m4b_core::supervisor::JobSupervisor;
//!
//! let supervisor = JobSupervisor::new(pipeline);
//! let mut handle = supervisor.enqueue(JobRequest::new("book.aax")).await?;
//! let id = handle.id();
//!
//! handle.on_notification(|n| println!("{:?}", n))?;
//! let outcome = handle.wait().await?;
//! supervisor.dismiss(&id).await?;
//! ```

mod error;
mod handle;
mod runner;
mod types;

pub use error::SupervisorError;
pub use handle::JobHandle;
pub use runner::JobSupervisor;
pub use types::{JobState, JobStatus};
