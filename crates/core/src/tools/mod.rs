//! External tool gateway.
//!
//! Every pipeline stage delegates to one external executable. This module
//! provides the thin layer the stages use to drive them:
//!
//! - [`ToolRunner`] / [`ToolProcess`]: launch a command with its input closed
//!   and its error stream merged into its output, read that output line by
//!   line, terminate on demand and reap the exit status
//! - [`SystemToolRunner`]: the tokio-backed implementation
//! - [`ToolSession`]: binds one process to a job's cancellation token
//! - [`ToolPaths`] / [`check_tools`]: where the tools live and whether they
//!   are installed
//!
//! # Example
//!
//! ```ignore
//! use aax2m4b_core::tools::{SystemToolRunner, ToolCommand, ToolSession, SessionEnd};
//! use tokio_util::sync::CancellationToken;
//!
//! let runner = SystemToolRunner::new();
//! let cancel = CancellationToken::new();
//! let command = ToolCommand::new("ffprobe").arg("book.aax");
//!
//! let mut session = ToolSession::start(&runner, command, &cancel).await?;
//! while let Some(line) = session.next_line().await {
//!     println!("{}", line);
//! }
//! match session.finish().await? {
//!     SessionEnd::Exited(exit) => println!("ffprobe: {}", exit),
//!     SessionEnd::Cancelled => println!("cancelled"),
//! }
//! ```

mod check;
mod config;
mod error;
mod process;
mod session;
mod traits;
mod types;

pub use check::{check_tool, check_tools, ToolInfo};
pub use config::{ToolPaths, ToolsConfig, ATOMIC_PARSLEY, FFMPEG, FFPROBE, MP4ART, RCRACK};
pub use error::ToolError;
pub use process::SystemToolRunner;
pub use session::{SessionEnd, ToolSession};
pub use traits::{ToolProcess, ToolRunner};
pub use types::{ToolCommand, ToolExit};
