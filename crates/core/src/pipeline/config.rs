//! Configuration for the conversion pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the conversion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory for the intermediate, final and cover files. Next to the
    /// source file when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Value written to the encoding-tool tag.
    #[serde(default = "default_encoding_tool")]
    pub encoding_tool: String,

    /// Delete the extracted cover image once it is embedded.
    #[serde(default)]
    pub remove_cover_image: bool,

    /// Capacity of each job's notification channel.
    #[serde(default = "default_notification_buffer")]
    pub notification_buffer: usize,

    /// Maximum number of jobs running at once. Unlimited when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_jobs: Option<usize>,
}

fn default_encoding_tool() -> String {
    "Aax2m4b".to_string()
}

fn default_notification_buffer() -> usize {
    64
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            encoding_tool: default_encoding_tool(),
            remove_cover_image: false,
            notification_buffer: default_notification_buffer(),
            max_concurrent_jobs: None,
        }
    }
}
