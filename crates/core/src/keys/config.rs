//! Configuration for lookup-table discovery.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::tools::ToolsConfig;

/// Where the rainbow tables live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesConfig {
    /// Directory scanned for tables. Defaults to the tools resource
    /// directory, then the working directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// File extension of table files, matched case-insensitively.
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_extension() -> String {
    "rt".to_string()
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            dir: None,
            extension: default_extension(),
        }
    }
}

impl TablesConfig {
    /// Directory to scan for tables.
    pub fn resolve_dir(&self, tools: &ToolsConfig) -> PathBuf {
        self.dir
            .clone()
            .or_else(|| tools.resource_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Extension without a leading dot.
    pub fn normalized_extension(&self) -> &str {
        self.extension.trim().trim_start_matches('.')
    }
}
