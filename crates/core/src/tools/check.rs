//! External tool availability checks.

use serde::Serialize;
use std::path::{Path, PathBuf};

use super::config::ToolPaths;

/// Information about an external tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Configured path (may be a bare name).
    pub configured: PathBuf,
    /// Whether the tool is available.
    pub available: bool,
    /// Where the executable was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<PathBuf>,
}

fn is_bare_name(path: &Path) -> bool {
    path.parent().map_or(true, |p| p.as_os_str().is_empty())
}

/// Check whether a tool can be found.
///
/// Bare names are looked up on `PATH`, anything else must be an existing file.
pub fn check_tool(name: &str, path: &Path) -> ToolInfo {
    let resolved = if is_bare_name(path) {
        which::which(path).ok()
    } else if path.is_file() {
        Some(path.to_path_buf())
    } else {
        None
    };

    ToolInfo {
        name: name.to_string(),
        configured: path.to_path_buf(),
        available: resolved.is_some(),
        resolved,
    }
}

/// Check every tool the pipeline needs.
pub fn check_tools(paths: &ToolPaths) -> Vec<ToolInfo> {
    paths
        .all()
        .into_iter()
        .map(|(name, path)| check_tool(name, path))
        .collect()
}
