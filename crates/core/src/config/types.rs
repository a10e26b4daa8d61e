use serde::{Deserialize, Serialize};

use crate::keys::TablesConfig;
use crate::pipeline::PipelineConfig;
use crate::tools::ToolsConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub tables: TablesConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}
