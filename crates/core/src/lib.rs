pub mod config;
pub mod keys;
pub mod metrics;
pub mod parser;
pub mod pipeline;
pub mod supervisor;
pub mod testing;
pub mod tools;

pub use config::{
    load_config, load_config_from_str, load_default_config, validate_config, Config, ConfigError,
};
pub use keys::{discover_tables, KeyRecovery, KeyRecoveryError, LookupTable, TableError};
pub use pipeline::{
    ConversionPipeline, FailureReason, JobId, JobRequest, Notification, Outcome, PipelineError,
    Stage,
};
pub use supervisor::{JobHandle, JobState, JobStatus, JobSupervisor, SupervisorError};
pub use tools::{SystemToolRunner, ToolError, ToolPaths, ToolRunner};
