use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG: &str = "aax2m4b.toml";

#[derive(Parser)]
#[command(name = "aax2m4b")]
#[command(author, version, about = "Convert AAX audiobooks into chaptered M4B files")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "AAX2M4B_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print Prometheus metrics after converting
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert one or more AAX files
    Convert {
        /// Files to convert
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print notifications as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    Tools {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the lookup tables used for key recovery
    Tables,
}
