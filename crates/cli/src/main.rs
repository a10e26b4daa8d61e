mod cli;
mod metrics;
mod output;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aax2m4b_core::tools::check_tools;
use aax2m4b_core::{
    discover_tables, load_config, load_default_config, validate_config, Config, ConversionPipeline,
    JobRequest, JobSupervisor, LookupTable, SystemToolRunner,
};

use cli::{Cli, Commands, DEFAULT_CONFIG};
use output::{summary_line, JobEvent};

#[tokio::main]
async fn main() {
    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether the command fully succeeded.
async fn run() -> Result<bool> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load(cli.config.as_deref())?;
    validate_config(&config).context("Configuration validation failed")?;

    match cli.command {
        Commands::Convert { files, json } => convert(&config, files, json, cli.metrics).await,
        Commands::Tools { json } => report_tools(&config, json),
        Commands::Tables => {
            let tables = tables(&config)?;
            for table in &tables {
                println!("{}", table.path().display());
            }
            Ok(true)
        }
    }
}

/// Loads the given config file, or the default one if it exists, or the
/// built-in defaults.
fn load(path: Option<&Path>) -> Result<Config> {
    let explicit = path.is_some();
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));

    if !explicit && !path.exists() {
        info!("No {} found, using built-in defaults", DEFAULT_CONFIG);
        return load_default_config().context("Failed to load default configuration");
    }

    info!("Loading configuration from {:?}", path);
    load_config(&path).with_context(|| format!("Failed to load config from {:?}", path))
}

fn tables(config: &Config) -> Result<Vec<LookupTable>> {
    let dir = config.tables.resolve_dir(&config.tools);
    let tables = discover_tables(&dir, config.tables.normalized_extension())
        .with_context(|| format!("Failed to list lookup tables in {:?}", dir))?;
    if tables.is_empty() {
        warn!(dir = %dir.display(), "No lookup tables found");
    }
    Ok(tables)
}

/// Prints tool availability. Returns false when any tool is missing.
fn report_tools(config: &Config, json: bool) -> Result<bool> {
    let infos = check_tools(&config.tools.resolve_paths());

    if json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
    } else {
        for info in &infos {
            match &info.resolved {
                Some(path) => println!("{:<14} {}", info.name, path.display()),
                None => println!("{:<14} missing ({})", info.name, info.configured.display()),
            }
        }
    }
    Ok(infos.iter().all(|info| info.available))
}

async fn convert(
    config: &Config,
    files: Vec<PathBuf>,
    json: bool,
    show_metrics: bool,
) -> Result<bool> {
    let paths = config.tools.resolve_paths();
    for info in check_tools(&paths).iter().filter(|i| !i.available) {
        warn!(tool = %info.name, path = %info.configured.display(), "Tool not found");
    }

    let tables: Arc<[LookupTable]> = tables(config)?.into();
    info!("Using {} lookup table(s)", tables.len());

    let pipeline = ConversionPipeline::new(
        Arc::new(SystemToolRunner::new()),
        paths,
        tables,
        config.pipeline.clone(),
    );
    let supervisor = Arc::new(JobSupervisor::new(pipeline));

    // Cancel everything on Ctrl+C; jobs still report their own terminal state
    let interrupt = {
        let supervisor = Arc::clone(&supervisor);
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling jobs");
                supervisor.cancel_all().await;
            }
        })
    };

    let mut all_done = true;
    let mut waiters = Vec::with_capacity(files.len());
    for file in files {
        if !file.is_file() {
            warn!(source = %file.display(), "Source file does not exist");
        }

        let mut handle = match supervisor.enqueue(JobRequest::new(file.clone())).await {
            Ok(handle) => handle,
            Err(e) => {
                all_done = false;
                error!(source = %file.display(), error = %e, "Job rejected");
                continue;
            }
        };
        metrics::JOBS_PENDING.inc();

        let id = handle.id();
        let source = file.clone();
        handle.on_notification(move |notification| {
            let event = JobEvent {
                job: id,
                source: &source,
                notification: &notification,
            };
            if json {
                match event.to_json() {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!(error = %e, "Failed to encode notification"),
                }
            } else {
                println!("{}", event.to_human());
            }
        })?;

        waiters.push(async move {
            let outcome = handle.wait().await;
            metrics::JOBS_PENDING.dec();
            (file, outcome)
        });
    }

    let results = futures::future::join_all(waiters).await;
    interrupt.abort();

    for (source, outcome) in results {
        match outcome {
            Ok(outcome) => {
                all_done &= outcome.is_done();
                if !json {
                    println!("{}", summary_line(&source, &outcome));
                }
            }
            Err(e) => {
                all_done = false;
                error!(source = %source.display(), error = %e, "Job did not report an outcome");
            }
        }
    }

    if show_metrics {
        print!("{}", metrics::encode_metrics());
    }

    Ok(all_done)
}
