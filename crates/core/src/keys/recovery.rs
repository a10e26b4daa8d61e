//! Activation key recovery by rainbow-table lookup.

use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::parser::parse_key_token;
use crate::tools::{SessionEnd, ToolCommand, ToolRunner, ToolSession};

use super::error::KeyRecoveryError;
use super::tables::LookupTable;
use super::traits::ProgressSink;

/// Tries each lookup table in turn until one yields the activation key.
#[derive(Debug, Clone)]
pub struct KeyRecovery {
    rcrack: PathBuf,
    tables: Arc<[LookupTable]>,
}

impl KeyRecovery {
    pub fn new(rcrack: impl Into<PathBuf>, tables: Arc<[LookupTable]>) -> Self {
        Self {
            rcrack: rcrack.into(),
            tables,
        }
    }

    pub fn tables(&self) -> &[LookupTable] {
        &self.tables
    }

    /// `rcrack <table> -h <checksum>`
    pub fn command(&self, table: &LookupTable, checksum: &str) -> ToolCommand {
        ToolCommand::new(&self.rcrack)
            .path_arg(table.path())
            .args(["-h", checksum])
    }

    /// Runs the cracking tool against each table, in order.
    ///
    /// Stops at the first table that reports a key; later tables are never
    /// started. `sink` receives `tried * 100 / total` after each table that
    /// did not produce the key, and 100 on success.
    pub async fn recover<R>(
        &self,
        runner: &R,
        checksum: &str,
        cancel: &CancellationToken,
        sink: &mut dyn ProgressSink,
    ) -> Result<String, KeyRecoveryError>
    where
        R: ToolRunner + ?Sized,
    {
        let total = self.tables.len();
        if total == 0 {
            warn!("No lookup tables available");
            return Err(KeyRecoveryError::NotFound { tables_tried: 0 });
        }

        for (index, table) in self.tables.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(KeyRecoveryError::Cancelled);
            }

            debug!(table = %table.name(), tried = index, total, "Trying lookup table");
            metrics::LOOKUP_TABLES_TRIED.inc();

            let mut session =
                ToolSession::start(runner, self.command(table, checksum), cancel).await?;

            let mut key = None;
            while let Some(line) = session.next_line().await {
                if let Some(found) = parse_key_token(&line) {
                    key = Some(found);
                    break;
                }
            }

            // rcrack may keep going after the result line; the rest is not needed
            let end = match key {
                Some(_) => session.stop().await?,
                None => session.finish().await?,
            };

            match end {
                SessionEnd::Cancelled => return Err(KeyRecoveryError::Cancelled),
                SessionEnd::Exited(exit) => {
                    if let Some(key) = key {
                        info!(table = %table.name(), "Activation key found");
                        sink.progress(100).await;
                        return Ok(key);
                    }
                    if !exit.success() {
                        warn!(table = %table.name(), %exit, "Lookup table run failed, skipping");
                    }
                }
            }

            let tried = index + 1;
            sink.progress((tried * 100 / total) as u8).await;
        }

        Err(KeyRecoveryError::NotFound {
            tables_tried: total,
        })
    }
}
