//! Trait definitions for key recovery.

use async_trait::async_trait;

/// Receives the percentage of lookup tables tried so far.
#[async_trait]
pub trait ProgressSink: Send {
    async fn progress(&mut self, percent: u8);
}
