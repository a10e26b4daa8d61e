//! Per-job notification emitter.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::trace;

use super::types::{Notification, Outcome, Stage};
use crate::keys::ProgressSink;

/// Sends a job's notifications and enforces their ordering rules.
///
/// Progress never decreases within a stage and never exceeds 100, and at
/// most one terminal notification is sent.
pub(crate) struct Notifier {
    tx: mpsc::Sender<Notification>,
    stage: Option<Stage>,
    progress: u8,
    finished: bool,
}

impl Notifier {
    pub(crate) fn new(tx: mpsc::Sender<Notification>) -> Self {
        Self {
            tx,
            stage: None,
            progress: 0,
            finished: false,
        }
    }

    async fn send(&self, notification: Notification) {
        if self.tx.send(notification).await.is_err() {
            trace!("Notification receiver dropped");
        }
    }

    /// `StageChanged` followed by `ProgressUpdate(0)`.
    pub(crate) async fn enter(&mut self, stage: Stage) {
        self.stage = Some(stage);
        self.progress = 0;
        self.send(Notification::StageChanged { stage }).await;
        self.send(Notification::ProgressUpdate { percent: 0 }).await;
    }

    /// Whether `stage` has been entered.
    pub(crate) fn reached(&self, stage: Stage) -> bool {
        self.stage.is_some_and(|current| current >= stage)
    }

    /// Reports progress if it moved forward.
    pub(crate) async fn update(&mut self, percent: u8) {
        let percent = percent.min(100);
        if percent > self.progress {
            self.progress = percent;
            self.send(Notification::ProgressUpdate { percent }).await;
        }
    }

    /// Forces the current stage to 100.
    pub(crate) async fn complete_stage(&mut self) {
        self.update(100).await;
    }

    pub(crate) async fn finish(&mut self, outcome: &Outcome) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.send(outcome.notification()).await;
    }
}

#[async_trait]
impl ProgressSink for Notifier {
    async fn progress(&mut self, percent: u8) {
        self.update(percent).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::Receiver<Notification>) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(n) = rx.try_recv() {
            out.push(n);
        }
        out
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_clamped() {
        let (tx, mut rx) = mpsc::channel(32);
        let mut notifier = Notifier::new(tx);

        notifier.enter(Stage::Transcode).await;
        notifier.update(10).await;
        notifier.update(5).await;
        notifier.update(10).await;
        notifier.update(250).await;
        notifier.complete_stage().await;

        assert_eq!(
            drain(&mut rx),
            vec![
                Notification::StageChanged {
                    stage: Stage::Transcode
                },
                Notification::ProgressUpdate { percent: 0 },
                Notification::ProgressUpdate { percent: 10 },
                Notification::ProgressUpdate { percent: 100 },
            ]
        );
    }

    #[tokio::test]
    async fn test_stage_entry_resets_progress() {
        let (tx, mut rx) = mpsc::channel(32);
        let mut notifier = Notifier::new(tx);

        notifier.enter(Stage::TagWrite).await;
        notifier.complete_stage().await;
        notifier.enter(Stage::CoverExtract).await;
        notifier.update(40).await;

        let updates: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter_map(|n| match n {
                Notification::ProgressUpdate { percent } => Some(percent),
                _ => None,
            })
            .collect();
        assert_eq!(updates, vec![0, 100, 0, 40]);
    }

    #[tokio::test]
    async fn test_reached_tracks_latest_stage() {
        let (tx, _rx) = mpsc::channel(32);
        let mut notifier = Notifier::new(tx);
        assert!(!notifier.reached(Stage::ChecksumFetch));

        notifier.enter(Stage::MetadataFetch).await;
        assert!(notifier.reached(Stage::KeyRecovery));
        assert!(!notifier.reached(Stage::Transcode));

        notifier.enter(Stage::TagWrite).await;
        assert!(notifier.reached(Stage::Transcode));
    }

    #[tokio::test]
    async fn test_single_terminal_notification() {
        let (tx, mut rx) = mpsc::channel(32);
        let mut notifier = Notifier::new(tx);

        notifier.finish(&Outcome::Cancelled).await;
        notifier.finish(&Outcome::Done).await;

        assert_eq!(drain(&mut rx), vec![Notification::Cancelled]);
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_ignored() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut notifier = Notifier::new(tx);
        notifier.enter(Stage::ChecksumFetch).await;
        notifier.finish(&Outcome::Done).await;
    }
}
