//! Caller-side handle of one supervised job.

use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::error::SupervisorError;
use crate::pipeline::{JobId, Notification, Outcome};

/// Returned by [`super::JobSupervisor::enqueue`].
///
/// Notifications are buffered from the moment the job is enqueued, so a
/// consumer registered later misses nothing. Dropping the handle neither
/// cancels nor detaches the job.
pub struct JobHandle {
    id: JobId,
    source_path: PathBuf,
    cancel: CancellationToken,
    notifications: Option<mpsc::UnboundedReceiver<Notification>>,
    outcome: oneshot::Receiver<Outcome>,
    consumer: Option<JoinHandle<()>>,
}

impl JobHandle {
    pub(crate) fn new(
        id: JobId,
        source_path: PathBuf,
        cancel: CancellationToken,
        notifications: mpsc::UnboundedReceiver<Notification>,
        outcome: oneshot::Receiver<Outcome>,
    ) -> Self {
        Self {
            id,
            source_path,
            cancel,
            notifications: Some(notifications),
            outcome,
            consumer: None,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Requests cancellation. Returns immediately.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Takes the job's notification stream. `None` if already taken.
    pub fn take_notifications(&mut self) -> Option<mpsc::UnboundedReceiver<Notification>> {
        self.notifications.take()
    }

    /// Delivers every notification to `callback`, in order, on a background
    /// task.
    pub fn on_notification<F>(&mut self, mut callback: F) -> Result<(), SupervisorError>
    where
        F: FnMut(Notification) + Send + 'static,
    {
        let mut rx = self
            .notifications
            .take()
            .ok_or(SupervisorError::ConsumerAlreadyRegistered(self.id))?;

        self.consumer = Some(tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                callback(notification);
            }
        }));
        Ok(())
    }

    /// Waits for the terminal outcome.
    ///
    /// When a callback is registered, also waits until it has seen every
    /// notification.
    pub async fn wait(self) -> Result<Outcome, SupervisorError> {
        let outcome = self
            .outcome
            .await
            .map_err(|_| SupervisorError::Aborted(self.id))?;

        if let Some(consumer) = self.consumer {
            if let Err(e) = consumer.await {
                warn!(job = %self.id, error = %e, "Notification callback panicked");
            }
        }
        Ok(outcome)
    }
}
