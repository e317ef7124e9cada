//! Asynchronous notification dispatch.
//!
//! The pipeline hands rendered messages to [`NotificationDispatcher::dispatch`],
//! which never waits: messages go into a bounded queue drained by a single
//! worker task. When the queue is full the message is dropped with a warning.
//! Each delivery attempt is bounded by `send_timeout` and failures are
//! logged, not retried.

use crate::error::{NotifyError, NotifyResult};
use crate::notifier::DynNotifier;
use coinwatch_telemetry::Metrics;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Messages waiting for the worker before new ones are dropped.
    pub queue_capacity: usize,
    /// Upper bound for a single notifier call.
    pub send_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            send_timeout: Duration::from_secs(10),
        }
    }
}

pub struct NotificationDispatcher {
    tx: mpsc::Sender<String>,
    worker: JoinHandle<()>,
    notifier_name: &'static str,
}

impl NotificationDispatcher {
    /// Spawn the worker task. Must be called inside a tokio runtime.
    pub fn spawn(notifier: DynNotifier, config: DispatcherConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let notifier_name = notifier.name();
        let worker = tokio::spawn(run_worker(notifier, rx, config.send_timeout));

        info!(
            notifier = notifier_name,
            queue_capacity = config.queue_capacity,
            "Notification dispatcher started"
        );

        Self {
            tx,
            worker,
            notifier_name,
        }
    }

    pub fn notifier_name(&self) -> &'static str {
        self.notifier_name
    }

    /// Queue a message without waiting.
    pub fn dispatch(&self, message: String) -> NotifyResult<()> {
        match self.tx.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(message)) => {
                Metrics::notification_dropped();
                warn!(%message, "Notification queue full, dropping message");
                Err(NotifyError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => Err(NotifyError::Closed),
        }
    }

    /// Stop accepting messages and give queued ones `grace` to finish.
    ///
    /// Returns true when the queue drained in time; otherwise the worker is
    /// aborted and remaining messages are abandoned.
    pub async fn shutdown(self, grace: Duration) -> bool {
        let Self {
            tx, mut worker, ..
        } = self;
        let pending = tx.max_capacity() - tx.capacity();
        drop(tx);

        match tokio::time::timeout(grace, &mut worker).await {
            Ok(_) => {
                info!("Notification dispatcher drained");
                true
            }
            Err(_) => {
                warn!(
                    pending,
                    grace_ms = grace.as_millis() as u64,
                    "Notification grace period elapsed, abandoning in-flight messages"
                );
                worker.abort();
                false
            }
        }
    }
}

async fn run_worker(notifier: DynNotifier, mut rx: mpsc::Receiver<String>, send_timeout: Duration) {
    while let Some(message) = rx.recv().await {
        let started = Instant::now();
        match tokio::time::timeout(send_timeout, notifier.notify(&message)).await {
            Ok(Ok(())) => {
                let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                Metrics::notification_sent(notifier.name(), latency_ms);
                debug!(notifier = notifier.name(), latency_ms, "Notification delivered");
            }
            Ok(Err(e)) => {
                Metrics::notification_failed();
                warn!(notifier = notifier.name(), error = %e, "Notification failed");
            }
            Err(_) => {
                Metrics::notification_failed();
                warn!(
                    notifier = notifier.name(),
                    timeout_ms = send_timeout.as_millis() as u64,
                    "Notification timed out"
                );
            }
        }
    }
    debug!("Notification worker stopped");
}
