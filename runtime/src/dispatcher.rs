//! Notification dispatcher: a bounded job queue drained by a worker pool.
//!
//! ```text
//! engine ──enqueue (try_send)──▶ [ bounded mpsc ] ──▶ dispatcher loop
//!                                                        │ semaphore (N workers)
//!                                                        ▼
//!                                        per-job task: channel 1, channel 2, ...
//!                                        (each wrapped in retry_with_predicate)
//! ```
//!
//! Enqueueing never waits: a full queue is reported to the caller, which
//! logs it and carries on. Delivery failures stay inside this module; they
//! are logged and counted, never propagated.

use crate::metrics::DispatcherMetrics;
use crate::retry::{RetryPolicy, retry_with_predicate};
use seatbook_core::notification::{
    DeliveryChannel, DeliveryError, EnqueueError, NotificationJob, NotificationQueue,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::task::JoinHandle;

/// Dispatcher tuning.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum number of jobs waiting in the queue
    pub queue_capacity: usize,
    /// Maximum number of jobs delivered concurrently
    pub workers: usize,
    /// Retry policy applied per channel delivery
    pub retry: RetryPolicy,
    /// How long [`NotificationDispatcher::shutdown`] waits for the queue to drain
    pub shutdown_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            workers: 4,
            retry: RetryPolicy::default(),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Errors from dispatcher lifecycle operations.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Accepted jobs were still in flight when the shutdown timeout expired.
    #[error("Dispatcher did not drain within {0:?}")]
    ShutdownTimeout(Duration),

    /// The dispatcher loop panicked.
    #[error("Dispatcher task failed: {0}")]
    Join(String),
}

/// Cloneable, non-blocking submission handle.
#[derive(Clone, Debug)]
pub struct NotificationHandle {
    sender: mpsc::Sender<NotificationJob>,
}

impl NotificationHandle {
    /// Jobs currently waiting in the queue.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }
}

impl NotificationQueue for NotificationHandle {
    fn enqueue(&self, job: NotificationJob) -> Result<(), EnqueueError> {
        let reservation_id = job.reservation_id;
        match self.sender.try_send(job) {
            Ok(()) => {
                DispatcherMetrics::record_enqueued(self.depth());
                tracing::debug!(reservation_id = %reservation_id, "Notification job enqueued");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                DispatcherMetrics::record_dropped("full");
                Err(EnqueueError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                DispatcherMetrics::record_dropped("closed");
                Err(EnqueueError::Closed)
            }
        }
    }
}

/// Running dispatcher.
///
/// Owns the dispatcher loop; hand out [`NotificationHandle`]s to producers.
pub struct NotificationDispatcher {
    handle: NotificationHandle,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    shutdown_timeout: Duration,
}

impl NotificationDispatcher {
    /// Spawn the dispatcher loop on the current Tokio runtime.
    ///
    /// Zero `queue_capacity` or `workers` are raised to one.
    #[must_use]
    pub fn start(config: DispatcherConfig, channels: Vec<Arc<dyn DeliveryChannel>>) -> Self {
        let capacity = config.queue_capacity.max(1);
        let workers = config.workers.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let worker = Worker {
            channels: Arc::from(channels),
            retry: config.retry,
        };
        let task = tokio::spawn(run(receiver, shutdown_rx, worker, workers));

        tracing::info!(queue_capacity = capacity, workers, "Notification dispatcher started");

        Self {
            handle: NotificationHandle { sender },
            shutdown: Some(shutdown_tx),
            task,
            shutdown_timeout: config.shutdown_timeout,
        }
    }

    /// A new submission handle.
    #[must_use]
    pub fn handle(&self) -> NotificationHandle {
        self.handle.clone()
    }

    /// Stop accepting jobs, deliver everything already accepted, and wait for
    /// in-flight deliveries, bounded by the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`DispatcherError::ShutdownTimeout`] if draining takes too long
    /// (remaining deliveries are abandoned) or [`DispatcherError::Join`] if the
    /// loop panicked.
    pub async fn shutdown(mut self) -> Result<(), DispatcherError> {
        if let Some(signal) = self.shutdown.take() {
            // The loop may already have exited; nothing to signal then.
            let _ = signal.send(());
        }

        match tokio::time::timeout(self.shutdown_timeout, &mut self.task).await {
            Ok(Ok(())) => {
                tracing::info!("Notification dispatcher drained and stopped");
                Ok(())
            }
            Ok(Err(e)) => Err(DispatcherError::Join(e.to_string())),
            Err(_) => {
                self.task.abort();
                tracing::error!(timeout = ?self.shutdown_timeout, "Notification dispatcher shutdown timed out");
                Err(DispatcherError::ShutdownTimeout(self.shutdown_timeout))
            }
        }
    }
}

async fn run(
    mut receiver: mpsc::Receiver<NotificationJob>,
    mut shutdown: oneshot::Receiver<()>,
    worker: Worker,
    workers: usize,
) {
    let pool = Arc::new(Semaphore::new(workers));

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                receiver.close();
                break;
            }
            job = receiver.recv() => match job {
                Some(job) => spawn_delivery(&pool, &worker, job).await,
                None => break,
            },
        }
        DispatcherMetrics::record_depth(receiver.len());
    }

    // Closed: drain what was accepted before the close.
    while let Some(job) = receiver.recv().await {
        spawn_delivery(&pool, &worker, job).await;
    }

    // Every permit back means every delivery task has finished.
    #[allow(clippy::cast_possible_truncation)]
    let _drained = pool.acquire_many(workers as u32).await;
    DispatcherMetrics::record_depth(0);
}

async fn spawn_delivery(pool: &Arc<Semaphore>, worker: &Worker, job: NotificationJob) {
    let Ok(permit) = Arc::clone(pool).acquire_owned().await else {
        return;
    };
    let worker = worker.clone();
    tokio::spawn(async move {
        worker.deliver(&job).await;
        drop(permit);
    });
}

#[derive(Clone)]
struct Worker {
    channels: Arc<[Arc<dyn DeliveryChannel>]>,
    retry: RetryPolicy,
}

impl Worker {
    /// Deliver one job on every channel that can reach its recipients.
    ///
    /// Channels are independent: one failing never skips another.
    #[tracing::instrument(skip(self, job), fields(reservation_id = %job.reservation_id))]
    async fn deliver(&self, job: &NotificationJob) {
        if job.recipients.is_empty() {
            tracing::warn!("Reservation has no email or phone on record, skipping notification");
            return;
        }

        for channel in self.channels.iter().filter(|c| c.accepts(job)) {
            let started = Instant::now();
            let result = retry_with_predicate(
                &self.retry,
                || channel.deliver(job),
                DeliveryError::is_transient,
            )
            .await;

            DispatcherMetrics::record_delivery(channel.name(), result.is_ok(), started.elapsed());
            match result {
                Ok(()) => tracing::info!(channel = channel.name(), "Confirmation delivered"),
                Err(e) => tracing::error!(
                    channel = channel.name(),
                    error = %e,
                    "Confirmation delivery failed permanently"
                ),
            }
        }
    }
}
