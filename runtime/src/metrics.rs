//! Prometheus metrics for the notification pipeline.
//!
//! Business metrics (reservations, validations) are registered by the
//! application crate; this module owns the exporter and the metrics emitted
//! by the dispatcher and the retry helper.
//!
//! # Example
//!
//! ```rust,no_run
//! use seatbook_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! if let Some(text) = server.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics recorder with a render handle.
///
/// The address is where an embedding HTTP surface is expected to expose
/// [`MetricsServer::render`] output.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed. An
    /// already-installed recorder (common in tests) is tolerated.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Configured scrape address.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this instance did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all runtime metric descriptions.
fn register_metrics() {
    describe_counter!(
        "seatbook_notifications_enqueued_total",
        "Notification jobs accepted by the dispatcher queue"
    );
    describe_counter!(
        "seatbook_notifications_dropped_total",
        "Notification jobs rejected at enqueue time, by reason (full, closed)"
    );
    describe_gauge!(
        "seatbook_notification_queue_depth",
        "Jobs waiting in the dispatcher queue"
    );
    describe_counter!(
        "seatbook_notification_deliveries_total",
        "Delivery attempts by channel and final outcome (delivered, failed)"
    );
    describe_histogram!(
        "seatbook_notification_delivery_duration_seconds",
        "Time to deliver one job on one channel, retries included"
    );

    describe_counter!("retry_attempts_total", "Total number of retry attempts");
    describe_counter!("retry_successes_total", "Operations that succeeded after retrying");
    describe_counter!(
        "retry_exhausted_total",
        "Operations that failed after exhausting max retries"
    );
}

/// Dispatcher metrics recorder.
pub struct DispatcherMetrics;

impl DispatcherMetrics {
    /// Record an accepted job and the queue depth after accepting it.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_enqueued(depth: usize) {
        counter!("seatbook_notifications_enqueued_total").increment(1);
        gauge!("seatbook_notification_queue_depth").set(depth as f64);
    }

    /// Record a job that could not be enqueued.
    pub fn record_dropped(reason: &'static str) {
        counter!("seatbook_notifications_dropped_total", "reason" => reason).increment(1);
    }

    /// Record the queue depth observed by the dispatcher loop.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_depth(depth: usize) {
        gauge!("seatbook_notification_queue_depth").set(depth as f64);
    }

    /// Record the final outcome of one channel delivery.
    pub fn record_delivery(channel: &'static str, delivered: bool, duration: Duration) {
        let outcome = if delivered { "delivered" } else { "failed" };
        counter!(
            "seatbook_notification_deliveries_total",
            "channel" => channel,
            "outcome" => outcome
        )
        .increment(1);
        histogram!("seatbook_notification_delivery_duration_seconds", "channel" => channel)
            .record(duration.as_secs_f64());
    }
}

/// Retry metrics recorder.
pub struct RetryMetrics;

impl RetryMetrics {
    /// Record a retry attempt.
    pub fn record_attempt() {
        counter!("retry_attempts_total").increment(1);
    }

    /// Record a successful retry.
    pub fn record_success() {
        counter!("retry_successes_total").increment(1);
    }

    /// Record exhausted retries.
    pub fn record_exhausted() {
        counter!("retry_exhausted_total").increment(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_server_creation() {
        let addr = "127.0.0.1:9090".parse().unwrap();
        let server = MetricsServer::new(addr);
        assert!(server.render().is_none());
        assert_eq!(server.addr(), addr);
    }

    #[test]
    fn test_metrics_server_render() {
        let mut server = MetricsServer::new("127.0.0.1:0".parse().unwrap());
        server.start().unwrap();

        DispatcherMetrics::record_enqueued(1);
        DispatcherMetrics::record_delivery("email", true, Duration::from_millis(20));
        RetryMetrics::record_attempt();

        // Another test may have installed the global recorder first.
        if let Some(rendered) = server.render() {
            assert!(rendered.contains("seatbook_notifications_enqueued_total"));
            assert!(rendered.contains("seatbook_notification_deliveries_total"));
        }
    }
}
