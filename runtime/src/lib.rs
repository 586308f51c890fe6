//! # Seatbook Runtime
//!
//! Background machinery shared by the booking service:
//!
//! - **Dispatcher**: bounded notification queue drained by a worker pool
//! - **Retry**: exponential backoff for transient delivery failures
//! - **Metrics**: Prometheus recorder plus dispatcher and retry counters
//!
//! ## Example
//!
//! ```ignore
//! use seatbook_runtime::{DispatcherConfig, NotificationDispatcher};
//!
//! let dispatcher = NotificationDispatcher::start(DispatcherConfig::default(), channels);
//! let queue = dispatcher.handle(); // hand to the reservation engine
//!
//! // ... serve bookings ...
//!
//! dispatcher.shutdown().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Notification queue and worker pool
pub mod dispatcher;

/// Prometheus metrics for observability
pub mod metrics;

/// Retry logic with exponential backoff
pub mod retry;

pub use dispatcher::{
    DispatcherConfig, DispatcherError, NotificationDispatcher, NotificationHandle,
};
pub use retry::{RetryPolicy, RetryPolicyBuilder, retry_with_predicate};
