//! Business metrics for bookings and validations.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `seatbook_reservations_total{outcome}` - Reservation attempts by outcome
//!   (`booked` or an error kind such as `seat_already_booked`)
//! - `seatbook_reservation_seats_total` - Seats committed
//! - `seatbook_validations_total{result}` - Validations by result
//! - `seatbook_cancellations_total` - Reservations cancelled
//!
//! ## Histograms
//! - `seatbook_commit_duration_seconds` - Time spent in the store commit
//!
//! Notification metrics are owned by `seatbook_runtime::metrics`.

use metrics::{describe_counter, describe_histogram};
use seatbook_core::error::BookingError;
use std::time::Duration;

/// Initialize and register all business metrics descriptions.
///
/// Call once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "seatbook_reservations_total",
        "Reservation attempts by outcome (booked or error kind)"
    );
    describe_counter!("seatbook_reservation_seats_total", "Seats committed in reservations");
    describe_histogram!(
        "seatbook_commit_duration_seconds",
        "Time spent committing a reservation to the store"
    );
    describe_counter!(
        "seatbook_validations_total",
        "Validation requests by result (valid, not_found, cancelled, undecodable, invalid_input)"
    );
    describe_counter!("seatbook_cancellations_total", "Reservations cancelled");

    tracing::info!("Business metrics registered");
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record a committed reservation.
pub fn record_reservation_booked(seats: usize, commit: Duration) {
    metrics::counter!("seatbook_reservations_total", "outcome" => "booked").increment(1);
    metrics::counter!("seatbook_reservation_seats_total").increment(seats as u64);
    metrics::histogram!("seatbook_commit_duration_seconds").record(commit.as_secs_f64());
}

/// Record a rejected reservation attempt.
pub fn record_reservation_rejected(error: &BookingError) {
    metrics::counter!("seatbook_reservations_total", "outcome" => error.kind().as_str()).increment(1);
}

/// Record a validation result label.
pub fn record_validation(result: &'static str) {
    metrics::counter!("seatbook_validations_total", "result" => result).increment(1);
}

/// Record a cancellation.
pub fn record_cancellation() {
    metrics::counter!("seatbook_cancellations_total").increment(1);
}
