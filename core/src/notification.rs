//! Notification dispatch boundary.
//!
//! The engine hands a [`NotificationJob`] to a [`NotificationQueue`] only
//! after the reservation commit is durable. Enqueueing returns immediately;
//! delivery happens on a separate worker pool and its outcome never reaches
//! the booking caller.

use crate::types::{Event, Reservation, ReservationId, SeatCategory, SeatNumber};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Where a confirmation should be delivered
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipients {
    /// Email address, if known
    pub email: Option<String>,
    /// Phone number, if known
    pub phone: Option<String>,
}

impl Recipients {
    /// Whether there is nobody to notify
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.email.is_none() && self.phone.is_none()
    }
}

/// Fields rendered into the confirmation message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayFields {
    /// Event title
    pub event_title: String,
    /// Reserved seat numbers, in reservation order
    pub seat_numbers: Vec<SeatNumber>,
    /// Category of each seat, same order
    pub categories: Vec<SeatCategory>,
    /// Buyer name, if known
    pub buyer_name: Option<String>,
}

/// Immutable payload describing one confirmed reservation.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationJob {
    /// Reservation being confirmed
    pub reservation_id: ReservationId,
    /// Delivery targets
    pub recipients: Recipients,
    /// PNG bytes of each seat's code, in seat order
    pub rendered_codes: Vec<Vec<u8>>,
    /// Message fields
    pub display_fields: DisplayFields,
}

impl NotificationJob {
    /// Subject line used by every channel that has one.
    pub const SUBJECT: &'static str = "Ticket Confirmation";

    /// Build the job for a freshly committed reservation.
    #[must_use]
    pub fn for_reservation(reservation: &Reservation, event: &Event) -> Self {
        Self {
            reservation_id: reservation.id,
            recipients: Recipients {
                email: reservation.buyer.email.clone(),
                phone: reservation.buyer.phone.clone(),
            },
            rendered_codes: reservation
                .codes()
                .map(|code| code.rendered_image.clone())
                .collect(),
            display_fields: DisplayFields {
                event_title: event.title.clone(),
                seat_numbers: reservation.seat_numbers(),
                categories: reservation.seats().map(|s| s.category.clone()).collect(),
                buyer_name: reservation.buyer.name.clone(),
            },
        }
    }

    /// Plain-text confirmation message.
    #[must_use]
    pub fn message(&self) -> String {
        let fields = &self.display_fields;
        let seats = fields
            .seat_numbers
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let label = if fields.seat_numbers.len() == 1 {
            "Seat number"
        } else {
            "Seat numbers"
        };
        format!(
            "Your ticket for event \"{}\" is confirmed. {label}: {seats}.",
            fields.event_title
        )
    }
}

impl fmt::Debug for NotificationJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationJob")
            .field("reservation_id", &self.reservation_id)
            .field("recipients", &self.recipients)
            .field("rendered_codes", &self.rendered_codes.len())
            .field("display_fields", &self.display_fields)
            .finish()
    }
}

/// Errors from [`NotificationQueue::enqueue`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueError {
    /// The bounded queue is at capacity.
    #[error("Notification queue is full")]
    QueueFull,

    /// The dispatcher has shut down.
    #[error("Notification queue is closed")]
    Closed,
}

/// Fire-and-forget submission of notification jobs.
///
/// Implementations must return without waiting for delivery.
pub trait NotificationQueue: Send + Sync {
    /// Submit a job.
    ///
    /// # Errors
    ///
    /// Returns [`EnqueueError`] if the job could not be accepted. Callers on
    /// the booking path log and count this; they never fail the booking.
    fn enqueue(&self, job: NotificationJob) -> Result<(), EnqueueError>;
}

/// Errors from a [`DeliveryChannel`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// Worth retrying (timeouts, 5xx, connection resets).
    #[error("Transient delivery failure: {0}")]
    Transient(String),

    /// Retrying cannot help (rejected address, 4xx, malformed message).
    #[error("Permanent delivery failure: {0}")]
    Permanent(String),
}

impl DeliveryError {
    /// Whether the dispatcher should retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Future returned by [`DeliveryChannel::deliver`].
pub type DeliveryFuture<'a> = Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + 'a>>;

/// One way of reaching a buyer (email, SMS, console).
pub trait DeliveryChannel: Send + Sync {
    /// Short label for logs and metrics (e.g. "email").
    fn name(&self) -> &'static str;

    /// Whether `job` has a recipient this channel can reach.
    fn accepts(&self, job: &NotificationJob) -> bool;

    /// Deliver one confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Transient`] for failures worth retrying and
    /// [`DeliveryError::Permanent`] otherwise.
    fn deliver<'a>(&'a self, job: &'a NotificationJob) -> DeliveryFuture<'a>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(seats: &[u32]) -> NotificationJob {
        NotificationJob {
            reservation_id: ReservationId::new(),
            recipients: Recipients::default(),
            rendered_codes: vec![],
            display_fields: DisplayFields {
                event_title: "Summer Gala".to_string(),
                seat_numbers: seats.iter().copied().map(SeatNumber::new).collect(),
                categories: vec![],
                buyer_name: None,
            },
        }
    }

    #[test]
    fn test_single_seat_message() {
        assert_eq!(
            job(&[7]).message(),
            "Your ticket for event \"Summer Gala\" is confirmed. Seat number: 7."
        );
    }

    #[test]
    fn test_multi_seat_message() {
        assert_eq!(
            job(&[1, 2]).message(),
            "Your ticket for event \"Summer Gala\" is confirmed. Seat numbers: 1, 2."
        );
    }

    #[test]
    fn test_recipients_empty() {
        assert!(Recipients::default().is_empty());
        let recipients = Recipients {
            email: None,
            phone: Some("+1".to_string()),
        };
        assert!(!recipients.is_empty());
    }
}
