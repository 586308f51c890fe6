//! Error types for booking, storage and catalog operations.

use crate::types::{EventId, ReservationId, ReservationStatus, SeatCategory, SeatNumber};
use thiserror::Error;

/// Errors reported synchronously to callers of the reservation engine and the
/// validation service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BookingError {
    // ═══════════════════════════════════════════════════════════
    // Request errors (caller bug, not retryable as-is)
    // ═══════════════════════════════════════════════════════════

    /// Malformed request shape.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested seat number is outside `[1, total_seats]`.
    #[error("Seat {seat} is out of range (event has {total_seats} seats)")]
    SeatOutOfRange {
        /// Offending seat
        seat: SeatNumber,
        /// Capacity of the event
        total_seats: u32,
    },

    /// Requested category is not declared by the event.
    #[error("Seat {seat} requests undeclared category '{category}'")]
    InvalidCategory {
        /// Offending seat
        seat: SeatNumber,
        /// Undeclared category
        category: SeatCategory,
    },

    // ═══════════════════════════════════════════════════════════
    // Lookup errors
    // ═══════════════════════════════════════════════════════════

    /// The event does not exist in the seat catalog.
    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    /// The reservation does not exist.
    #[error("Reservation not found: {0}")]
    ReservationNotFound(ReservationId),

    // ═══════════════════════════════════════════════════════════
    // Contention (retryable by the caller with another seat choice)
    // ═══════════════════════════════════════════════════════════

    /// Another reservation holds the seat.
    #[error("{}", describe_booked(.seat))]
    SeatAlreadyBooked {
        /// The contested seat, when the store could identify it
        seat: Option<SeatNumber>,
    },

    // ═══════════════════════════════════════════════════════════
    // Ticket code errors
    // ═══════════════════════════════════════════════════════════

    /// A code could not be rendered; nothing was committed.
    #[error("Ticket code rendering failed: {0}")]
    RenderingFailure(String),

    /// A presented image did not contain a readable code.
    #[error("Ticket code image could not be decoded")]
    Undecodable,

    // ═══════════════════════════════════════════════════════════
    // Infrastructure
    // ═══════════════════════════════════════════════════════════

    /// Seat catalog failure.
    #[error("Seat catalog error: {0}")]
    Catalog(String),

    /// Reservation store failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

fn describe_booked(seat: &Option<SeatNumber>) -> String {
    match seat {
        Some(seat) => format!("Seat {seat} is already booked"),
        None => "One of the requested seats is already booked".to_string(),
    }
}

fn describe_conflict(seat: &Option<SeatNumber>) -> String {
    seat.map(|s| format!(" on seat {s}")).unwrap_or_default()
}

/// Stable, machine-readable label for a [`BookingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`BookingError::InvalidInput`]
    InvalidInput,
    /// See [`BookingError::EventNotFound`] and [`BookingError::ReservationNotFound`]
    NotFound,
    /// See [`BookingError::SeatOutOfRange`]
    SeatOutOfRange,
    /// See [`BookingError::InvalidCategory`]
    InvalidCategory,
    /// See [`BookingError::SeatAlreadyBooked`]
    SeatAlreadyBooked,
    /// See [`BookingError::RenderingFailure`]
    RenderingFailure,
    /// See [`BookingError::Undecodable`]
    Undecodable,
    /// Catalog or storage fault
    Internal,
}

impl ErrorKind {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::NotFound => "not_found",
            Self::SeatOutOfRange => "seat_out_of_range",
            Self::InvalidCategory => "invalid_category",
            Self::SeatAlreadyBooked => "seat_already_booked",
            Self::RenderingFailure => "rendering_failure",
            Self::Undecodable => "undecodable",
            Self::Internal => "internal",
        }
    }
}

impl BookingError {
    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::EventNotFound(_) | Self::ReservationNotFound(_) => ErrorKind::NotFound,
            Self::SeatOutOfRange { .. } => ErrorKind::SeatOutOfRange,
            Self::InvalidCategory { .. } => ErrorKind::InvalidCategory,
            Self::SeatAlreadyBooked { .. } => ErrorKind::SeatAlreadyBooked,
            Self::RenderingFailure(_) => ErrorKind::RenderingFailure,
            Self::Undecodable => ErrorKind::Undecodable,
            Self::Catalog(_) | Self::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Whether the caller may retry (with a different seat choice).
    ///
    /// The engine itself never retries a lost race.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::SeatAlreadyBooked { .. })
    }
}

/// Errors from a [`crate::store::ReservationStore`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The uniqueness constraint on (event, seat) rejected the write, or a
    /// conflicting transaction committed first.
    #[error("Seat conflict{}", describe_conflict(.seat))]
    SeatConflict {
        /// The contested seat, when determinable
        seat: Option<SeatNumber>,
    },

    /// Code content collided with an existing code.
    #[error("Duplicate ticket code content")]
    DuplicateCode,

    /// No reservation with this ID.
    #[error("Reservation not found: {0}")]
    NotFound(ReservationId),

    /// Status change not permitted.
    #[error("Cannot move reservation {id} from {from} to {to}")]
    InvalidTransition {
        /// Reservation ID
        id: ReservationId,
        /// Current status
        from: ReservationStatus,
        /// Requested status
        to: ReservationStatus,
    },

    /// Database connection or query error.
    #[error("Database error: {0}")]
    Database(String),

    /// Stored data could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<StoreError> for BookingError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::SeatConflict { seat } => Self::SeatAlreadyBooked { seat },
            StoreError::NotFound(id) => Self::ReservationNotFound(id),
            StoreError::InvalidTransition { from, to, .. } => {
                Self::InvalidInput(format!("reservation is {from}, cannot become {to}"))
            }
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Errors from a [`crate::catalog::SeatCatalog`] or
/// [`crate::catalog::AccountDirectory`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Backend unavailable or query failed.
    #[error("Catalog backend error: {0}")]
    Backend(String),

    /// Catalog data violates its own invariants (e.g. zero capacity).
    #[error("Malformed catalog record: {0}")]
    Malformed(String),
}

impl From<CatalogError> for BookingError {
    fn from(error: CatalogError) -> Self {
        Self::Catalog(error.to_string())
    }
}
