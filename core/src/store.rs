//! Reservation store abstraction.
//!
//! # Correctness contract
//!
//! Implementations own seat exclusivity. [`ReservationStore::insert`] must
//! check and write as one atomic unit with respect to every other concurrent
//! insert for the same event, across processes: either a uniqueness
//! constraint on (event, seat) over active seat claims, or a serializable
//! transaction that re-validates availability immediately before writing.
//! A lost race is reported as [`StoreError::SeatConflict`], never retried.
//!
//! [`ReservationStore::booked_seats`] is a plain read. It exists so the engine
//! can fail fast with a friendly error before minting codes; it is never the
//! guard.
//!
//! # Implementations
//!
//! - `PostgresReservationStore` (in `seatbook-postgres`): production
//! - `InMemoryReservationStore` (in `seatbook-testing`): tests and demos

use crate::error::StoreError;
use crate::types::{EventId, HolderId, Reservation, ReservationId, SeatNumber};
use std::future::Future;
use std::pin::Pin;

/// Future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Durable storage for reservations and their ticket codes.
pub trait ReservationStore: Send + Sync {
    /// Which of `seats` are currently claimed by booked reservations of
    /// `event_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    fn booked_seats<'a>(
        &'a self,
        event_id: EventId,
        seats: &'a [SeatNumber],
    ) -> StoreFuture<'a, Vec<SeatNumber>>;

    /// Atomically persist a booked reservation, its seats and its codes.
    ///
    /// All rows become visible together or not at all.
    ///
    /// # Errors
    ///
    /// - [`StoreError::SeatConflict`]: a seat is already claimed
    /// - [`StoreError::DuplicateCode`]: a code content already exists
    /// - [`StoreError::Database`]: the write failed
    fn insert(&self, reservation: Reservation) -> StoreFuture<'_, Reservation>;

    /// Point lookup by reservation ID.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] or [`StoreError::Serialization`].
    fn find_by_id(&self, id: ReservationId) -> StoreFuture<'_, Option<Reservation>>;

    /// Lookup by ticket code content.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] or [`StoreError::Serialization`].
    fn find_by_code<'a>(&'a self, content: &'a str) -> StoreFuture<'a, Option<Reservation>>;

    /// Flip a booked reservation to cancelled, releasing its seats while
    /// keeping its seat and code records.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`]: unknown ID
    /// - [`StoreError::InvalidTransition`]: already cancelled
    fn cancel(&self, id: ReservationId) -> StoreFuture<'_, Reservation>;

    /// All reservations of one holder, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] or [`StoreError::Serialization`].
    fn list_by_holder(&self, holder_id: HolderId) -> StoreFuture<'_, Vec<Reservation>>;

    /// All reservations, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] or [`StoreError::Serialization`].
    fn list_all(&self) -> StoreFuture<'_, Vec<Reservation>>;
}
