//! # Seatbook Core
//!
//! Domain types, error taxonomy and injected-dependency traits for the seat
//! reservation engine.
//!
//! ## Core Concepts
//!
//! - **Event**: an externally owned, read-only description of a scheduled
//!   event (capacity, seat categories, display details)
//! - **Reservation**: a committed claim on one or more seats, holding exactly
//!   one ticket code per seat
//! - **Ticket code**: an opaque, unguessable token; its rendered image is a
//!   derived artifact and never the identity
//! - **Environment traits**: every external collaborator (clock, seat catalog,
//!   account directory, reservation store, notification queue) is a trait
//!   object injected at startup
//!
//! ## Concurrency
//!
//! Seat exclusivity is a property of the [`store::ReservationStore`]
//! implementation, never of application-level locks. A store must reject an
//! insert whose (event, seat) pair is already claimed by a booked reservation
//! with [`error::StoreError::SeatConflict`].
//!
//! ```text
//! caller ─▶ engine ─▶ SeatCatalog (bounds)
//!                 ─▶ code generator (one code per seat)
//!                 ─▶ ReservationStore::insert (atomic)
//!                 ─▶ NotificationQueue::enqueue (after commit, not awaited)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod environment;
pub mod error;
pub mod notification;
pub mod store;
pub mod types;

pub use catalog::{AccountDirectory, SeatCatalog};
pub use environment::{Clock, SystemClock};
pub use error::{BookingError, CatalogError, ErrorKind, StoreError};
pub use notification::{
    DeliveryChannel, DeliveryError, DisplayFields, EnqueueError, NotificationJob,
    NotificationQueue, Recipients,
};
pub use store::ReservationStore;
pub use types::*;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
