//! External read-only collaborators: the seat catalog and the account
//! directory.
//!
//! Both traits return explicit `Pin<Box<dyn Future>>` so they can be held as
//! `Arc<dyn SeatCatalog>` inside the engine environment.

use crate::error::CatalogError;
use crate::types::{AccountContact, Event, EventId, HolderId};
use std::future::Future;
use std::pin::Pin;

/// Future returned by catalog lookups.
pub type CatalogFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CatalogError>> + Send + 'a>>;

/// Seat catalog accessor.
///
/// Returns an event's capacity, category layout and display details. The
/// reservation engine never writes through this trait.
pub trait SeatCatalog: Send + Sync {
    /// Look up an event.
    ///
    /// Returns `Ok(None)` when the event does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the backend fails or the record is malformed.
    fn get_event(&self, event_id: EventId) -> CatalogFuture<'_, Option<Event>>;
}

/// Account directory.
///
/// Supplies the live account record used to fill buyer fields the snapshot
/// lacks (see [`crate::types::BuyerSnapshot`]).
pub trait AccountDirectory: Send + Sync {
    /// Look up an account.
    ///
    /// Returns `Ok(None)` when the account does not exist (e.g. it was removed).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the backend fails.
    fn get_account(&self, holder_id: HolderId) -> CatalogFuture<'_, Option<AccountContact>>;
}
