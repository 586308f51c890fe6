//! Injected dependencies shared by the engine, validation and query services.

use crate::codes::CodeGenerator;
use seatbook_core::catalog::{AccountDirectory, SeatCatalog};
use seatbook_core::environment::Clock;
use seatbook_core::notification::NotificationQueue;
use seatbook_core::store::ReservationStore;
use seatbook_core::types::{AccountContact, Event, EventId, HolderId};
use std::sync::Arc;

/// Everything the services talk to, constructed once at startup.
///
/// Cloning is cheap; every field is shared.
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Time source for `created_at`
    pub clock: Arc<dyn Clock>,
    /// External event catalog
    pub catalog: Arc<dyn SeatCatalog>,
    /// External account system
    pub accounts: Arc<dyn AccountDirectory>,
    /// Durable reservations
    pub store: Arc<dyn ReservationStore>,
    /// Ticket code minting
    pub codes: Arc<dyn CodeGenerator>,
    /// Confirmation hand-off
    pub notifications: Arc<dyn NotificationQueue>,
}

impl BookingEnvironment {
    /// Creates a new `BookingEnvironment`
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        catalog: Arc<dyn SeatCatalog>,
        accounts: Arc<dyn AccountDirectory>,
        store: Arc<dyn ReservationStore>,
        codes: Arc<dyn CodeGenerator>,
        notifications: Arc<dyn NotificationQueue>,
    ) -> Self {
        Self {
            clock,
            catalog,
            accounts,
            store,
            codes,
            notifications,
        }
    }

    /// Live account record, or `None` if absent or the directory failed.
    ///
    /// Account data only fills gaps in a buyer snapshot, so a directory
    /// outage degrades display fields instead of failing the caller.
    pub(crate) async fn account_or_none(&self, holder_id: HolderId) -> Option<AccountContact> {
        match self.accounts.get_account(holder_id).await {
            Ok(account) => account,
            Err(e) => {
                tracing::warn!(holder_id = %holder_id, error = %e, "Account lookup failed, using snapshot only");
                None
            }
        }
    }

    /// Event for display, or `None` if removed or the catalog failed.
    pub(crate) async fn event_or_none(&self, event_id: EventId) -> Option<Event> {
        match self.catalog.get_event(event_id).await {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(event_id = %event_id, error = %e, "Event lookup failed, omitting event details");
                None
            }
        }
    }
}
