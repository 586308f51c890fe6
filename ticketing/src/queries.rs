//! Read models over committed reservations: a holder's booked events and the
//! administrative listing.

use crate::environment::BookingEnvironment;
use chrono::{DateTime, Utc};
use seatbook_core::error::BookingError;
use seatbook_core::types::{
    BuyerSnapshot, Event, EventDetails, EventId, HolderId, ReservationId, ReservationStatus,
    SeatSelection, TicketCode,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One event a holder has booked seats for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderEventBookings {
    /// Event details from the catalog
    pub event: EventDetails,
    /// Booked seats across all of the holder's reservations for this event
    pub seats: Vec<SeatSelection>,
    /// Codes, one per seat, same order
    pub codes: Vec<TicketCode>,
}

/// One row of the administrative listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationListing {
    /// Reservation ID
    pub reservation_id: ReservationId,
    /// Owning account
    pub holder_id: HolderId,
    /// Current status
    pub status: ReservationStatus,
    /// Reserved seats
    pub seats: Vec<SeatSelection>,
    /// Codes, one per seat
    pub codes: Vec<TicketCode>,
    /// Buyer, snapshot first with live account fallback
    pub buyer: BuyerSnapshot,
    /// Event details, if the event still exists
    pub event: Option<EventDetails>,
    /// Commit timestamp
    pub created_at: DateTime<Utc>,
}

/// Query service over the reservation store and catalog.
#[derive(Clone)]
pub struct ReservationQueries {
    env: BookingEnvironment,
}

impl ReservationQueries {
    /// Creates a new `ReservationQueries`
    #[must_use]
    pub const fn new(env: BookingEnvironment) -> Self {
        Self { env }
    }

    /// Booked reservations of `holder_id`, grouped by event, newest first.
    ///
    /// Events no longer in the catalog are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Storage`] if the store fails.
    #[tracing::instrument(skip(self), fields(holder_id = %holder_id))]
    pub async fn booked_events_for_holder(
        &self,
        holder_id: HolderId,
    ) -> Result<Vec<HolderEventBookings>, BookingError> {
        let reservations = self.env.store.list_by_holder(holder_id).await?;

        let mut order: Vec<EventId> = Vec::new();
        let mut grouped: HashMap<EventId, (Vec<SeatSelection>, Vec<TicketCode>)> = HashMap::new();
        for reservation in reservations.into_iter().filter(|r| r.is_booked()) {
            let entry = grouped.entry(reservation.event_id).or_insert_with(|| {
                order.push(reservation.event_id);
                (Vec::new(), Vec::new())
            });
            for ticket in reservation.tickets {
                entry.0.push(ticket.seat);
                entry.1.push(ticket.code);
            }
        }

        let mut overview = Vec::with_capacity(order.len());
        for event_id in order {
            let Some(event) = self.env.event_or_none(event_id).await else {
                tracing::debug!(event_id = %event_id, "Skipping event missing from catalog");
                continue;
            };
            if let Some((seats, codes)) = grouped.remove(&event_id) {
                overview.push(HolderEventBookings {
                    event: event.details(),
                    seats,
                    codes,
                });
            }
        }
        Ok(overview)
    }

    /// Every reservation, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Storage`] if the store fails.
    #[tracing::instrument(skip(self))]
    pub async fn list_all_reservations(&self) -> Result<Vec<ReservationListing>, BookingError> {
        let reservations = self.env.store.list_all().await?;

        let mut events: HashMap<EventId, Option<Event>> = HashMap::new();
        let mut listing = Vec::with_capacity(reservations.len());
        for reservation in reservations {
            if !events.contains_key(&reservation.event_id) {
                let event = self.env.event_or_none(reservation.event_id).await;
                events.insert(reservation.event_id, event);
            }
            let event = events
                .get(&reservation.event_id)
                .and_then(|e| e.as_ref().map(Event::details));
            let account = self.env.account_or_none(reservation.holder_id).await;

            let (seats, codes): (Vec<_>, Vec<_>) = reservation
                .tickets
                .into_iter()
                .map(|t| (t.seat, t.code))
                .unzip();
            listing.push(ReservationListing {
                reservation_id: reservation.id,
                holder_id: reservation.holder_id,
                status: reservation.status,
                seats,
                codes,
                buyer: reservation.buyer.with_account_fallback(account.as_ref()),
                event,
                created_at: reservation.created_at,
            });
        }

        tracing::debug!(count = listing.len(), "Listed reservations");
        Ok(listing)
    }
}
