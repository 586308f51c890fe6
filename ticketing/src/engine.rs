//! Reservation engine.
//!
//! ```text
//! reserve(request)
//!   ├─ SeatCatalog::get_event          → EventNotFound
//!   ├─ check_selection                 → InvalidInput / SeatOutOfRange / InvalidCategory
//!   ├─ ReservationStore::booked_seats  → SeatAlreadyBooked (fast path only)
//!   ├─ CodeGenerator::generate × seats → RenderingFailure (nothing written)
//!   ├─ ReservationStore::insert        → SeatAlreadyBooked (the real guard)
//!   └─ NotificationQueue::enqueue      → logged, never fails the booking
//! ```

use crate::codes::CodeError;
use crate::environment::BookingEnvironment;
use crate::metrics;
use seatbook_core::error::BookingError;
use seatbook_core::notification::NotificationJob;
use seatbook_core::types::{
    BuyerSnapshot, Event, EventId, HolderId, IssuedTicket, Reservation, ReservationId,
    ReservationStatus, SeatNumber, SeatSelection,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;

/// A request to reserve seats for one event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveRequest {
    /// Event to book
    pub event_id: EventId,
    /// Requested seats, in the order codes should be minted
    pub seats: Vec<SeatSelection>,
    /// Owning account
    pub holder_id: HolderId,
    /// Buyer details supplied with the request
    pub buyer: BuyerSnapshot,
}

/// Books seats and cancels reservations.
#[derive(Clone)]
pub struct ReservationEngine {
    env: BookingEnvironment,
}

impl ReservationEngine {
    /// Creates a new `ReservationEngine`
    #[must_use]
    pub const fn new(env: BookingEnvironment) -> Self {
        Self { env }
    }

    /// Reserve the requested seats as one atomic unit.
    ///
    /// A lost race is reported, not retried: picking another seat is the
    /// caller's decision. A caller that times out must look the reservation
    /// up before assuming it was not made.
    ///
    /// # Errors
    ///
    /// - [`BookingError::EventNotFound`]: unknown event
    /// - [`BookingError::InvalidInput`]: no seats, or a seat requested twice
    /// - [`BookingError::SeatOutOfRange`]: seat outside `[1, total_seats]`
    /// - [`BookingError::InvalidCategory`]: category the event does not declare
    /// - [`BookingError::SeatAlreadyBooked`]: another reservation holds a seat
    /// - [`BookingError::RenderingFailure`]: a code could not be rendered
    /// - [`BookingError::Catalog`] / [`BookingError::Storage`]: infrastructure
    #[tracing::instrument(
        skip(self, request),
        fields(event_id = %request.event_id, holder_id = %request.holder_id, seats = request.seats.len())
    )]
    pub async fn reserve(&self, request: ReserveRequest) -> Result<Reservation, BookingError> {
        let result = self.try_reserve(request).await;
        if let Err(e) = &result {
            metrics::record_reservation_rejected(e);
            if e.is_retryable() {
                tracing::warn!(error = %e, "Reservation lost a seat race");
            } else {
                tracing::debug!(error = %e, "Reservation rejected");
            }
        }
        result
    }

    async fn try_reserve(&self, request: ReserveRequest) -> Result<Reservation, BookingError> {
        let ReserveRequest {
            event_id,
            seats,
            holder_id,
            buyer,
        } = request;

        let event = self
            .env
            .catalog
            .get_event(event_id)
            .await?
            .ok_or(BookingError::EventNotFound(event_id))?;

        check_selection(&event, &seats)?;

        let seat_numbers: Vec<SeatNumber> = seats.iter().map(|s| s.seat_number).collect();
        let taken = self.env.store.booked_seats(event.id, &seat_numbers).await?;
        if let Some(seat) = taken.first() {
            return Err(BookingError::SeatAlreadyBooked { seat: Some(*seat) });
        }

        let account = self.env.account_or_none(holder_id).await;
        let buyer = buyer.with_account_fallback(account.as_ref());

        let tickets = seats
            .into_iter()
            .map(|seat| {
                let code = self.env.codes.generate()?;
                Ok(IssuedTicket { seat, code })
            })
            .collect::<Result<Vec<_>, CodeError>>()?;

        let reservation = Reservation {
            id: ReservationId::new(),
            event_id: event.id,
            holder_id,
            tickets,
            buyer,
            status: ReservationStatus::Booked,
            created_at: self.env.clock.now(),
        };

        let started = Instant::now();
        let reservation = self.env.store.insert(reservation).await?;
        metrics::record_reservation_booked(reservation.tickets.len(), started.elapsed());

        tracing::info!(
            reservation_id = %reservation.id,
            seats = ?reservation.seat_numbers(),
            "Reservation committed"
        );

        self.notify(&reservation, &event);
        Ok(reservation)
    }

    /// Hand the confirmation to the dispatcher. The reservation is already
    /// durable; a rejected job only means no message goes out.
    fn notify(&self, reservation: &Reservation, event: &Event) {
        let job = NotificationJob::for_reservation(reservation, event);
        if let Err(e) = self.env.notifications.enqueue(job) {
            tracing::warn!(
                reservation_id = %reservation.id,
                error = %e,
                "Confirmation not queued; reservation stands"
            );
        }
    }

    /// Administratively cancel a booked reservation.
    ///
    /// Seats are released for future bookings; seat and code records are
    /// kept, so the codes keep validating as cancelled.
    ///
    /// # Errors
    ///
    /// - [`BookingError::ReservationNotFound`]: unknown ID
    /// - [`BookingError::InvalidInput`]: already cancelled
    /// - [`BookingError::Storage`]: the write failed
    #[tracing::instrument(skip(self), fields(reservation_id = %id))]
    pub async fn cancel(&self, id: ReservationId) -> Result<Reservation, BookingError> {
        let reservation = self.env.store.cancel(id).await?;
        metrics::record_cancellation();
        tracing::info!(seats = ?reservation.seat_numbers(), "Reservation cancelled");
        Ok(reservation)
    }
}

/// Precondition checks 2 to 5, in order. Event existence is checked first by
/// the caller.
fn check_selection(event: &Event, seats: &[SeatSelection]) -> Result<(), BookingError> {
    if seats.is_empty() {
        return Err(BookingError::InvalidInput(
            "at least one seat must be requested".to_string(),
        ));
    }

    if let Some(out) = seats.iter().find(|s| !event.contains_seat(s.seat_number)) {
        return Err(BookingError::SeatOutOfRange {
            seat: out.seat_number,
            total_seats: event.total_seats,
        });
    }

    if let Some(bad) = seats.iter().find(|s| !event.offers(&s.category)) {
        return Err(BookingError::InvalidCategory {
            seat: bad.seat_number,
            category: bad.category.clone(),
        });
    }

    let mut seen = HashSet::with_capacity(seats.len());
    if let Some(dup) = seats.iter().find(|s| !seen.insert(s.seat_number)) {
        return Err(BookingError::InvalidInput(format!(
            "seat {} requested more than once",
            dup.seat_number
        )));
    }

    Ok(())
}
