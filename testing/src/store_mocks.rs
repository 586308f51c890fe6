//! In-memory reservation store.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use seatbook_core::error::StoreError;
use seatbook_core::store::{ReservationStore, StoreFuture};
use seatbook_core::types::{
    EventId, HolderId, Reservation, ReservationId, ReservationStatus, SeatNumber,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct State {
    reservations: HashMap<ReservationId, (u64, Reservation)>,
    /// Active seat claims; the uniqueness constraint.
    claims: HashMap<(EventId, SeatNumber), ReservationId>,
    codes: HashMap<String, ReservationId>,
    next_sequence: u64,
}

impl State {
    fn sorted(&self, filter: impl Fn(&Reservation) -> bool) -> Vec<Reservation> {
        let mut rows: Vec<_> = self
            .reservations
            .values()
            .filter(|(_, r)| filter(r))
            .collect();
        rows.sort_by(|(a_seq, a), (b_seq, b)| {
            b.created_at.cmp(&a.created_at).then(b_seq.cmp(a_seq))
        });
        rows.into_iter().map(|(_, r)| r.clone()).collect()
    }
}

/// In-memory [`ReservationStore`] with the same atomicity as the database.
///
/// Every check-and-write happens under one lock, so two concurrent inserts
/// for the same seat can never both succeed. An optional insert delay widens
/// the window between the engine's pre-check and the commit, which is where
/// races are decided.
#[derive(Clone, Debug, Default)]
pub struct InMemoryReservationStore {
    state: Arc<Mutex<State>>,
    insert_delay: Option<Duration>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryReservationStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` before each insert takes the lock
    #[must_use]
    pub fn with_insert_delay(mut self, delay: Duration) -> Self {
        self.insert_delay = Some(delay);
        self
    }

    /// Make writes fail with [`StoreError::Database`]
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored reservations, any status
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().reservations.len()
    }

    /// Whether the store holds no reservations
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of seats currently claimed for `event_id`
    #[must_use]
    pub fn claimed_seat_count(&self, event_id: EventId) -> usize {
        self.state
            .lock()
            .unwrap()
            .claims
            .keys()
            .filter(|(event, _)| *event == event_id)
            .count()
    }
}

impl ReservationStore for InMemoryReservationStore {
    fn booked_seats<'a>(
        &'a self,
        event_id: EventId,
        seats: &'a [SeatNumber],
    ) -> StoreFuture<'a, Vec<SeatNumber>> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            Ok(seats
                .iter()
                .copied()
                .filter(|seat| state.claims.contains_key(&(event_id, *seat)))
                .collect())
        })
    }

    fn insert(&self, reservation: Reservation) -> StoreFuture<'_, Reservation> {
        Box::pin(async move {
            if let Some(delay) = self.insert_delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Database("injected write failure".to_string()));
            }

            let mut state = self.state.lock().unwrap();

            for seat in reservation.seat_numbers() {
                if state.claims.contains_key(&(reservation.event_id, seat)) {
                    return Err(StoreError::SeatConflict { seat: Some(seat) });
                }
            }
            if reservation
                .codes()
                .any(|code| state.codes.contains_key(code.content.as_str()))
            {
                return Err(StoreError::DuplicateCode);
            }

            for seat in reservation.seat_numbers() {
                state.claims.insert((reservation.event_id, seat), reservation.id);
            }
            for code in reservation.codes() {
                state.codes.insert(code.content.as_str().to_string(), reservation.id);
            }
            let sequence = state.next_sequence;
            state.next_sequence += 1;
            state
                .reservations
                .insert(reservation.id, (sequence, reservation.clone()));
            drop(state);

            Ok(reservation)
        })
    }

    fn find_by_id(&self, id: ReservationId) -> StoreFuture<'_, Option<Reservation>> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            Ok(state.reservations.get(&id).map(|(_, r)| r.clone()))
        })
    }

    fn find_by_code<'a>(&'a self, content: &'a str) -> StoreFuture<'a, Option<Reservation>> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            Ok(state
                .codes
                .get(content)
                .and_then(|id| state.reservations.get(id))
                .map(|(_, r)| r.clone()))
        })
    }

    fn cancel(&self, id: ReservationId) -> StoreFuture<'_, Reservation> {
        Box::pin(async move {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Database("injected write failure".to_string()));
            }

            let mut state = self.state.lock().unwrap();
            let (_, reservation) = state
                .reservations
                .get_mut(&id)
                .ok_or(StoreError::NotFound(id))?;

            if !reservation.status.can_transition_to(ReservationStatus::Cancelled) {
                return Err(StoreError::InvalidTransition {
                    id,
                    from: reservation.status,
                    to: ReservationStatus::Cancelled,
                });
            }
            reservation.status = ReservationStatus::Cancelled;
            let cancelled = reservation.clone();

            for seat in cancelled.seat_numbers() {
                state.claims.remove(&(cancelled.event_id, seat));
            }
            drop(state);

            Ok(cancelled)
        })
    }

    fn list_by_holder(&self, holder_id: HolderId) -> StoreFuture<'_, Vec<Reservation>> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            Ok(state.sorted(|r| r.holder_id == holder_id))
        })
    }

    fn list_all(&self) -> StoreFuture<'_, Vec<Reservation>> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            Ok(state.sorted(|_| true))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fixtures, test_clock};
    use seatbook_core::environment::Clock;
    use seatbook_core::types::{
        CodeContent, IssuedTicket, SeatCategory, SeatSelection, TicketCode,
    };

    fn reservation(event_id: EventId, seats: &[u32]) -> Reservation {
        Reservation {
            id: ReservationId::new(),
            event_id,
            holder_id: HolderId::new(),
            tickets: seats
                .iter()
                .map(|n| IssuedTicket {
                    seat: SeatSelection::new(*n, SeatCategory::SILVER),
                    code: TicketCode {
                        content: CodeContent::new(format!("code-{}", ReservationId::new())),
                        rendered_image: vec![],
                    },
                })
                .collect(),
            buyer: fixtures::buyer(),
            status: ReservationStatus::Booked,
            created_at: test_clock().now(),
        }
    }

    #[tokio::test]
    async fn test_overlapping_insert_conflicts() {
        let store = InMemoryReservationStore::new();
        let event_id = EventId::new();

        store.insert(reservation(event_id, &[1, 2])).await.unwrap();
        let err = store.insert(reservation(event_id, &[2, 3])).await.unwrap_err();

        assert_eq!(err, StoreError::SeatConflict { seat: Some(SeatNumber::new(2)) });
        assert_eq!(store.len(), 1);
        assert_eq!(store.claimed_seat_count(event_id), 2);
    }

    #[tokio::test]
    async fn test_same_seat_different_events_is_fine() {
        let store = InMemoryReservationStore::new();
        store.insert(reservation(EventId::new(), &[1])).await.unwrap();
        store.insert(reservation(EventId::new(), &[1])).await.unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_releases_seats_and_keeps_codes() {
        let store = InMemoryReservationStore::new();
        let event_id = EventId::new();
        let original = store.insert(reservation(event_id, &[5])).await.unwrap();
        let code = original.tickets[0].code.content.as_str().to_string();

        let cancelled = store.cancel(original.id).await.unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        assert!(store.booked_seats(event_id, &[SeatNumber::new(5)]).await.unwrap().is_empty());

        let found = store.find_by_code(&code).await.unwrap().unwrap();
        assert_eq!(found.status, ReservationStatus::Cancelled);

        store.insert(reservation(event_id, &[5])).await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_twice_is_invalid_transition() {
        let store = InMemoryReservationStore::new();
        let original = store.insert(reservation(EventId::new(), &[1])).await.unwrap();
        store.cancel(original.id).await.unwrap();

        let err = store.cancel(original.id).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));

        let unknown = ReservationId::new();
        assert_eq!(store.cancel(unknown).await.unwrap_err(), StoreError::NotFound(unknown));
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let store = InMemoryReservationStore::new();
        let event_id = EventId::new();
        let first = store.insert(reservation(event_id, &[1])).await.unwrap();

        let mut second = reservation(event_id, &[2]);
        second.tickets[0].code = first.tickets[0].code.clone();
        assert_eq!(store.insert(second).await.unwrap_err(), StoreError::DuplicateCode);
    }
}
