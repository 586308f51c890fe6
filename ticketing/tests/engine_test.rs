//! Reservation engine behaviour: preconditions, commit, notification hand-off
//! and cancellation.

#![allow(clippy::unwrap_used)]

use seatbook::codes::CodeError;
use seatbook::{BookingEnvironment, CodeGenerator, QrCodeGenerator, ReservationEngine, ReserveRequest};
use seatbook_core::environment::Clock;
use seatbook_core::error::BookingError;
use seatbook_core::notification::EnqueueError;
use seatbook_core::store::ReservationStore;
use seatbook_core::types::{
    BuyerSnapshot, Event, EventId, HolderId, ReservationStatus, SeatCategory, SeatNumber,
    SeatSelection, TicketCode,
};
use seatbook_testing::{
    InMemoryAccountDirectory, InMemoryReservationStore, InMemorySeatCatalog, RecordingQueue,
    fixtures, test_clock,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Wraps the QR generator, counting calls and optionally failing the Nth.
struct CountingGenerator {
    inner: QrCodeGenerator,
    calls: AtomicUsize,
    fail_on: Option<usize>,
}

impl CountingGenerator {
    fn new(fail_on: Option<usize>) -> Self {
        Self {
            inner: QrCodeGenerator::new(2, true),
            calls: AtomicUsize::new(0),
            fail_on,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CodeGenerator for CountingGenerator {
    fn generate(&self) -> Result<TicketCode, CodeError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on == Some(call) {
            return Err(CodeError::Rendering("injected".to_string()));
        }
        self.inner.generate()
    }
}

struct Harness {
    engine: ReservationEngine,
    store: InMemoryReservationStore,
    accounts: InMemoryAccountDirectory,
    queue: RecordingQueue,
    codes: Arc<CountingGenerator>,
    event: Event,
}

fn harness_with(queue: RecordingQueue, fail_on: Option<usize>) -> Harness {
    let event = fixtures::event(2);
    let store = InMemoryReservationStore::new();
    let accounts = InMemoryAccountDirectory::new();
    let codes = Arc::new(CountingGenerator::new(fail_on));
    let env = BookingEnvironment::new(
        Arc::new(test_clock()),
        Arc::new(InMemorySeatCatalog::with_events([event.clone()])),
        Arc::new(accounts.clone()),
        Arc::new(store.clone()),
        codes.clone(),
        Arc::new(queue.clone()),
    );
    Harness {
        engine: ReservationEngine::new(env),
        store,
        accounts,
        queue,
        codes,
        event,
    }
}

fn harness() -> Harness {
    harness_with(RecordingQueue::new(), None)
}

fn request(event: &Event, seats: &[(u32, &str)]) -> ReserveRequest {
    ReserveRequest {
        event_id: event.id,
        seats: seats.iter().map(|(n, c)| SeatSelection::new(*n, *c)).collect(),
        holder_id: HolderId::new(),
        buyer: fixtures::buyer(),
    }
}

#[tokio::test]
async fn test_reserve_commits_one_code_per_seat_in_order() {
    let h = harness();

    let reservation = h
        .engine
        .reserve(request(&h.event, &[(2, "premium"), (1, "silver")]))
        .await
        .unwrap();

    assert_eq!(reservation.status, ReservationStatus::Booked);
    assert_eq!(reservation.seat_numbers(), vec![SeatNumber::new(2), SeatNumber::new(1)]);
    assert_eq!(reservation.codes().count(), 2);
    assert_eq!(reservation.created_at, test_clock().now());
    assert_eq!(h.codes.calls(), 2);

    let stored = h.store.find_by_id(reservation.id).await.unwrap().unwrap();
    assert_eq!(stored, reservation);
}

#[tokio::test]
async fn test_unknown_event() {
    let h = harness();
    let mut req = request(&h.event, &[(1, "silver")]);
    req.event_id = EventId::new();

    let err = h.engine.reserve(req.clone()).await.unwrap_err();
    assert_eq!(err, BookingError::EventNotFound(req.event_id));
}

#[tokio::test]
async fn test_out_of_range_fails_before_any_code_is_generated() {
    let h = harness();

    let err = h
        .engine
        .reserve(request(&h.event, &[(3, "silver")]))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        BookingError::SeatOutOfRange {
            seat: SeatNumber::new(3),
            total_seats: 2
        }
    );
    assert_eq!(h.codes.calls(), 0);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_precondition_failures() {
    let h = harness();

    let empty = h.engine.reserve(request(&h.event, &[])).await.unwrap_err();
    assert!(matches!(empty, BookingError::InvalidInput(_)));

    let category = h
        .engine
        .reserve(request(&h.event, &[(1, "bronze")]))
        .await
        .unwrap_err();
    assert!(matches!(category, BookingError::InvalidCategory { .. }));

    let duplicate = h
        .engine
        .reserve(request(&h.event, &[(1, "silver"), (1, "silver")]))
        .await
        .unwrap_err();
    assert!(matches!(duplicate, BookingError::InvalidInput(_)));

    assert_eq!(h.codes.calls(), 0);
    assert!(h.queue.jobs().is_empty());
}

#[tokio::test]
async fn test_category_is_case_insensitive() {
    let h = harness();
    h.engine
        .reserve(request(&h.event, &[(1, "DIAMOND")]))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rendering_failure_commits_nothing() {
    let h = harness_with(RecordingQueue::new(), Some(1));

    let err = h
        .engine
        .reserve(request(&h.event, &[(1, "silver"), (2, "silver")]))
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::RenderingFailure(_)));
    assert!(h.store.is_empty());
    assert_eq!(h.store.claimed_seat_count(h.event.id), 0);
    assert!(h.queue.jobs().is_empty());
}

#[tokio::test]
async fn test_already_booked_seat_is_reported() {
    let h = harness();
    h.engine
        .reserve(request(&h.event, &[(1, "silver")]))
        .await
        .unwrap();

    let err = h
        .engine
        .reserve(request(&h.event, &[(2, "silver"), (1, "silver")]))
        .await
        .unwrap_err();

    assert_eq!(err, BookingError::SeatAlreadyBooked { seat: Some(SeatNumber::new(1)) });
    assert!(err.is_retryable());
    assert_eq!(h.store.claimed_seat_count(h.event.id), 1);
}

#[tokio::test]
async fn test_notification_job_follows_commit() {
    let h = harness();
    let reservation = h
        .engine
        .reserve(request(&h.event, &[(1, "premium"), (2, "silver")]))
        .await
        .unwrap();

    let jobs = h.queue.jobs();
    assert_eq!(jobs.len(), 1);
    let job = &jobs[0];
    assert_eq!(job.reservation_id, reservation.id);
    assert_eq!(job.recipients.email.as_deref(), Some("ada@example.com"));
    assert_eq!(job.rendered_codes.len(), 2);
    assert_eq!(job.rendered_codes[0], reservation.tickets[0].code.rendered_image);
    assert_eq!(job.display_fields.event_title, "Summer Gala");
    assert_eq!(
        job.display_fields.categories,
        vec![SeatCategory::from(SeatCategory::PREMIUM), SeatCategory::from(SeatCategory::SILVER)]
    );
}

#[tokio::test]
async fn test_rejected_enqueue_does_not_fail_booking() {
    let h = harness_with(RecordingQueue::rejecting(EnqueueError::QueueFull), None);

    let reservation = h
        .engine
        .reserve(request(&h.event, &[(1, "silver")]))
        .await
        .unwrap();

    assert!(h.store.find_by_id(reservation.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_buyer_gaps_filled_from_account() {
    let h = harness();
    let holder_id = HolderId::new();
    h.accounts.put(fixtures::account(holder_id));

    let reservation = h
        .engine
        .reserve(ReserveRequest {
            event_id: h.event.id,
            seats: vec![SeatSelection::new(1, "silver")],
            holder_id,
            buyer: BuyerSnapshot {
                name: Some("Grace Hopper".to_string()),
                email: None,
                phone: Some("  ".to_string()),
            },
        })
        .await
        .unwrap();

    assert_eq!(reservation.buyer.name.as_deref(), Some("Grace Hopper"));
    assert_eq!(reservation.buyer.email.as_deref(), Some("holder@example.com"));
    assert_eq!(reservation.buyer.phone.as_deref(), Some("+15550199"));
}

#[tokio::test]
async fn test_storage_failure_is_reported() {
    let h = harness();
    h.store.set_fail_writes(true);

    let err = h
        .engine
        .reserve(request(&h.event, &[(1, "silver")]))
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::Storage(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_cancel_releases_seats() {
    let h = harness();
    let reservation = h
        .engine
        .reserve(request(&h.event, &[(1, "silver")]))
        .await
        .unwrap();

    let cancelled = h.engine.cancel(reservation.id).await.unwrap();
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    assert_eq!(cancelled.tickets, reservation.tickets);

    h.engine
        .reserve(request(&h.event, &[(1, "silver")]))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_cancel_twice_and_unknown() {
    let h = harness();
    let reservation = h
        .engine
        .reserve(request(&h.event, &[(1, "silver")]))
        .await
        .unwrap();
    h.engine.cancel(reservation.id).await.unwrap();

    let twice = h.engine.cancel(reservation.id).await.unwrap_err();
    assert!(matches!(twice, BookingError::InvalidInput(_)));

    let unknown = seatbook_core::types::ReservationId::new();
    assert_eq!(
        h.engine.cancel(unknown).await.unwrap_err(),
        BookingError::ReservationNotFound(unknown)
    );
}
