//! Holder overview and administrative listing.

#![allow(clippy::unwrap_used)]

use seatbook::{
    BookingEnvironment, QrCodeGenerator, ReservationEngine, ReservationQueries, ReserveRequest,
};
use seatbook_core::types::{
    BuyerSnapshot, Event, HolderId, Reservation, ReservationStatus, SeatNumber, SeatSelection,
};
use seatbook_testing::{
    InMemoryAccountDirectory, InMemoryReservationStore, InMemorySeatCatalog, RecordingQueue,
    fixtures, mocks::FixedClock,
};
use std::sync::Arc;

struct Harness {
    engine: ReservationEngine,
    queries: ReservationQueries,
    catalog: InMemorySeatCatalog,
    accounts: InMemoryAccountDirectory,
}

/// Each harness gets a real clock so `created_at` orders bookings.
fn harness(events: &[Event]) -> Harness {
    let catalog = InMemorySeatCatalog::with_events(events.iter().cloned());
    let accounts = InMemoryAccountDirectory::new();
    let env = BookingEnvironment::new(
        Arc::new(seatbook_core::environment::SystemClock),
        Arc::new(catalog.clone()),
        Arc::new(accounts.clone()),
        Arc::new(InMemoryReservationStore::new()),
        Arc::new(QrCodeGenerator::new(2, true)),
        Arc::new(RecordingQueue::new()),
    );
    Harness {
        engine: ReservationEngine::new(env.clone()),
        queries: ReservationQueries::new(env),
        catalog,
        accounts,
    }
}

async fn book(
    h: &Harness,
    event: &Event,
    holder_id: HolderId,
    seats: &[u32],
    buyer: BuyerSnapshot,
) -> Reservation {
    h.engine
        .reserve(ReserveRequest {
            event_id: event.id,
            seats: seats.iter().map(|n| SeatSelection::new(*n, "premium")).collect(),
            holder_id,
            buyer,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_holder_overview_groups_by_event_newest_first() {
    let older_event = fixtures::event(10);
    let newer_event = fixtures::event(10);
    let h = harness(&[older_event.clone(), newer_event.clone()]);
    let holder = HolderId::new();

    book(&h, &older_event, holder, &[1], fixtures::buyer()).await;
    book(&h, &older_event, holder, &[2, 3], fixtures::buyer()).await;
    book(&h, &newer_event, holder, &[5], fixtures::buyer()).await;
    let cancelled = book(&h, &older_event, holder, &[9], fixtures::buyer()).await;
    h.engine.cancel(cancelled.id).await.unwrap();
    book(&h, &older_event, HolderId::new(), &[4], fixtures::buyer()).await;

    let overview = h.queries.booked_events_for_holder(holder).await.unwrap();

    assert_eq!(overview.len(), 2);
    // The most recent booking (event B) comes before event A.
    assert_eq!(overview[0].event.id, newer_event.id);
    assert_eq!(overview[0].seats.len(), 1);
    assert_eq!(overview[1].event.id, older_event.id);
    let mut seats: Vec<SeatNumber> = overview[1].seats.iter().map(|s| s.seat_number).collect();
    seats.sort();
    assert_eq!(seats, vec![SeatNumber::new(1), SeatNumber::new(2), SeatNumber::new(3)]);
    assert_eq!(overview[1].codes.len(), 3);
}

#[tokio::test]
async fn test_holder_overview_skips_removed_events() {
    let kept = fixtures::event(10);
    let removed = fixtures::event(10);
    let h = harness(&[kept.clone(), removed.clone()]);
    let holder = HolderId::new();

    book(&h, &kept, holder, &[1], fixtures::buyer()).await;
    book(&h, &removed, holder, &[1], fixtures::buyer()).await;
    h.catalog.remove(removed.id);

    let overview = h.queries.booked_events_for_holder(holder).await.unwrap();
    assert_eq!(overview.len(), 1);
    assert_eq!(overview[0].event.id, kept.id);
}

#[tokio::test]
async fn test_listing_includes_every_status_with_buyer_fallback() {
    let event = fixtures::event(10);
    let h = harness(std::slice::from_ref(&event));
    let holder = HolderId::new();

    let partial = book(
        &h,
        &event,
        holder,
        &[1],
        BuyerSnapshot {
            name: Some("Snapshot Name".to_string()),
            email: None,
            phone: None,
        },
    )
    .await;
    let full = book(&h, &event, HolderId::new(), &[2], fixtures::buyer()).await;
    h.engine.cancel(full.id).await.unwrap();

    // The account shows up after booking; it only fills the missing fields.
    h.accounts.put(fixtures::account(holder));

    let listing = h.queries.list_all_reservations().await.unwrap();
    assert_eq!(listing.len(), 2);

    let row = listing.iter().find(|r| r.reservation_id == partial.id).unwrap();
    assert_eq!(row.status, ReservationStatus::Booked);
    assert_eq!(row.buyer.name.as_deref(), Some("Snapshot Name"));
    assert_eq!(row.buyer.email.as_deref(), Some("holder@example.com"));
    assert_eq!(row.event.as_ref().unwrap().title, "Summer Gala");
    assert_eq!(row.codes.len(), 1);

    let row = listing.iter().find(|r| r.reservation_id == full.id).unwrap();
    assert_eq!(row.status, ReservationStatus::Cancelled);
    assert_eq!(row.buyer, fixtures::buyer());
}

#[tokio::test]
async fn test_listing_is_newest_first_with_fixed_clock() {
    let event = fixtures::event(10);
    let catalog = InMemorySeatCatalog::with_events([event.clone()]);
    let env = BookingEnvironment::new(
        Arc::new(FixedClock::new(chrono::Utc::now())),
        Arc::new(catalog),
        Arc::new(InMemoryAccountDirectory::new()),
        Arc::new(InMemoryReservationStore::new()),
        Arc::new(QrCodeGenerator::new(2, true)),
        Arc::new(RecordingQueue::new()),
    );
    let engine = ReservationEngine::new(env.clone());
    let queries = ReservationQueries::new(env);

    let mut ids = Vec::new();
    for seat in 1..=3 {
        let reservation = engine
            .reserve(ReserveRequest {
                event_id: event.id,
                seats: vec![SeatSelection::new(seat, "silver")],
                holder_id: HolderId::new(),
                buyer: fixtures::buyer(),
            })
            .await
            .unwrap();
        ids.push(reservation.id);
    }
    ids.reverse();

    // Equal timestamps fall back to insertion order.
    let listed: Vec<_> = queries
        .list_all_reservations()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.reservation_id)
        .collect();
    assert_eq!(listed, ids);
}
