//! Validation service behaviour: resolution order, idempotence, cancellation
//! and image input.

#![allow(clippy::unwrap_used)]

use seatbook::{
    BookingEnvironment, QrCodeGenerator, ReservationEngine, ReserveRequest, ValidationReason,
    ValidationRequest, ValidationScope, ValidationService,
};
use seatbook_core::error::BookingError;
use seatbook_core::types::{Event, HolderId, Reservation, SeatNumber, SeatSelection};
use seatbook_testing::{
    InMemoryAccountDirectory, InMemoryReservationStore, InMemorySeatCatalog, RecordingQueue,
    fixtures, test_clock,
};
use std::sync::Arc;

struct Harness {
    engine: ReservationEngine,
    validation: ValidationService,
    catalog: InMemorySeatCatalog,
    event: Event,
}

fn harness() -> Harness {
    let event = fixtures::event(10);
    let catalog = InMemorySeatCatalog::with_events([event.clone()]);
    let env = BookingEnvironment::new(
        Arc::new(test_clock()),
        Arc::new(catalog.clone()),
        Arc::new(InMemoryAccountDirectory::new()),
        Arc::new(InMemoryReservationStore::new()),
        Arc::new(QrCodeGenerator::default()),
        Arc::new(RecordingQueue::new()),
    );
    Harness {
        engine: ReservationEngine::new(env.clone()),
        validation: ValidationService::new(env),
        catalog,
        event,
    }
}

async fn book(h: &Harness, seats: &[u32]) -> Reservation {
    h.engine
        .reserve(ReserveRequest {
            event_id: h.event.id,
            seats: seats.iter().map(|n| SeatSelection::new(*n, "silver")).collect(),
            holder_id: HolderId::new(),
            buyer: fixtures::buyer(),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_code_text_resolves_to_its_own_seat() {
    let h = harness();
    let reservation = book(&h, &[4, 5]).await;
    let code = reservation.tickets[1].code.content.as_str();

    let outcome = h.validation.validate(ValidationRequest::text(code)).await.unwrap();

    assert!(outcome.valid);
    assert_eq!(outcome.reason, ValidationReason::Valid);
    let summary = outcome.summary.unwrap();
    assert_eq!(summary.reservation_id, reservation.id);
    assert_eq!(summary.scope, ValidationScope::Seat);
    assert_eq!(summary.seats.len(), 1);
    assert_eq!(summary.seats[0].seat_number, SeatNumber::new(5));
    assert_eq!(summary.event.unwrap().title, "Summer Gala");
    assert_eq!(summary.buyer.name.as_deref(), Some("Ada Lovelace"));
}

#[tokio::test]
async fn test_reservation_id_covers_all_seats() {
    let h = harness();
    let reservation = book(&h, &[1, 2, 3]).await;

    let outcome = h
        .validation
        .validate(ValidationRequest::text(reservation.id.to_string()))
        .await
        .unwrap();

    let summary = outcome.summary.unwrap();
    assert_eq!(summary.scope, ValidationScope::Reservation);
    assert_eq!(
        summary.seats.iter().map(|s| s.seat_number).collect::<Vec<_>>(),
        reservation.seat_numbers()
    );
}

#[tokio::test]
async fn test_validation_is_idempotent() {
    let h = harness();
    let reservation = book(&h, &[1]).await;
    let request = ValidationRequest::text(reservation.tickets[0].code.content.as_str());

    let first = h.validation.validate(request.clone()).await.unwrap();
    let second = h.validation.validate(request).await.unwrap();

    assert!(first.valid);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_cancelled_is_stable() {
    let h = harness();
    let reservation = book(&h, &[1]).await;
    h.engine.cancel(reservation.id).await.unwrap();
    let request = ValidationRequest::text(reservation.tickets[0].code.content.as_str());

    for _ in 0..3 {
        let outcome = h.validation.validate(request.clone()).await.unwrap();
        assert!(!outcome.valid);
        assert_eq!(outcome.reason, ValidationReason::Cancelled);
        assert!(outcome.summary.is_some());
    }
}

#[tokio::test]
async fn test_unknown_text_is_not_found() {
    let h = harness();
    book(&h, &[1]).await;

    for text in ["tkt_nope", &uuid::Uuid::new_v4().to_string()] {
        let outcome = h.validation.validate(ValidationRequest::text(text)).await.unwrap();
        assert!(!outcome.valid);
        assert_eq!(outcome.reason, ValidationReason::NotFound);
        assert!(outcome.summary.is_none());
    }
}

#[tokio::test]
async fn test_text_is_trimmed() {
    let h = harness();
    let reservation = book(&h, &[1]).await;
    let padded = format!("  {}\n", reservation.tickets[0].code.content);

    let outcome = h.validation.validate(ValidationRequest::text(padded)).await.unwrap();
    assert!(outcome.valid);
}

#[tokio::test]
async fn test_image_round_trip() {
    let h = harness();
    let reservation = book(&h, &[7]).await;

    let outcome = h
        .validation
        .validate(ValidationRequest::image_bytes(&reservation.tickets[0].code.rendered_image))
        .await
        .unwrap();

    assert!(outcome.valid);
    let summary = outcome.summary.unwrap();
    assert_eq!(summary.reservation_id, reservation.id);
    assert_eq!(summary.seats[0].seat_number, SeatNumber::new(7));
}

#[tokio::test]
async fn test_image_of_unknown_content_is_not_found() {
    let h = harness();
    book(&h, &[1]).await;
    let stranger = QrCodeGenerator::default()
        .render(&seatbook::codes::mint_content())
        .unwrap();

    let outcome = h
        .validation
        .validate(ValidationRequest::image_bytes(&stranger))
        .await
        .unwrap();

    assert!(!outcome.valid);
    assert_eq!(outcome.reason, ValidationReason::NotFound);
}

#[tokio::test]
async fn test_unreadable_image_is_undecodable() {
    let h = harness();

    let err = h
        .validation
        .validate(ValidationRequest::image_bytes(b"definitely not a png"))
        .await
        .unwrap_err();

    assert_eq!(err, BookingError::Undecodable);
}

#[tokio::test]
async fn test_image_that_is_not_base64_is_undecodable() {
    let h = harness();

    let err = h
        .validation
        .validate(ValidationRequest {
            text: None,
            image: Some("%%%not-base64%%%".to_string()),
        })
        .await
        .unwrap_err();

    assert_eq!(err, BookingError::Undecodable);
}

#[tokio::test]
async fn test_empty_request_is_invalid() {
    let h = harness();

    let err = h
        .validation
        .validate(ValidationRequest {
            text: Some("   ".to_string()),
            image: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InvalidInput(_)));

    let err = h
        .validation
        .validate(ValidationRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InvalidInput(_)));
}

#[tokio::test]
async fn test_text_wins_over_mismatched_image() {
    let h = harness();
    let first = book(&h, &[1]).await;
    let second = book(&h, &[2]).await;

    let outcome = h
        .validation
        .validate(
            ValidationRequest::text(first.tickets[0].code.content.as_str())
                .with_image_bytes(&second.tickets[0].code.rendered_image),
        )
        .await
        .unwrap();

    assert!(outcome.valid);
    assert_eq!(outcome.summary.unwrap().reservation_id, first.id);
}

#[tokio::test]
async fn test_removed_event_still_validates() {
    let h = harness();
    let reservation = book(&h, &[1]).await;
    h.catalog.remove(h.event.id);

    let outcome = h
        .validation
        .validate(ValidationRequest::text(reservation.tickets[0].code.content.as_str()))
        .await
        .unwrap();

    assert!(outcome.valid);
    assert!(outcome.summary.unwrap().event.is_none());
}

#[tokio::test]
async fn test_text_with_garbage_image_still_validates() {
    let h = harness();
    let reservation = book(&h, &[1]).await;

    for image in ["%%%not-base64%%%", "bm90IGEgcG5n"] {
        let outcome = h
            .validation
            .validate(ValidationRequest {
                text: Some(reservation.tickets[0].code.content.to_string()),
                image: Some(image.to_string()),
            })
            .await
            .unwrap();

        assert!(outcome.valid);
        assert_eq!(outcome.reason, ValidationReason::Valid);
        assert_eq!(outcome.summary.unwrap().reservation_id, reservation.id);
    }
}
