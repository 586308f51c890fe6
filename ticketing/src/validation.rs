//! Validation of presented tickets at entry checkpoints.
//!
//! Validation is read-only. Presenting the same code twice yields the same
//! answer twice; there is no "used" state.

use crate::codes;
use crate::environment::BookingEnvironment;
use crate::metrics;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use seatbook_core::error::BookingError;
use seatbook_core::types::{
    BuyerSnapshot, EventDetails, Reservation, ReservationId, ReservationStatus, SeatSelection,
};
use serde::{Deserialize, Serialize};

/// Inbound validation payload.
///
/// Usually exactly one field is set. `image` is base64, optionally with a
/// `data:image/...;base64,` prefix as produced by browser canvases.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRequest {
    /// Code content or reservation ID as typed or scanned
    pub text: Option<String>,
    /// Base64-encoded image of a code
    pub image: Option<String>,
}

impl ValidationRequest {
    /// Request carrying only text.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            image: None,
        }
    }

    /// Request carrying only an image.
    #[must_use]
    pub fn image_bytes(bytes: &[u8]) -> Self {
        Self {
            text: None,
            image: Some(STANDARD.encode(bytes)),
        }
    }

    /// Attach an image to this request.
    #[must_use]
    pub fn with_image_bytes(mut self, bytes: &[u8]) -> Self {
        self.image = Some(STANDARD.encode(bytes));
        self
    }
}

/// Why a validation came out the way it did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationReason {
    /// Booked reservation; admit
    Valid,
    /// No reservation for the presented code
    NotFound,
    /// Reservation exists but was cancelled
    Cancelled,
}

impl ValidationReason {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::NotFound => "not_found",
            Self::Cancelled => "cancelled",
        }
    }

    const fn for_status(status: ReservationStatus) -> Self {
        match status {
            ReservationStatus::Booked => Self::Valid,
            ReservationStatus::Cancelled => Self::Cancelled,
        }
    }
}

/// What the presented value identified.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationScope {
    /// A reservation ID: covers every seat
    Reservation,
    /// A single code: covers its own seat only
    Seat,
}

/// Display-ready summary returned with a resolved ticket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSummary {
    /// Reservation the code belongs to
    pub reservation_id: ReservationId,
    /// Current status
    pub status: ReservationStatus,
    /// Event details, absent if the event left the catalog
    pub event: Option<EventDetails>,
    /// Seats covered by the presented value
    pub seats: Vec<SeatSelection>,
    /// Buyer, snapshot first with live account fallback
    pub buyer: BuyerSnapshot,
    /// Whether `seats` is the whole reservation or one seat
    pub scope: ValidationScope,
    /// Commit timestamp
    pub created_at: DateTime<Utc>,
}

/// Result of [`ValidationService::validate`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Admit or refuse
    pub valid: bool,
    /// Present whenever a reservation was resolved, valid or not
    pub summary: Option<TicketSummary>,
    /// Explanation for `valid`
    pub reason: ValidationReason,
}

impl ValidationOutcome {
    fn not_found() -> Self {
        Self {
            valid: false,
            summary: None,
            reason: ValidationReason::NotFound,
        }
    }
}

/// Resolves presented codes to reservations.
#[derive(Clone)]
pub struct ValidationService {
    env: BookingEnvironment,
}

impl ValidationService {
    /// Creates a new `ValidationService`
    #[must_use]
    pub const fn new(env: BookingEnvironment) -> Self {
        Self { env }
    }

    /// Validate a presented ticket.
    ///
    /// Non-empty text wins over an image. Text shaped like a reservation ID is
    /// looked up as one first, then as code content. An image supplied next
    /// to text is only cross-checked; a mismatch is logged, not fatal.
    ///
    /// # Errors
    ///
    /// - [`BookingError::InvalidInput`]: neither field usable
    /// - [`BookingError::Undecodable`]: image-only request with no readable code,
    ///   including payloads that are not base64
    /// - [`BookingError::Storage`]: the store failed
    #[tracing::instrument(
        skip(self, request),
        fields(has_text = request.text.is_some(), has_image = request.image.is_some())
    )]
    pub async fn validate(
        &self,
        request: ValidationRequest,
    ) -> Result<ValidationOutcome, BookingError> {
        let result = self.try_validate(request).await;
        match &result {
            Ok(outcome) => {
                metrics::record_validation(outcome.reason.as_str());
                tracing::debug!(reason = outcome.reason.as_str(), "Ticket validated");
            }
            Err(e) => {
                metrics::record_validation(e.kind().as_str());
                tracing::debug!(error = %e, "Validation rejected");
            }
        }
        result
    }

    async fn try_validate(
        &self,
        request: ValidationRequest,
    ) -> Result<ValidationOutcome, BookingError> {
        let text = request
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned);
        let (key, cross_check) = match (text, request.image.as_deref()) {
            (Some(text), image) => (text, image),
            (None, Some(payload)) => {
                let content = decode_base64(payload)
                    .ok()
                    .and_then(|bytes| codes::decode_image(&bytes).ok().flatten())
                    .ok_or(BookingError::Undecodable)?;
                (content, None)
            }
            (None, None) => {
                return Err(BookingError::InvalidInput(
                    "either text or image must be provided".to_string(),
                ));
            }
        };

        let Some((reservation, scope)) = self.resolve(&key).await? else {
            return Ok(ValidationOutcome::not_found());
        };

        if let Some(payload) = cross_check {
            check_image_matches(&reservation, payload);
        }

        let reason = ValidationReason::for_status(reservation.status);
        let summary = self.summarize(reservation, &key, scope).await;
        Ok(ValidationOutcome {
            valid: reason == ValidationReason::Valid,
            summary: Some(summary),
            reason,
        })
    }

    async fn resolve(
        &self,
        key: &str,
    ) -> Result<Option<(Reservation, ValidationScope)>, BookingError> {
        if let Some(id) = ReservationId::parse(key) {
            if let Some(reservation) = self.env.store.find_by_id(id).await? {
                return Ok(Some((reservation, ValidationScope::Reservation)));
            }
        }
        Ok(self
            .env
            .store
            .find_by_code(key)
            .await?
            .map(|reservation| (reservation, ValidationScope::Seat)))
    }

    async fn summarize(
        &self,
        reservation: Reservation,
        key: &str,
        scope: ValidationScope,
    ) -> TicketSummary {
        let seats = match scope {
            ValidationScope::Reservation => reservation.seats().cloned().collect(),
            ValidationScope::Seat => reservation
                .ticket_for_code(key)
                .map(|ticket| vec![ticket.seat.clone()])
                .unwrap_or_default(),
        };
        let event = self
            .env
            .event_or_none(reservation.event_id)
            .await
            .map(|e| e.details());
        let account = self.env.account_or_none(reservation.holder_id).await;

        TicketSummary {
            reservation_id: reservation.id,
            status: reservation.status,
            event,
            seats,
            buyer: reservation.buyer.with_account_fallback(account.as_ref()),
            scope,
            created_at: reservation.created_at,
        }
    }
}

/// Decode base64 image payload, tolerating a data URL prefix.
fn decode_base64(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = payload.trim();
    let data = match payload.split_once(',') {
        Some((header, data)) if header.starts_with("data:") => data,
        _ => payload,
    };
    STANDARD.decode(data)
}

/// Warn when a presented image does not belong to the resolved reservation.
fn check_image_matches(reservation: &Reservation, payload: &str) {
    let bytes = match decode_base64(payload) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                reservation_id = %reservation.id,
                error = %e,
                "Presented image is not valid base64"
            );
            return;
        }
    };
    let bytes = bytes.as_slice();
    let byte_match = reservation.codes().any(|c| c.rendered_image == bytes);
    if byte_match {
        return;
    }
    match codes::decode_image(bytes) {
        Ok(Some(content)) if reservation.ticket_for_code(&content).is_some() => {}
        Ok(decoded) => tracing::warn!(
            reservation_id = %reservation.id,
            decoded = decoded.is_some(),
            "Presented image does not match any stored code"
        ),
        Err(e) => tracing::warn!(
            reservation_id = %reservation.id,
            error = %e,
            "Presented image could not be read"
        ),
    }
}
