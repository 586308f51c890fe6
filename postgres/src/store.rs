//! `PostgreSQL` reservation store.

use chrono::{DateTime, Utc};
use seatbook_core::error::StoreError;
use seatbook_core::store::{ReservationStore, StoreFuture};
use seatbook_core::types::{
    BuyerSnapshot, CodeContent, EventId, HolderId, IssuedTicket, Reservation, ReservationId,
    ReservationStatus, SeatCategory, SeatNumber, SeatSelection, TicketCode,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use uuid::Uuid;

const ACTIVE_SEAT_CONSTRAINT: &str = "reservation_seats_active_seat_unique";
const CODE_CONSTRAINT: &str = "reservation_seats_code_unique";

/// `PostgreSQL`-backed [`ReservationStore`].
///
/// A reservation is one `reservations` row plus one `reservation_seats` row
/// per seat, written in a single transaction. The partial unique index
/// `reservation_seats_active_seat_unique` on `(event_id, seat_number) WHERE
/// active` rejects a second active claim on the same seat no matter how many
/// writers race, and cancelling clears `active` so the seat can be sold again
/// while the rows stay for audit and validation.
#[derive(Clone)]
pub struct PostgresReservationStore {
    pool: PgPool,
}

impl PostgresReservationStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if migrations fail.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        crate::migrate(&self.pool).await
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn booked_seats_impl(
        &self,
        event_id: EventId,
        seats: &[SeatNumber],
    ) -> Result<Vec<SeatNumber>, StoreError> {
        let requested = seats.iter().map(|s| to_db_seat(*s)).collect::<Result<Vec<_>, _>>()?;

        let rows = sqlx::query(
            r"
            SELECT seat_number FROM reservation_seats
            WHERE event_id = $1 AND active AND seat_number = ANY($2)
            ",
        )
        .bind(*event_id.as_uuid())
        .bind(&requested)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to read booked seats: {e}")))?;

        let booked = rows
            .iter()
            .map(|row| row.try_get::<i32, _>("seat_number").map_err(decode_error))
            .collect::<Result<Vec<_>, _>>()?;

        // Preserve request order so the first conflict reported is the first seat asked for.
        Ok(seats
            .iter()
            .copied()
            .filter(|s| booked.iter().any(|b| u32::try_from(*b).is_ok_and(|b| b == s.value())))
            .collect())
    }

    async fn insert_impl(&self, reservation: Reservation) -> Result<Reservation, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Database(format!("Failed to begin transaction: {e}")))?;

        sqlx::query(
            r"
            INSERT INTO reservations (
                id, event_id, holder_id, buyer_name, buyer_email, buyer_phone, status, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(*reservation.id.as_uuid())
        .bind(*reservation.event_id.as_uuid())
        .bind(*reservation.holder_id.as_uuid())
        .bind(reservation.buyer.name.as_deref())
        .bind(reservation.buyer.email.as_deref())
        .bind(reservation.buyer.phone.as_deref())
        .bind(reservation.status.as_str())
        .bind(reservation.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to insert reservation: {e}")))?;

        for (position, ticket) in reservation.tickets.iter().enumerate() {
            let position = i32::try_from(position)
                .map_err(|_| StoreError::Serialization("too many seats".to_string()))?;

            let result = sqlx::query(
                r"
                INSERT INTO reservation_seats (
                    reservation_id, position, event_id, seat_number, category,
                    code_content, code_image, active
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE)
                ",
            )
            .bind(*reservation.id.as_uuid())
            .bind(position)
            .bind(*reservation.event_id.as_uuid())
            .bind(to_db_seat(ticket.seat.seat_number)?)
            .bind(ticket.seat.category.as_str())
            .bind(ticket.code.content.as_str())
            .bind(&ticket.code.rendered_image)
            .execute(&mut *tx)
            .await;

            if let Err(e) = result {
                // Dropping the transaction rolls it back; nothing of this reservation persists.
                drop(tx);
                return Err(self.classify_insert_error(e, &reservation).await);
            }
        }

        tx.commit().await.map_err(|e| {
            StoreError::Database(format!("Failed to commit reservation: {e}"))
        })?;

        tracing::debug!(
            reservation_id = %reservation.id,
            event_id = %reservation.event_id,
            seats = reservation.tickets.len(),
            "Reservation committed"
        );

        Ok(reservation)
    }

    async fn classify_insert_error(&self, error: sqlx::Error, reservation: &Reservation) -> StoreError {
        let constraint = match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                db.constraint().map(ToString::to_string)
            }
            _ => return StoreError::Database(format!("Failed to insert seat: {error}")),
        };

        match constraint.as_deref() {
            Some(ACTIVE_SEAT_CONSTRAINT) => {
                metrics::counter!("seatbook_store_seat_conflicts_total").increment(1);
                // Best effort: name the contested seat if the winner is visible now.
                let seat = self
                    .booked_seats_impl(reservation.event_id, &reservation.seat_numbers())
                    .await
                    .ok()
                    .and_then(|booked| booked.first().copied());
                tracing::info!(
                    event_id = %reservation.event_id,
                    seat = ?seat,
                    "Seat claim rejected by uniqueness constraint"
                );
                StoreError::SeatConflict { seat }
            }
            Some(CODE_CONSTRAINT) => StoreError::DuplicateCode,
            _ => StoreError::Database(format!("Unexpected unique violation: {error}")),
        }
    }

    async fn find_by_id_impl(&self, id: ReservationId) -> Result<Option<Reservation>, StoreError> {
        let row = sqlx::query(
            r"
            SELECT id, event_id, holder_id, buyer_name, buyer_email, buyer_phone, status, created_at
            FROM reservations
            WHERE id = $1
            ",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to load reservation: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut tickets = self.load_tickets(&[*id.as_uuid()]).await?;
        let tickets = tickets.remove(id.as_uuid()).unwrap_or_default();
        reservation_from_row(&row, tickets).map(Some)
    }

    async fn find_by_code_impl(&self, content: &str) -> Result<Option<Reservation>, StoreError> {
        let reservation_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT reservation_id FROM reservation_seats WHERE code_content = $1",
        )
        .bind(content)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to look up code: {e}")))?;

        match reservation_id {
            Some(id) => self.find_by_id_impl(ReservationId::from_uuid(id)).await,
            None => Ok(None),
        }
    }

    async fn cancel_impl(&self, id: ReservationId) -> Result<Reservation, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Database(format!("Failed to begin transaction: {e}")))?;

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM reservations WHERE id = $1 FOR UPDATE")
                .bind(*id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| StoreError::Database(format!("Failed to lock reservation: {e}")))?;

        let status = status.ok_or(StoreError::NotFound(id))?;
        let from = parse_status(&status)?;
        if !from.can_transition_to(ReservationStatus::Cancelled) {
            return Err(StoreError::InvalidTransition {
                id,
                from,
                to: ReservationStatus::Cancelled,
            });
        }

        sqlx::query("UPDATE reservations SET status = $2 WHERE id = $1")
            .bind(*id.as_uuid())
            .bind(ReservationStatus::Cancelled.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to cancel reservation: {e}")))?;

        sqlx::query("UPDATE reservation_seats SET active = FALSE WHERE reservation_id = $1")
            .bind(*id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to release seats: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Database(format!("Failed to commit cancellation: {e}")))?;

        self.find_by_id_impl(id).await?.ok_or(StoreError::NotFound(id))
    }

    async fn list_impl(&self, holder_id: Option<HolderId>) -> Result<Vec<Reservation>, StoreError> {
        let rows = sqlx::query(
            r"
            SELECT id, event_id, holder_id, buyer_name, buyer_email, buyer_phone, status, created_at
            FROM reservations
            WHERE $1::uuid IS NULL OR holder_id = $1
            ORDER BY created_at DESC, id
            ",
        )
        .bind(holder_id.map(|h| *h.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to list reservations: {e}")))?;

        let ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id").map_err(decode_error))
            .collect::<Result<Vec<_>, _>>()?;
        let mut tickets = self.load_tickets(&ids).await?;

        rows.iter()
            .zip(&ids)
            .map(|(row, id)| reservation_from_row(row, tickets.remove(id).unwrap_or_default()))
            .collect()
    }

    async fn load_tickets(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<IssuedTicket>>, StoreError> {
        let rows = sqlx::query(
            r"
            SELECT reservation_id, seat_number, category, code_content, code_image
            FROM reservation_seats
            WHERE reservation_id = ANY($1)
            ORDER BY reservation_id, position
            ",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to load seats: {e}")))?;

        let mut tickets: HashMap<Uuid, Vec<IssuedTicket>> = HashMap::new();
        for row in &rows {
            let reservation_id: Uuid = row.try_get("reservation_id").map_err(decode_error)?;
            let seat_number: i32 = row.try_get("seat_number").map_err(decode_error)?;
            let seat_number = u32::try_from(seat_number)
                .map_err(|_| StoreError::Serialization(format!("negative seat {seat_number}")))?;
            let category: String = row.try_get("category").map_err(decode_error)?;
            let content: String = row.try_get("code_content").map_err(decode_error)?;
            let image: Vec<u8> = row.try_get("code_image").map_err(decode_error)?;

            tickets.entry(reservation_id).or_default().push(IssuedTicket {
                seat: SeatSelection::new(seat_number, SeatCategory::new(category)),
                code: TicketCode {
                    content: CodeContent::new(content),
                    rendered_image: image,
                },
            });
        }
        Ok(tickets)
    }
}

fn to_db_seat(seat: SeatNumber) -> Result<i32, StoreError> {
    i32::try_from(seat.value())
        .map_err(|_| StoreError::Serialization(format!("seat {seat} exceeds column range")))
}

fn decode_error(error: sqlx::Error) -> StoreError {
    StoreError::Serialization(format!("Failed to decode row: {error}"))
}

fn parse_status(status: &str) -> Result<ReservationStatus, StoreError> {
    ReservationStatus::parse(status)
        .ok_or_else(|| StoreError::Serialization(format!("Invalid reservation status: {status}")))
}

fn reservation_from_row(row: &PgRow, tickets: Vec<IssuedTicket>) -> Result<Reservation, StoreError> {
    let id: Uuid = row.try_get("id").map_err(decode_error)?;
    let event_id: Uuid = row.try_get("event_id").map_err(decode_error)?;
    let holder_id: Uuid = row.try_get("holder_id").map_err(decode_error)?;
    let status: String = row.try_get("status").map_err(decode_error)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode_error)?;

    Ok(Reservation {
        id: ReservationId::from_uuid(id),
        event_id: EventId::from_uuid(event_id),
        holder_id: HolderId::from_uuid(holder_id),
        tickets,
        buyer: BuyerSnapshot {
            name: row.try_get("buyer_name").map_err(decode_error)?,
            email: row.try_get("buyer_email").map_err(decode_error)?,
            phone: row.try_get("buyer_phone").map_err(decode_error)?,
        },
        status: parse_status(&status)?,
        created_at,
    })
}

impl ReservationStore for PostgresReservationStore {
    fn booked_seats<'a>(
        &'a self,
        event_id: EventId,
        seats: &'a [SeatNumber],
    ) -> StoreFuture<'a, Vec<SeatNumber>> {
        Box::pin(self.booked_seats_impl(event_id, seats))
    }

    fn insert(&self, reservation: Reservation) -> StoreFuture<'_, Reservation> {
        Box::pin(self.insert_impl(reservation))
    }

    fn find_by_id(&self, id: ReservationId) -> StoreFuture<'_, Option<Reservation>> {
        Box::pin(self.find_by_id_impl(id))
    }

    fn find_by_code<'a>(&'a self, content: &'a str) -> StoreFuture<'a, Option<Reservation>> {
        Box::pin(self.find_by_code_impl(content))
    }

    fn cancel(&self, id: ReservationId) -> StoreFuture<'_, Reservation> {
        Box::pin(self.cancel_impl(id))
    }

    fn list_by_holder(&self, holder_id: HolderId) -> StoreFuture<'_, Vec<Reservation>> {
        Box::pin(self.list_impl(Some(holder_id)))
    }

    fn list_all(&self) -> StoreFuture<'_, Vec<Reservation>> {
        Box::pin(self.list_impl(None))
    }
}
