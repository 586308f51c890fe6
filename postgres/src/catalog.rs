//! Read views over the `events` and `accounts` tables.

use seatbook_core::catalog::{AccountDirectory, CatalogFuture, SeatCatalog};
use seatbook_core::error::CatalogError;
use seatbook_core::types::{AccountContact, Event, EventId, HolderId, SeatCategory};
use sqlx::{PgPool, Row};
use std::collections::BTreeSet;
use uuid::Uuid;

/// `PostgreSQL`-backed [`SeatCatalog`].
#[derive(Clone)]
pub struct PostgresSeatCatalog {
    pool: PgPool,
}

impl PostgresSeatCatalog {
    /// Create a catalog over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or replace an event (seeding for tests and demos).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Backend`] if the write fails or
    /// [`CatalogError::Malformed`] if the capacity does not fit the column.
    pub async fn upsert_event(&self, event: &Event) -> Result<(), CatalogError> {
        let total_seats = i32::try_from(event.total_seats)
            .map_err(|_| CatalogError::Malformed(format!("capacity {}", event.total_seats)))?;
        let categories: Vec<String> = event.categories.iter().map(|c| c.as_str().to_string()).collect();

        sqlx::query(
            r"
            INSERT INTO events (id, title, description, event_date, location, image_url, total_seats, categories)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                event_date = EXCLUDED.event_date,
                location = EXCLUDED.location,
                image_url = EXCLUDED.image_url,
                total_seats = EXCLUDED.total_seats,
                categories = EXCLUDED.categories
            ",
        )
        .bind(*event.id.as_uuid())
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.date)
        .bind(&event.location)
        .bind(event.image_url.as_deref())
        .bind(total_seats)
        .bind(&categories)
        .execute(&self.pool)
        .await
        .map_err(|e| CatalogError::Backend(format!("Failed to upsert event: {e}")))?;
        Ok(())
    }

    async fn get_event_impl(&self, id: EventId) -> Result<Option<Event>, CatalogError> {
        let row = sqlx::query(
            r"
            SELECT id, title, description, event_date, location, image_url, total_seats, categories
            FROM events
            WHERE id = $1
            ",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CatalogError::Backend(format!("Failed to load event: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let malformed = |e: sqlx::Error| CatalogError::Malformed(e.to_string());
        let total_seats: i32 = row.try_get("total_seats").map_err(malformed)?;
        let total_seats = u32::try_from(total_seats)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| CatalogError::Malformed(format!("event {id} has capacity {total_seats}")))?;

        let labels: Vec<String> = row.try_get("categories").map_err(malformed)?;
        let mut categories: BTreeSet<SeatCategory> = labels.into_iter().map(SeatCategory::new).collect();
        if categories.is_empty() {
            categories = SeatCategory::default_set();
        }

        let event_id: Uuid = row.try_get("id").map_err(malformed)?;
        Ok(Some(Event {
            id: EventId::from_uuid(event_id),
            title: row.try_get("title").map_err(malformed)?,
            description: row.try_get("description").map_err(malformed)?,
            date: row.try_get("event_date").map_err(malformed)?,
            location: row.try_get("location").map_err(malformed)?,
            image_url: row.try_get("image_url").map_err(malformed)?,
            total_seats,
            categories,
        }))
    }
}

impl SeatCatalog for PostgresSeatCatalog {
    fn get_event(&self, id: EventId) -> CatalogFuture<'_, Option<Event>> {
        Box::pin(self.get_event_impl(id))
    }
}

/// `PostgreSQL`-backed [`AccountDirectory`].
#[derive(Clone)]
pub struct PostgresAccountDirectory {
    pool: PgPool,
}

impl PostgresAccountDirectory {
    /// Create a directory over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or replace an account (seeding for tests and demos).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Backend`] if the write fails.
    pub async fn upsert_account(&self, account: &AccountContact) -> Result<(), CatalogError> {
        sqlx::query(
            r"
            INSERT INTO accounts (holder_id, name, email, phone)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (holder_id) DO UPDATE SET
                name = EXCLUDED.name, email = EXCLUDED.email, phone = EXCLUDED.phone
            ",
        )
        .bind(*account.holder_id.as_uuid())
        .bind(&account.name)
        .bind(&account.email)
        .bind(account.phone.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| CatalogError::Backend(format!("Failed to upsert account: {e}")))?;
        Ok(())
    }

    async fn get_account_impl(&self, holder_id: HolderId) -> Result<Option<AccountContact>, CatalogError> {
        let row = sqlx::query("SELECT name, email, phone FROM accounts WHERE holder_id = $1")
            .bind(*holder_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CatalogError::Backend(format!("Failed to load account: {e}")))?;

        row.map(|row| {
            let malformed = |e: sqlx::Error| CatalogError::Malformed(e.to_string());
            Ok(AccountContact {
                holder_id,
                name: row.try_get("name").map_err(malformed)?,
                email: row.try_get("email").map_err(malformed)?,
                phone: row.try_get("phone").map_err(malformed)?,
            })
        })
        .transpose()
    }
}

impl AccountDirectory for PostgresAccountDirectory {
    fn get_account(&self, holder_id: HolderId) -> CatalogFuture<'_, Option<AccountContact>> {
        Box::pin(self.get_account_impl(holder_id))
    }
}
