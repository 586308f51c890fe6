//! `PostgreSQL` adapters for Seatbook.
//!
//! - [`PostgresReservationStore`]: durable reservations and ticket codes. Seat
//!   exclusivity is enforced by a partial unique index over active seat claims,
//!   so it holds across any number of service processes.
//! - [`PostgresSeatCatalog`] and [`PostgresAccountDirectory`]: read views over
//!   the `events` and `accounts` tables.
//!
//! # Example
//!
//! ```ignore
//! use seatbook_postgres::{PostgresReservationStore, connect};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = connect("postgres://localhost/seatbook", 10).await?;
//!     let store = PostgresReservationStore::new(pool);
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod catalog;
mod store;

pub use catalog::{PostgresAccountDirectory, PostgresSeatCatalog};
pub use store::PostgresReservationStore;

use seatbook_core::error::StoreError;
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Open a connection pool.
///
/// # Errors
///
/// Returns [`StoreError::Database`] if the database is unreachable.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to connect: {e}")))
}

/// Run the bundled migrations.
///
/// # Errors
///
/// Returns [`StoreError::Database`] if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))
}
