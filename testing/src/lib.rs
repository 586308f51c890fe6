//! # Seatbook Testing
//!
//! Testing utilities for the reservation engine.
//!
//! This crate provides:
//! - In-memory implementations of every injected trait (catalog, account
//!   directory, reservation store, notification queue, delivery channel)
//! - A fixed clock for deterministic timestamps
//! - Fixtures and proptest strategies for events and seat selections
//!
//! ## Example
//!
//! ```ignore
//! use seatbook_testing::{InMemoryReservationStore, InMemorySeatCatalog, fixtures};
//!
//! #[tokio::test]
//! async fn test_booking_flow() {
//!     let event = fixtures::event(10);
//!     let catalog = InMemorySeatCatalog::with_events([event.clone()]);
//!     let store = InMemoryReservationStore::new();
//!     // build the engine with these and book seats ...
//! }
//! ```

use chrono::{DateTime, Utc};
use seatbook_core::environment::Clock;

mod catalog_mocks;
mod notification_mocks;
mod store_mocks;

pub use catalog_mocks::{InMemoryAccountDirectory, InMemorySeatCatalog};
pub use notification_mocks::{Reach, RecordingQueue, ScriptedChannel};
pub use store_mocks::InMemoryReservationStore;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use seatbook_testing::mocks::FixedClock;
    /// use seatbook_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse, which cannot happen.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Ready-made domain values.
pub mod fixtures {
    use chrono::{TimeZone, Utc};
    use seatbook_core::types::{AccountContact, BuyerSnapshot, Event, EventId, HolderId, SeatCategory};

    /// An event with `total_seats` seats and the default categories.
    #[must_use]
    pub fn event(total_seats: u32) -> Event {
        Event {
            id: EventId::new(),
            title: "Summer Gala".to_string(),
            description: "An evening of music".to_string(),
            date: Utc.with_ymd_and_hms(2025, 7, 1, 19, 30, 0).single().unwrap_or_default(),
            location: "Main Hall".to_string(),
            image_url: Some("https://img.example.com/gala.png".to_string()),
            total_seats,
            categories: SeatCategory::default_set(),
        }
    }

    /// A complete buyer snapshot.
    #[must_use]
    pub fn buyer() -> BuyerSnapshot {
        BuyerSnapshot::new("Ada Lovelace", "ada@example.com", "+15550100")
    }

    /// A live account record for `holder_id`.
    #[must_use]
    pub fn account(holder_id: HolderId) -> AccountContact {
        AccountContact {
            holder_id,
            name: "Account Holder".to_string(),
            email: "holder@example.com".to_string(),
            phone: Some("+15550199".to_string()),
        }
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use seatbook_core::types::{SeatCategory, SeatSelection};
    use std::collections::BTreeSet;

    /// A non-empty set of distinct seat numbers in `[1, total_seats]`.
    pub fn seat_numbers(total_seats: u32, max_len: usize) -> impl Strategy<Value = BTreeSet<u32>> {
        proptest::collection::btree_set(1..=total_seats, 1..=max_len)
    }

    /// Seat selections for `numbers`, all in the silver category.
    #[must_use]
    pub fn silver_selections(numbers: &BTreeSet<u32>) -> Vec<SeatSelection> {
        numbers
            .iter()
            .map(|n| SeatSelection::new(*n, SeatCategory::SILVER))
            .collect()
    }
}

/// Install a test tracing subscriber honouring `RUST_LOG`.
///
/// Safe to call from many tests; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn test_fixture_event_offers_default_categories() {
        let event = fixtures::event(5);
        assert_eq!(event.total_seats, 5);
        assert!(event.offers(&"silver".into()));
    }
}
