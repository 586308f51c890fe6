//! In-memory seat catalog and account directory.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use seatbook_core::catalog::{AccountDirectory, CatalogFuture, SeatCatalog};
use seatbook_core::error::CatalogError;
use seatbook_core::types::{AccountContact, Event, EventId, HolderId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// `HashMap`-backed [`SeatCatalog`].
///
/// Cloning shares the underlying map, so a test can keep a handle and
/// remove events after the engine has been built.
#[derive(Clone, Debug, Default)]
pub struct InMemorySeatCatalog {
    events: Arc<RwLock<HashMap<EventId, Event>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemorySeatCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog pre-populated with `events`
    #[must_use]
    pub fn with_events(events: impl IntoIterator<Item = Event>) -> Self {
        let catalog = Self::new();
        for event in events {
            catalog.put(event);
        }
        catalog
    }

    /// Insert or replace an event
    pub fn put(&self, event: Event) {
        self.events.write().unwrap().insert(event.id, event);
    }

    /// Remove an event, as if the catalog had deleted it
    pub fn remove(&self, id: EventId) {
        self.events.write().unwrap().remove(&id);
    }

    /// Make every lookup fail with [`CatalogError::Backend`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl SeatCatalog for InMemorySeatCatalog {
    fn get_event(&self, id: EventId) -> CatalogFuture<'_, Option<Event>> {
        Box::pin(async move {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(CatalogError::Backend("catalog unavailable".to_string()));
            }
            Ok(self.events.read().unwrap().get(&id).cloned())
        })
    }
}

/// `HashMap`-backed [`AccountDirectory`].
#[derive(Clone, Debug, Default)]
pub struct InMemoryAccountDirectory {
    accounts: Arc<RwLock<HashMap<HolderId, AccountContact>>>,
}

impl InMemoryAccountDirectory {
    /// Create an empty directory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an account
    pub fn put(&self, account: AccountContact) {
        self.accounts.write().unwrap().insert(account.holder_id, account);
    }

    /// Remove an account
    pub fn remove(&self, holder_id: HolderId) {
        self.accounts.write().unwrap().remove(&holder_id);
    }
}

impl AccountDirectory for InMemoryAccountDirectory {
    fn get_account(&self, holder_id: HolderId) -> CatalogFuture<'_, Option<AccountContact>> {
        Box::pin(async move { Ok(self.accounts.read().unwrap().get(&holder_id).cloned()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[tokio::test]
    async fn test_catalog_put_get_remove() {
        let event = fixtures::event(3);
        let catalog = InMemorySeatCatalog::with_events([event.clone()]);

        assert_eq!(catalog.get_event(event.id).await.unwrap(), Some(event.clone()));
        catalog.remove(event.id);
        assert_eq!(catalog.get_event(event.id).await.unwrap(), None);
    }

    #[test]
    fn test_catalog_unavailable() {
        let catalog = InMemorySeatCatalog::new();
        catalog.set_unavailable(true);
        assert!(tokio_test::block_on(catalog.get_event(EventId::new())).is_err());
    }

    #[test]
    fn test_directory_put_remove() {
        let directory = InMemoryAccountDirectory::new();
        let account = fixtures::account(HolderId::new());
        directory.put(account.clone());
        assert_eq!(
            tokio_test::block_on(directory.get_account(account.holder_id)).unwrap(),
            Some(account.clone())
        );
        directory.remove(account.holder_id);
        assert_eq!(
            tokio_test::block_on(directory.get_account(account.holder_id)).unwrap(),
            None
        );
    }
}
