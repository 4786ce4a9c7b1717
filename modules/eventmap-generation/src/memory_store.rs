// In-memory implementations of EventStore and UserStore.
//
// Back the CLI and the test suite. State lives behind std RwLocks; a poisoned
// lock is recovered rather than propagated since every write is a single
// map operation.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{bail, Result};
use async_trait::async_trait;
use uuid::Uuid;

use eventmap_common::{Event, EventMapError, UserProfile, ViewportGeometry};

use crate::traits::{EventStore, UserStore};

// ---------------------------------------------------------------------------
// InMemoryEventStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryEventStore {
    events: RwLock<HashMap<Uuid, Event>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: impl IntoIterator<Item = Event>) -> Self {
        let store = Self::new();
        store
            .write()
            .extend(events.into_iter().map(|e| (e.id, e)));
        store
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// All stored events, ordered by start time then title.
    pub fn snapshot(&self) -> Vec<Event> {
        let mut events: Vec<Event> = self.read().values().cloned().collect();
        events.sort_by(|a, b| {
            a.starts_at
                .cmp(&b.starts_at)
                .then_with(|| a.title.cmp(&b.title))
                .then_with(|| a.id.cmp(&b.id))
        });
        events
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, Event>> {
        self.events.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, Event>> {
        self.events.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn events_in_viewport(&self, viewport: &ViewportGeometry) -> Result<Vec<Event>> {
        Ok(self
            .read()
            .values()
            .filter(|e| viewport.contains(&e.location))
            .cloned()
            .collect())
    }

    async fn count_in_viewport(&self, viewport: &ViewportGeometry) -> Result<usize> {
        Ok(self
            .read()
            .values()
            .filter(|e| viewport.contains(&e.location))
            .count())
    }

    fn new_id(&self) -> Uuid {
        Uuid::new_v4()
    }

    async fn add(&self, event: &Event) -> Result<()> {
        let mut events = self.write();
        if events.contains_key(&event.id) {
            bail!("event {} already exists", event.id);
        }
        events.insert(event.id, event.clone());
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<()> {
        match self.write().remove(&id) {
            Some(_) => Ok(()),
            None => Err(EventMapError::EventNotFound(id).into()),
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<Event>> {
        Ok(self.read().get(&id).cloned())
    }
}

// ---------------------------------------------------------------------------
// InMemoryUserStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, UserProfile>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, profile: UserProfile) -> Self {
        self.insert(profile);
        self
    }

    pub fn insert(&self, profile: UserProfile) {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(profile.id.clone(), profile);
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_user(&self, uid: &str) -> Result<UserProfile> {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uid)
            .cloned()
            .ok_or_else(|| EventMapError::UserNotFound(uid.to_string()).into())
    }
}
