// Test doubles for the generation orchestrator.
//
// One mock per trait boundary plus failure variants:
// - MockGenerator (EventGenerator) returns scripted events and records requests
// - FailingGenerator (EventGenerator) always errors
// - RecordingUserStore (UserStore) wraps InMemoryUserStore and counts lookups
// - FlakyEventStore (EventStore) wraps InMemoryEventStore, fails the Nth add
//
// Plus fixtures for events, profiles and viewports.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use uuid::Uuid;

use eventmap_common::{
    Event, EventSource, GeoPoint, PolicyConfig, UserProfile, ViewportGeometry,
};

use crate::memory_store::{InMemoryEventStore, InMemoryUserStore};
use crate::policy::PassiveAiGenPolicy;
use crate::traits::{EventGenerator, EventStore, GenerationRequest, UserStore};

// ---------------------------------------------------------------------------
// Test constants
// ---------------------------------------------------------------------------

/// Downtown Minneapolis.
pub const MINNEAPOLIS: (f64, f64) = (44.9778, -93.2650);
/// Duluth, MN.
pub const DULUTH: (f64, f64) = (46.7867, -92.1005);

pub const TEST_USER_ID: &str = "user-1";

/// Far enough past any cooldown used in tests.
pub const LATE_NOW_MS: i64 = 10_000_000_000;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn test_policy() -> PassiveAiGenPolicy {
    PassiveAiGenPolicy::new(PolicyConfig::default())
}

pub fn test_user() -> UserProfile {
    UserProfile::new(TEST_USER_ID, "Test User")
        .with_interests(["live-music", "food"])
        .with_home(GeoPoint::new(MINNEAPOLIS.0, MINNEAPOLIS.1))
}

pub fn viewport_at(center: (f64, f64), radius_km: f64) -> ViewportGeometry {
    ViewportGeometry::new(center.0, center.1, radius_km)
}

pub fn event_at(title: &str, lat: f64, lng: f64) -> Event {
    Event {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: format!("{title} description"),
        starts_at: Utc.with_ymd_and_hms(2026, 6, 5, 19, 0, 0).unwrap(),
        tags: BTreeSet::new(),
        location: GeoPoint::new(lat, lng),
        location_name: None,
        source: EventSource::Organic,
    }
}

/// The canonical candidate used by orchestrator tests.
pub fn fake_rock_concert() -> Event {
    Event {
        id: Uuid::new_v4(),
        title: "Fake Rock Concert".to_string(),
        description: "Loud guitars under the stars".to_string(),
        starts_at: Utc.with_ymd_and_hms(2026, 6, 6, 20, 30, 0).unwrap(),
        tags: ["live-music", "rock"].iter().map(|s| s.to_string()).collect(),
        location: GeoPoint::new(MINNEAPOLIS.0 + 0.001, MINNEAPOLIS.1 + 0.001),
        location_name: Some("Loring Park".to_string()),
        source: EventSource::AiGenerated,
    }
}

// ---------------------------------------------------------------------------
// MockGenerator
// ---------------------------------------------------------------------------

/// Returns the same scripted candidates on every call.
pub struct MockGenerator {
    events: Vec<Event>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerator {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventGenerator for MockGenerator {
    async fn generate_events(&self, request: &GenerationRequest) -> Result<Vec<Event>> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.events.clone())
    }
}

// ---------------------------------------------------------------------------
// FailingGenerator
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FailingGenerator {
    calls: AtomicUsize,
}

impl FailingGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventGenerator for FailingGenerator {
    async fn generate_events(&self, _request: &GenerationRequest) -> Result<Vec<Event>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        bail!("FailingGenerator: upstream returned malformed payload")
    }
}

// ---------------------------------------------------------------------------
// RecordingUserStore
// ---------------------------------------------------------------------------

pub struct RecordingUserStore {
    inner: InMemoryUserStore,
    lookups: AtomicUsize,
}

impl RecordingUserStore {
    pub fn new(users: impl IntoIterator<Item = UserProfile>) -> Self {
        let inner = InMemoryUserStore::new();
        for user in users {
            inner.insert(user);
        }
        Self {
            inner,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserStore for RecordingUserStore {
    async fn get_user(&self, uid: &str) -> Result<UserProfile> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.get_user(uid).await
    }
}

// ---------------------------------------------------------------------------
// FlakyEventStore
// ---------------------------------------------------------------------------

/// In-memory store whose `add` fails once `fail_on_add` successful writes
/// have happened. Reads and removals always work.
pub struct FlakyEventStore {
    inner: Arc<InMemoryEventStore>,
    fail_on_add: usize,
    adds: AtomicUsize,
}

impl FlakyEventStore {
    pub fn new(inner: Arc<InMemoryEventStore>, fail_on_add: usize) -> Self {
        Self {
            inner,
            fail_on_add,
            adds: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EventStore for FlakyEventStore {
    async fn events_in_viewport(&self, viewport: &ViewportGeometry) -> Result<Vec<Event>> {
        self.inner.events_in_viewport(viewport).await
    }

    fn new_id(&self) -> Uuid {
        self.inner.new_id()
    }

    async fn add(&self, event: &Event) -> Result<()> {
        if self.adds.fetch_add(1, Ordering::SeqCst) == self.fail_on_add {
            bail!("FlakyEventStore: write {} rejected", self.fail_on_add);
        }
        self.inner.add(event).await
    }

    async fn remove(&self, id: Uuid) -> Result<()> {
        self.inner.remove(id).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Event>> {
        self.inner.get(id).await
    }
}

/// Event store whose viewport query is unreachable.
pub struct UnreachableEventStore;

#[async_trait]
impl EventStore for UnreachableEventStore {
    async fn events_in_viewport(&self, _viewport: &ViewportGeometry) -> Result<Vec<Event>> {
        bail!("UnreachableEventStore: connection refused")
    }

    fn new_id(&self) -> Uuid {
        Uuid::new_v4()
    }

    async fn add(&self, _event: &Event) -> Result<()> {
        bail!("UnreachableEventStore: connection refused")
    }

    async fn remove(&self, _id: Uuid) -> Result<()> {
        bail!("UnreachableEventStore: connection refused")
    }

    async fn get(&self, _id: Uuid) -> Result<Option<Event>> {
        bail!("UnreachableEventStore: connection refused")
    }
}
