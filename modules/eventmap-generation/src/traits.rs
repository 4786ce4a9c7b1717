// Trait boundaries for the generation orchestrator.
//
// EventStore: event persistence (Firestore in the app).
// UserStore: profile lookup.
// EventGenerator: the AI provider that turns a profile into candidate events.
//
// The orchestrator only ever sees these traits, so tests run against
// in-memory stores and scripted generators: no network, no database.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use eventmap_common::{Event, UserProfile, ViewportGeometry};

// ---------------------------------------------------------------------------
// EventStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Events whose location falls inside the viewport.
    async fn events_in_viewport(&self, viewport: &ViewportGeometry) -> Result<Vec<Event>>;

    /// Number of events inside the viewport. Stores with a cheaper count
    /// query should override this.
    async fn count_in_viewport(&self, viewport: &ViewportGeometry) -> Result<usize> {
        Ok(self.events_in_viewport(viewport).await?.len())
    }

    /// Allocate a fresh event id. Must be collision-free under concurrent use.
    fn new_id(&self) -> Uuid;

    /// Persist an event under its own `id`.
    async fn add(&self, event: &Event) -> Result<()>;

    /// Delete an event. Used to undo a partially persisted batch.
    async fn remove(&self, id: Uuid) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<Event>>;
}

// ---------------------------------------------------------------------------
// UserStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch a profile. Absent users are an error, not `None`.
    async fn get_user(&self, uid: &str) -> Result<UserProfile>;
}

// ---------------------------------------------------------------------------
// EventGenerator
// ---------------------------------------------------------------------------

/// Everything the generator gets to work with for one accepted request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub profile: UserProfile,
    pub viewport: ViewportGeometry,
    /// Suggested number of events. A cap, not a guarantee.
    pub hint_count: u32,
}

#[async_trait]
pub trait EventGenerator: Send + Sync {
    /// Produce candidate events. Returned ids are provisional.
    async fn generate_events(&self, request: &GenerationRequest) -> Result<Vec<Event>>;
}
