use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use eventmap_common::{Event, ViewportGeometry};

use crate::error::GenerationError;
use crate::policy::{AdmissionDecision, PassiveAiGenPolicy};
use crate::traits::{EventGenerator, EventStore, GenerationRequest, UserStore};

/// Runs one passive generation attempt end to end: count what is already on
/// the map, ask the policy, and only on acceptance call the AI generator and
/// persist what it returns.
///
/// Holds no clock and no "last generated" bookkeeping. Callers own the
/// cooldown timestamp and pass it in on every call.
pub struct AiEventGenOrchestrator {
    events: Arc<dyn EventStore>,
    users: Arc<dyn UserStore>,
    generator: Arc<dyn EventGenerator>,
    policy: PassiveAiGenPolicy,
}

impl AiEventGenOrchestrator {
    pub fn new(
        events: Arc<dyn EventStore>,
        users: Arc<dyn UserStore>,
        generator: Arc<dyn EventGenerator>,
        policy: PassiveAiGenPolicy,
    ) -> Self {
        Self {
            events,
            users,
            generator,
            policy,
        }
    }

    pub fn policy(&self) -> &PassiveAiGenPolicy {
        &self.policy
    }

    /// Returns the candidates as produced by the generator (provisional ids),
    /// truncated to the admitted count, or an empty list when the policy
    /// declines. Stored copies carry fresh ids; re-query the store for
    /// canonical records.
    pub async fn maybe_generate(
        &self,
        current_user_id: &str,
        viewport: &ViewportGeometry,
        last_gen: i64,
        now: i64,
    ) -> Result<Vec<Event>, GenerationError> {
        let num_existing = self
            .events
            .count_in_viewport(viewport)
            .await
            .map_err(GenerationError::ExistingEvents)?;

        let events_to_generate = match self.policy.evaluate(viewport, num_existing, last_gen, now) {
            AdmissionDecision::Reject(reason) => {
                debug!(
                    user = current_user_id,
                    %reason,
                    radius_km = viewport.radius_km,
                    existing = num_existing,
                    "Passive generation declined"
                );
                return Ok(Vec::new());
            }
            AdmissionDecision::Accept { events_to_generate } => events_to_generate,
        };

        info!(
            user = current_user_id,
            lat = viewport.center_lat,
            lng = viewport.center_lng,
            radius_km = viewport.radius_km,
            existing = num_existing,
            requested = events_to_generate,
            "Passive generation accepted"
        );

        let profile = self
            .users
            .get_user(current_user_id)
            .await
            .map_err(|error| GenerationError::UserLookup {
                uid: current_user_id.to_string(),
                error,
            })?;

        let request = GenerationRequest {
            profile,
            viewport: *viewport,
            hint_count: events_to_generate,
        };

        let mut candidates = self
            .generator
            .generate_events(&request)
            .await
            .map_err(GenerationError::Generation)?;

        // The hint is also the cap: never store more than the policy admitted.
        let cap = events_to_generate as usize;
        if candidates.len() > cap {
            warn!(
                user = current_user_id,
                returned = candidates.len(),
                cap,
                "Generator exceeded the admitted count, truncating"
            );
            candidates.truncate(cap);
        }

        if candidates.is_empty() {
            info!(user = current_user_id, "Generator returned no events");
            return Ok(candidates);
        }

        self.persist_all(&candidates, viewport).await?;

        info!(
            user = current_user_id,
            generated = candidates.len(),
            "Passive generation complete"
        );
        Ok(candidates)
    }

    /// Store every candidate under a fresh id, all or nothing. On the first
    /// failed write, already-written records are removed and the write error
    /// is returned.
    async fn persist_all(
        &self,
        candidates: &[Event],
        viewport: &ViewportGeometry,
    ) -> Result<(), GenerationError> {
        let mut written: Vec<Uuid> = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            if !viewport.contains(&candidate.location) {
                warn!(
                    title = candidate.title.as_str(),
                    lat = candidate.location.lat,
                    lng = candidate.location.lng,
                    "Generated event lies outside the viewport"
                );
            }

            let stored = candidate.with_id(self.events.new_id());
            if let Err(e) = self.events.add(&stored).await {
                warn!(
                    error = %e,
                    rolled_back = written.len(),
                    "Persisting generated event failed, rolling back batch"
                );
                self.roll_back(&written).await;
                return Err(GenerationError::Persistence(e));
            }
            debug!(
                provisional_id = %candidate.id,
                stored_id = %stored.id,
                title = stored.title.as_str(),
                "Stored generated event"
            );
            written.push(stored.id);
        }

        Ok(())
    }

    async fn roll_back(&self, written: &[Uuid]) {
        for id in written {
            if let Err(e) = self.events.remove(*id).await {
                warn!(%id, error = %e, "Failed to remove event during rollback");
            }
        }
    }
}
