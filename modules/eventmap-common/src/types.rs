use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

// --- Events ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// Created by a person through the app.
    Organic,
    /// Synthesized by the passive AI generation pipeline.
    AiGenerated,
}

impl std::fmt::Display for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventSource::Organic => write!(f, "organic"),
            EventSource::AiGenerated => write!(f, "ai_generated"),
        }
    }
}

/// An event pinned to the map.
///
/// Candidates coming out of the AI generator carry a provisional `id` that is
/// replaced when the event is persisted; every other field survives unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub tags: BTreeSet<String>,
    pub location: GeoPoint,
    pub location_name: Option<String>,
    pub source: EventSource,
}

impl Event {
    /// Copy of this event under a different id.
    pub fn with_id(&self, id: Uuid) -> Self {
        Self {
            id,
            ..self.clone()
        }
    }

    /// Field-wise equality ignoring `id`.
    pub fn same_content(&self, other: &Event) -> bool {
        self.with_id(other.id) == *other
    }
}

// --- Users ---

/// Read-only view of the requesting user, handed to the generator so it can
/// tailor events to their interests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub interests: BTreeSet<String>,
    pub home: Option<GeoPoint>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            interests: BTreeSet::new(),
            home: None,
        }
    }

    pub fn with_interests<I, S>(mut self, interests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interests = interests.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_home(mut self, home: GeoPoint) -> Self {
        self.home = Some(home);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> Event {
        Event {
            id: Uuid::new_v4(),
            title: "Lake Harriet Bandshell Jazz".to_string(),
            description: "Evening set by the lake".to_string(),
            starts_at: Utc::now(),
            tags: ["music", "outdoors"].iter().map(|s| s.to_string()).collect(),
            location: GeoPoint::new(44.9215, -93.3057),
            location_name: Some("Lake Harriet".to_string()),
            source: EventSource::AiGenerated,
        }
    }

    #[test]
    fn with_id_keeps_content() {
        let event = sample_event();
        let moved = event.with_id(Uuid::new_v4());
        assert_ne!(moved.id, event.id);
        assert!(moved.same_content(&event));
    }

    #[test]
    fn same_content_detects_changed_tags() {
        let event = sample_event();
        let mut other = event.with_id(Uuid::new_v4());
        other.tags.insert("food".to_string());
        assert!(!other.same_content(&event));
    }

    #[test]
    fn event_serializes_source_as_snake_case() {
        let json = serde_json::to_value(sample_event()).unwrap();
        assert_eq!(json["source"], "ai_generated");
    }

    #[test]
    fn profile_interests_default_to_empty() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"id":"u1","display_name":"Ada","home":null}"#).unwrap();
        assert!(profile.interests.is_empty());
    }
}
