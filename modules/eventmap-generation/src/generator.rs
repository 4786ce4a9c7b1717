use std::collections::BTreeSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use eventmap_common::{Event, EventSource, GeoPoint, UserProfile, ViewportGeometry};

use crate::claude::Claude;
use crate::traits::{EventGenerator, GenerationRequest};

/// What the LLM returns for each proposed event.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EventDraft {
    /// Short, specific event title (e.g. "Sunset Salsa at Minnehaha Falls")
    pub title: String,
    /// One or two sentences describing what happens and who it is for
    pub description: String,
    /// ISO 8601 start date-time, in the future
    pub starts_at: String,
    /// Latitude of the venue, inside the requested area
    pub latitude: f64,
    /// Longitude of the venue, inside the requested area
    pub longitude: f64,
    /// Human-readable venue or place name
    pub location_name: Option<String>,
    /// 1-4 lowercase-with-hyphens tags (e.g. "live-music", "outdoors")
    #[serde(default)]
    pub tags: Vec<String>,
}

/// The full generation response from the LLM.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationResponse {
    #[serde(default, deserialize_with = "deserialize_events")]
    pub events: Vec<EventDraft>,
}

/// Handle the LLM returning events as either a JSON array or a stringified JSON array.
fn deserialize_events<'de, D>(deserializer: D) -> std::result::Result<Vec<EventDraft>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Array(_) => serde_json::from_value(value).map_err(de::Error::custom),
        serde_json::Value::String(ref s) => serde_json::from_str(s).map_err(de::Error::custom),
        serde_json::Value::Null => Ok(Vec::new()),
        _ => Err(de::Error::custom("events must be an array or JSON string")),
    }
}

/// `EventGenerator` backed by Claude structured output.
pub struct ClaudeEventGenerator {
    claude: Claude,
}

impl ClaudeEventGenerator {
    pub fn new(anthropic_api_key: &str, model: &str) -> Self {
        Self {
            claude: Claude::new(anthropic_api_key, model),
        }
    }

    pub fn with_client(claude: Claude) -> Self {
        Self { claude }
    }
}

#[async_trait]
impl EventGenerator for ClaudeEventGenerator {
    async fn generate_events(&self, request: &GenerationRequest) -> Result<Vec<Event>> {
        let now = Utc::now();
        let system = build_system_prompt(&request.viewport, request.hint_count, now);
        let user = build_user_prompt(&request.profile);

        let response: GenerationResponse = self.claude.extract(system, user).await?;
        let proposed = response.events.len();
        let events = drafts_to_events(response.events, request.hint_count as usize);

        info!(
            model = self.claude.model(),
            proposed,
            kept = events.len(),
            "Claude event generation complete"
        );
        Ok(events)
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

pub fn build_system_prompt(viewport: &ViewportGeometry, count: u32, now: DateTime<Utc>) -> String {
    format!(
        "You suggest plausible local events for a social event-discovery map.\n\
         \n\
         Propose at most {count} events located within {radius:.2} km of \
         latitude {lat:.5}, longitude {lng:.5}.\n\
         Today is {today}. Every event must start after today and within the next 14 days.\n\
         \n\
         Rules:\n\
         - Use real-sounding venues appropriate for the area (parks, cafes, community centers).\n\
         - Keep events at least a few hundred meters apart.\n\
         - Titles are short and specific. Descriptions are one or two sentences.\n\
         - Tags are lowercase-with-hyphens slugs.\n\
         - Return an empty list rather than inventing events outside the area.",
        radius = viewport.radius_km,
        lat = viewport.center_lat,
        lng = viewport.center_lng,
        today = now.format("%Y-%m-%d"),
    )
}

pub fn build_user_prompt(profile: &UserProfile) -> String {
    let interests = if profile.interests.is_empty() {
        "no stated interests; pick broadly appealing events".to_string()
    } else {
        profile
            .interests
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "Suggest events for {name}. Their interests: {interests}.",
        name = profile.display_name,
    )
}

// ---------------------------------------------------------------------------
// Response conversion
// ---------------------------------------------------------------------------

/// Convert drafts to candidate events, dropping unusable entries and keeping
/// at most `limit`. Each candidate gets a provisional id.
pub fn drafts_to_events(drafts: Vec<EventDraft>, limit: usize) -> Vec<Event> {
    drafts
        .into_iter()
        .filter_map(|draft| match draft_to_event(&draft) {
            Some(event) => Some(event),
            None => {
                warn!(title = draft.title.as_str(), "Dropping malformed generated event");
                None
            }
        })
        .take(limit)
        .collect()
}

fn draft_to_event(draft: &EventDraft) -> Option<Event> {
    let title = draft.title.trim();
    if title.is_empty() {
        return None;
    }

    let location = GeoPoint::new(draft.latitude, draft.longitude);
    if !location.is_valid() {
        return None;
    }

    let starts_at = parse_start(&draft.starts_at)?;

    Some(Event {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: draft.description.trim().to_string(),
        starts_at,
        tags: normalize_tags(&draft.tags),
        location,
        location_name: draft
            .location_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string),
        source: EventSource::AiGenerated,
    })
}

/// RFC 3339, or a naive `YYYY-MM-DDTHH:MM[:SS]` read as UTC.
fn parse_start(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn normalize_tags(tags: &[String]) -> BTreeSet<String> {
    tags.iter()
        .map(|t| t.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join("-"))
        .filter(|t| !t.is_empty())
        .collect()
}
