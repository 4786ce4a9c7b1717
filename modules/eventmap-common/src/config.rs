use std::str::FromStr;

use chrono::Duration;

use crate::error::EventMapError;

const DEFAULT_COOLDOWN_SECS: i64 = 300;
const DEFAULT_MIN_EVENT_SPACING_KM: f64 = 0.5;
const DEFAULT_MAX_VIEWPORT_RADIUS_KM: f64 = 25.0;
const DEFAULT_MAX_EVENTS_PER_REQUEST: u32 = 5;
const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";

/// Knobs for passive AI event generation. Loaded once at startup and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyConfig {
    /// Minimum time between two generation attempts for the same caller context.
    pub cooldown: Duration,
    /// Minimum comfortable distance between two events on the map.
    pub min_event_spacing_km: f64,
    /// Viewports larger than this are considered zoomed out and never generate.
    pub max_viewport_radius_km: f64,
    /// Upper bound on events synthesized per accepted request.
    pub max_events_per_request: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::seconds(DEFAULT_COOLDOWN_SECS),
            min_event_spacing_km: DEFAULT_MIN_EVENT_SPACING_KM,
            max_viewport_radius_km: DEFAULT_MAX_VIEWPORT_RADIUS_KM,
            max_events_per_request: DEFAULT_MAX_EVENTS_PER_REQUEST,
        }
    }
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<(), EventMapError> {
        if self.cooldown < Duration::zero() {
            return Err(EventMapError::Config("cooldown must not be negative".into()));
        }
        if !(self.min_event_spacing_km.is_finite() && self.min_event_spacing_km > 0.0) {
            return Err(EventMapError::Config(format!(
                "min_event_spacing_km must be a positive number, got {}",
                self.min_event_spacing_km
            )));
        }
        if !(self.max_viewport_radius_km.is_finite() && self.max_viewport_radius_km > 0.0) {
            return Err(EventMapError::Config(format!(
                "max_viewport_radius_km must be a positive number, got {}",
                self.max_viewport_radius_km
            )));
        }
        if self.max_events_per_request == 0 {
            return Err(EventMapError::Config(
                "max_events_per_request must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Process-wide configuration for the generation pipeline.
/// Policy knobs have defaults; the Anthropic key is optional so the policy can
/// run without a generator attached.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub policy: PolicyConfig,
    pub anthropic_api_key: Option<String>,
    pub model: String,
}

impl GenerationConfig {
    pub fn from_env() -> Result<Self, EventMapError> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.log_keys();
        Ok(config)
    }

    /// Build from an arbitrary key lookup. `from_env` delegates here.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EventMapError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cooldown_secs: i64 =
            parse_or(&lookup, "PASSIVE_GEN_COOLDOWN_SECS", DEFAULT_COOLDOWN_SECS)?;
        let cooldown = Duration::try_seconds(cooldown_secs).ok_or_else(|| {
            EventMapError::Config(format!("PASSIVE_GEN_COOLDOWN_SECS={cooldown_secs} is out of range"))
        })?;

        let policy = PolicyConfig {
            cooldown,
            min_event_spacing_km: parse_or(
                &lookup,
                "PASSIVE_GEN_MIN_EVENT_SPACING_KM",
                DEFAULT_MIN_EVENT_SPACING_KM,
            )?,
            max_viewport_radius_km: parse_or(
                &lookup,
                "PASSIVE_GEN_MAX_VIEWPORT_RADIUS_KM",
                DEFAULT_MAX_VIEWPORT_RADIUS_KM,
            )?,
            max_events_per_request: parse_or(
                &lookup,
                "PASSIVE_GEN_MAX_EVENTS_PER_REQUEST",
                DEFAULT_MAX_EVENTS_PER_REQUEST,
            )?,
        };
        policy.validate()?;

        Ok(Self {
            policy,
            anthropic_api_key: lookup("ANTHROPIC_API_KEY").filter(|k| !k.trim().is_empty()),
            model: lookup("PASSIVE_GEN_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let head: String = val.chars().take(5).collect();
            format!("{}...({} chars)", head, val.len())
        }

        tracing::info!("Config loaded:");
        tracing::info!(
            "  ANTHROPIC_API_KEY: {}",
            self.anthropic_api_key
                .as_deref()
                .map(preview)
                .unwrap_or_else(|| "<not set>".to_string())
        );
        tracing::info!("  PASSIVE_GEN_MODEL: {}", self.model);
        tracing::info!(
            cooldown_secs = self.policy.cooldown.num_seconds(),
            min_event_spacing_km = self.policy.min_event_spacing_km,
            max_viewport_radius_km = self.policy.max_viewport_radius_km,
            max_events_per_request = self.policy.max_events_per_request,
            "  Policy"
        );
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, EventMapError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| EventMapError::Config(format!("{key}={raw:?} is invalid: {e}"))),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = GenerationConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.policy, PolicyConfig::default());
        assert!(config.anthropic_api_key.is_none());
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = GenerationConfig::from_lookup(lookup_from(&[
            ("PASSIVE_GEN_COOLDOWN_SECS", "60"),
            ("PASSIVE_GEN_MIN_EVENT_SPACING_KM", "0.25"),
            ("PASSIVE_GEN_MAX_VIEWPORT_RADIUS_KM", "10"),
            ("PASSIVE_GEN_MAX_EVENTS_PER_REQUEST", "3"),
            ("ANTHROPIC_API_KEY", "sk-ant-test"),
        ]))
        .unwrap();
        assert_eq!(config.policy.cooldown, Duration::seconds(60));
        assert_eq!(config.policy.min_event_spacing_km, 0.25);
        assert_eq!(config.policy.max_viewport_radius_km, 10.0);
        assert_eq!(config.policy.max_events_per_request, 3);
        assert_eq!(config.anthropic_api_key.as_deref(), Some("sk-ant-test"));
    }

    #[test]
    fn garbage_number_is_a_config_error() {
        let err = GenerationConfig::from_lookup(lookup_from(&[(
            "PASSIVE_GEN_MAX_EVENTS_PER_REQUEST",
            "lots",
        )]))
        .unwrap_err();
        assert!(matches!(err, EventMapError::Config(_)));
    }

    #[test]
    fn zero_spacing_is_rejected() {
        let err = GenerationConfig::from_lookup(lookup_from(&[(
            "PASSIVE_GEN_MIN_EVENT_SPACING_KM",
            "0",
        )]))
        .unwrap_err();
        assert!(matches!(err, EventMapError::Config(_)));
    }

    #[test]
    fn zero_max_events_is_rejected() {
        let config = PolicyConfig {
            max_events_per_request: 0,
            ..PolicyConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn blank_api_key_counts_as_unset() {
        let config =
            GenerationConfig::from_lookup(lookup_from(&[("ANTHROPIC_API_KEY", "  ")])).unwrap();
        assert!(config.anthropic_api_key.is_none());
    }
}
