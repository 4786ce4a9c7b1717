//! Admission control for passive AI event generation.
//!
//! Decides, for one viewport and caller, whether new events should be
//! synthesized and how many. The policy owns no clock and no state beyond its
//! immutable config: callers pass in both the last-generation timestamp and
//! "now", so the same inputs always produce the same decision.

use eventmap_common::{PolicyConfig, ViewportGeometry};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Why a request was turned down. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Last generation was too recent.
    CoolingDown,
    /// Viewport radius exceeds the configured maximum.
    ZoomedOut,
    /// Viewport already holds as many events as it comfortably can.
    Saturated,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::CoolingDown => write!(f, "cooling_down"),
            RejectReason::ZoomedOut => write!(f, "zoomed_out"),
            RejectReason::Saturated => write!(f, "saturated"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    Reject(RejectReason),
    /// `events_to_generate` is always in `1..=max_events_per_request`.
    Accept { events_to_generate: u32 },
}

impl AdmissionDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, AdmissionDecision::Accept { .. })
    }
}

/// Inputs for a single evaluation. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationContext {
    pub viewport: ViewportGeometry,
    pub num_existing_events: usize,
    pub last_gen_timestamp: i64,
    pub now: i64,
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PassiveAiGenPolicy {
    config: PolicyConfig,
}

impl PassiveAiGenPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// First matching rule decides:
    ///
    /// 1. `now - last_gen < cooldown` → Reject(CoolingDown)
    /// 2. `radius_km > max_viewport_radius_km` → Reject(ZoomedOut)
    /// 3. `num_existing >= density_threshold` → Reject(Saturated)
    /// 4. `min(threshold - num_existing, max_events_per_request)` → Accept
    pub fn evaluate(
        &self,
        viewport: &ViewportGeometry,
        num_existing_events: usize,
        last_gen_timestamp: i64,
        now: i64,
    ) -> AdmissionDecision {
        // A clock running backwards yields a negative elapsed time, which
        // stays under any non-negative cooldown.
        let elapsed_ms = now.saturating_sub(last_gen_timestamp);
        if elapsed_ms < self.config.cooldown.num_milliseconds() {
            return AdmissionDecision::Reject(RejectReason::CoolingDown);
        }

        if viewport.radius_km > self.config.max_viewport_radius_km {
            return AdmissionDecision::Reject(RejectReason::ZoomedOut);
        }

        let threshold = self.density_threshold(viewport.radius_km);
        let existing = num_existing_events as u64;
        if existing >= threshold {
            return AdmissionDecision::Reject(RejectReason::Saturated);
        }

        let deficit = threshold - existing;
        let capped = deficit.min(u64::from(self.config.max_events_per_request));
        if capped == 0 {
            return AdmissionDecision::Reject(RejectReason::Saturated);
        }

        AdmissionDecision::Accept {
            events_to_generate: capped as u32,
        }
    }

    pub fn evaluate_context(&self, ctx: &GenerationContext) -> AdmissionDecision {
        self.evaluate(
            &ctx.viewport,
            ctx.num_existing_events,
            ctx.last_gen_timestamp,
            ctx.now,
        )
    }

    /// How many events fit in a viewport of `radius_km` when neighbours keep
    /// `min_event_spacing_km` apart: `floor((radius / spacing)^2)`.
    ///
    /// NaN or negative radii give 0. Any radius below `min_event_spacing_km`
    /// also gives 0, so a viewport zoomed in that far never generates, even
    /// when empty.
    pub fn density_threshold(&self, radius_km: f64) -> u64 {
        let ratio = radius_km / self.config.min_event_spacing_km;
        let slots = (ratio * ratio).floor();
        if slots.is_nan() || radius_km <= 0.0 {
            return 0;
        }
        // Float-to-int casts saturate.
        slots as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const MINUTE_MS: i64 = 60_000;

    fn policy() -> PassiveAiGenPolicy {
        PassiveAiGenPolicy::new(PolicyConfig {
            cooldown: Duration::minutes(5),
            min_event_spacing_km: 0.5,
            max_viewport_radius_km: 25.0,
            max_events_per_request: 5,
        })
    }

    fn viewport(radius_km: f64) -> ViewportGeometry {
        ViewportGeometry::new(44.9778, -93.2650, radius_km)
    }

    #[test]
    fn recent_generation_is_cooling_down() {
        let decision = policy().evaluate(&viewport(2.0), 0, 1_000_000, 1_000_000 + 4 * MINUTE_MS);
        assert_eq!(decision, AdmissionDecision::Reject(RejectReason::CoolingDown));
    }

    #[test]
    fn elapsed_equal_to_cooldown_is_allowed() {
        let decision = policy().evaluate(&viewport(2.0), 0, 0, 5 * MINUTE_MS);
        assert!(decision.is_accept());
    }

    #[test]
    fn clock_skew_counts_as_cooling_down() {
        let decision = policy().evaluate(&viewport(2.0), 0, 10 * MINUTE_MS, 0);
        assert_eq!(decision, AdmissionDecision::Reject(RejectReason::CoolingDown));
    }

    #[test]
    fn extreme_timestamps_do_not_overflow() {
        let decision = policy().evaluate(&viewport(2.0), 0, i64::MIN, i64::MAX);
        assert!(decision.is_accept());
    }

    #[test]
    fn huge_viewport_is_zoomed_out() {
        let decision = policy().evaluate(&viewport(9999.0), 0, 0, 100 * MINUTE_MS);
        assert_eq!(decision, AdmissionDecision::Reject(RejectReason::ZoomedOut));
    }

    #[test]
    fn radius_at_max_is_allowed() {
        let decision = policy().evaluate(&viewport(25.0), 0, 0, 100 * MINUTE_MS);
        assert!(decision.is_accept());
    }

    #[test]
    fn cooldown_wins_over_zoom() {
        let decision = policy().evaluate(&viewport(9999.0), 0, 0, 1);
        assert_eq!(decision, AdmissionDecision::Reject(RejectReason::CoolingDown));
    }

    #[test]
    fn tiny_viewport_is_saturated_even_when_empty() {
        // (0.2 / 0.5)^2 = 0.16 → 0 slots
        assert_eq!(policy().density_threshold(0.2), 0);
        let decision = policy().evaluate(&viewport(0.2), 0, 0, 100 * MINUTE_MS);
        assert_eq!(decision, AdmissionDecision::Reject(RejectReason::Saturated));
    }

    #[test]
    fn radius_below_spacing_never_generates() {
        let p = policy();
        for radius in [0.05, 0.2, 0.35, 0.49] {
            assert_eq!(p.density_threshold(radius), 0, "radius={radius}");
            assert_eq!(
                p.evaluate(&viewport(radius), 0, 0, 100 * MINUTE_MS),
                AdmissionDecision::Reject(RejectReason::Saturated)
            );
        }
    }

    #[test]
    fn threshold_scales_with_square_of_radius() {
        let p = policy();
        assert_eq!(p.density_threshold(0.5), 1);
        assert_eq!(p.density_threshold(1.0), 4);
        assert_eq!(p.density_threshold(2.0), 16);
        assert_eq!(p.density_threshold(1.2), 5); // 5.76 floors to 5
    }

    #[test]
    fn degenerate_radii_give_zero_threshold() {
        let p = policy();
        assert_eq!(p.density_threshold(0.0), 0);
        assert_eq!(p.density_threshold(-1.0), 0);
        assert_eq!(p.density_threshold(f64::NAN), 0);
    }

    #[test]
    fn deficit_is_capped_at_max_events() {
        // threshold 16, nothing there yet
        let decision = policy().evaluate(&viewport(2.0), 0, 0, 100 * MINUTE_MS);
        assert_eq!(decision, AdmissionDecision::Accept { events_to_generate: 5 });
    }

    #[test]
    fn small_deficit_is_passed_through() {
        // threshold 16, 14 already present
        let decision = policy().evaluate(&viewport(2.0), 14, 0, 100 * MINUTE_MS);
        assert_eq!(decision, AdmissionDecision::Accept { events_to_generate: 2 });
    }

    #[test]
    fn full_viewport_is_saturated() {
        let decision = policy().evaluate(&viewport(2.0), 16, 0, 100 * MINUTE_MS);
        assert_eq!(decision, AdmissionDecision::Reject(RejectReason::Saturated));
    }

    #[test]
    fn context_evaluation_matches_direct_call() {
        let p = policy();
        let ctx = GenerationContext {
            viewport: viewport(1.0),
            num_existing_events: 1,
            last_gen_timestamp: 0,
            now: 100 * MINUTE_MS,
        };
        assert_eq!(
            p.evaluate_context(&ctx),
            p.evaluate(&ctx.viewport, 1, 0, 100 * MINUTE_MS)
        );
        assert_eq!(p.evaluate_context(&ctx), AdmissionDecision::Accept { events_to_generate: 3 });
    }
}
