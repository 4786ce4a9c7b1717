use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use eventmap_common::{GenerationConfig, GeoPoint, UserProfile, ViewportGeometry};
use eventmap_generation::generator::ClaudeEventGenerator;
use eventmap_generation::memory_store::{InMemoryEventStore, InMemoryUserStore};
use eventmap_generation::traits::EventStore;
use eventmap_generation::{AiEventGenOrchestrator, PassiveAiGenPolicy};

#[derive(Parser)]
#[command(name = "eventmap-generate")]
#[command(about = "Run one passive AI event generation pass for a map viewport")]
struct Cli {
    /// Latitude of the far-left (north-west) viewport corner
    #[arg(long, allow_hyphen_values = true)]
    far_left_lat: f64,
    /// Longitude of the far-left (north-west) viewport corner
    #[arg(long, allow_hyphen_values = true)]
    far_left_lng: f64,
    /// Latitude of the near-right (south-east) viewport corner
    #[arg(long, allow_hyphen_values = true)]
    near_right_lat: f64,
    /// Longitude of the near-right (south-east) viewport corner
    #[arg(long, allow_hyphen_values = true)]
    near_right_lng: f64,

    /// Requesting user id
    #[arg(long, default_value = "local-user")]
    user: String,
    /// Display name for the requesting user
    #[arg(long, default_value = "Local User")]
    name: String,
    /// Interest tags (repeatable)
    #[arg(long = "interest")]
    interests: Vec<String>,

    /// Epoch millis of the previous generation for this viewport
    #[arg(long, default_value_t = 0)]
    last_gen_ms: i64,
    /// Epoch millis to evaluate at (defaults to the wall clock)
    #[arg(long)]
    now_ms: Option<i64>,

    /// Only evaluate the admission policy; never call the AI provider
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("eventmap=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = GenerationConfig::from_env()?;

    let viewport = ViewportGeometry::from_corners(
        GeoPoint::new(cli.far_left_lat, cli.far_left_lng),
        GeoPoint::new(cli.near_right_lat, cli.near_right_lng),
    );
    let now = cli.now_ms.unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
    info!(
        lat = viewport.center_lat,
        lng = viewport.center_lng,
        radius_km = viewport.radius_km,
        "Viewport derived"
    );

    let policy = PassiveAiGenPolicy::new(config.policy.clone());
    let events = Arc::new(InMemoryEventStore::new());

    let api_key = match (&config.anthropic_api_key, cli.dry_run) {
        (Some(key), false) => key.clone(),
        (None, false) => {
            warn!("ANTHROPIC_API_KEY not set, falling back to a dry run");
            return dry_run(&policy, events.as_ref(), &viewport, cli.last_gen_ms, now).await;
        }
        (_, true) => {
            return dry_run(&policy, events.as_ref(), &viewport, cli.last_gen_ms, now).await;
        }
    };

    let profile = UserProfile::new(&cli.user, &cli.name).with_interests(cli.interests);
    let users = Arc::new(InMemoryUserStore::new().with_user(profile));
    let generator = Arc::new(ClaudeEventGenerator::new(&api_key, &config.model));

    let orchestrator = AiEventGenOrchestrator::new(events.clone(), users, generator, policy);
    let generated = orchestrator
        .maybe_generate(&cli.user, &viewport, cli.last_gen_ms, now)
        .await?;

    info!(generated = generated.len(), stored = events.len(), "Done");
    println!("{}", serde_json::to_string_pretty(&events.snapshot())?);
    Ok(())
}

async fn dry_run(
    policy: &PassiveAiGenPolicy,
    events: &dyn EventStore,
    viewport: &ViewportGeometry,
    last_gen: i64,
    now: i64,
) -> Result<()> {
    let existing = events.count_in_viewport(viewport).await?;
    let decision = policy.evaluate(viewport, existing, last_gen, now);
    info!(existing, "Dry run");
    println!("{decision:?}");
    Ok(())
}
