use thiserror::Error;

/// Failure of a generation attempt. A policy rejection is not an error; it
/// surfaces as an empty `Ok` result.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Failed to count existing events: {0:#}")]
    ExistingEvents(anyhow::Error),

    #[error("User lookup failed for {uid}: {error:#}")]
    UserLookup { uid: String, error: anyhow::Error },

    #[error("Event generation failed: {0:#}")]
    Generation(anyhow::Error),

    #[error("Failed to persist generated events: {0:#}")]
    Persistence(anyhow::Error),
}
