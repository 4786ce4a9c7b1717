use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventMapError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Event not found: {0}")]
    EventNotFound(uuid::Uuid),
}
