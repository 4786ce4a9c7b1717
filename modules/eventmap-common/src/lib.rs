pub mod config;
pub mod error;
pub mod geo;
pub mod types;

pub use config::{GenerationConfig, PolicyConfig};
pub use error::EventMapError;
pub use geo::*;
pub use types::*;
