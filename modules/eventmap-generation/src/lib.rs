pub mod claude;
pub mod error;
pub mod generator;
pub mod memory_store;
pub mod orchestrator;
pub mod policy;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use error::GenerationError;
pub use orchestrator::AiEventGenOrchestrator;
pub use policy::{AdmissionDecision, GenerationContext, PassiveAiGenPolicy, RejectReason};
