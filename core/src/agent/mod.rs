//! Query orchestration and session management

pub mod orchestrator;
pub mod session;

pub use orchestrator::{ConversationOrchestrator, OrchestratorState, QueryOutcome};
pub use session::Session;
