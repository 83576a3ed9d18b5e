//! Configuration types for relay core
//!
//! Only exports resolved data types. All discovery and loading logic is in
//! the CLI layer.

pub mod server;
pub mod types;

pub use server::McpServerConfig;
pub use types::{ModelParams, Protocol, ResolvedLlmConfig, SessionConfig};
