//! # relay Core
//!
//! Core library for relay - a tool-augmented chat client for MCP servers.
//!
//! This library discovers the tools exposed by an MCP server, lets an
//! OpenAI-compatible model decide when to call them, feeds the results back
//! into the conversation and returns the model's final answer.

// Core modules
pub mod agent;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use agent::{OrchestratorState, QueryOutcome, Session};
pub use config::{McpServerConfig, ModelParams, Protocol, ResolvedLlmConfig, SessionConfig};
pub use conversation::{ConversationEntry, ConversationLog};
pub use error::{Error, Result};
pub use tools::{ToolCallResult, ToolDescriptor};

/// Current version of the relay-core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing on stderr, leaving stdout for answers.
///
/// `RUST_LOG` takes precedence over the verbosity flag.
pub fn init_tracing(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_log_level(verbose))),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn default_log_level(verbose: bool) -> &'static str {
    if verbose {
        "info"
    } else {
        "warn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_level() {
        assert_eq!(default_log_level(true), "info");
        assert_eq!(default_log_level(false), "warn");
    }
}
