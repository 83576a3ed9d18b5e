//! Tool discovery and invocation against an external tool provider

pub mod base;
pub mod catalog;
pub mod invoker;
pub mod mcp;
pub mod provider;

pub use base::{ToolArguments, ToolCallRequest, ToolCallResult, ToolDescriptor, ToolFailure};
pub use catalog::ToolCatalog;
pub use invoker::ToolInvoker;
pub use mcp::{McpServer, ServerInfo};
pub use provider::{ToolOutput, ToolProvider};
