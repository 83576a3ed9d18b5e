//! Tool provider abstraction

use crate::error::Result;
use crate::tools::{ToolArguments, ToolDescriptor};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A connection to an external process exposing callable tools
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Get the provider's display name
    fn name(&self) -> &str;

    /// List the tools currently exposed by the provider
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>>;

    /// Call a tool.
    ///
    /// Transport failures are returned as errors; a tool that ran and failed,
    /// or a call the provider rejected, comes back as `Ok` with `is_error` set.
    async fn call_tool(&self, name: &str, arguments: ToolArguments) -> Result<ToolOutput>;

    /// Release the connection
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

/// What the provider returned for one tool call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Text content of the result
    pub content: String,

    /// Structured content, when the provider sent any
    pub data: Option<serde_json::Value>,

    /// Whether the provider reported the call as failed
    pub is_error: bool,
}

impl ToolOutput {
    /// Create a successful text output
    pub fn text<S: Into<String>>(content: S) -> Self {
        Self {
            content: content.into(),
            data: None,
            is_error: false,
        }
    }

    /// Create a failed output
    pub fn error<S: Into<String>>(content: S) -> Self {
        Self {
            content: content.into(),
            data: None,
            is_error: true,
        }
    }
}
