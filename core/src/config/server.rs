//! MCP server launch configuration

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// How to launch and talk to an MCP server process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Display name of the server
    pub name: String,
    /// Program followed by its leading arguments
    pub command: Vec<String>,
    /// Extra arguments appended after `command`
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables for the server process
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Read timeout for a single JSON-RPC reply, in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    30
}

impl McpServerConfig {
    /// Create a configuration for an explicit command line
    pub fn new<S: Into<String>>(name: S, command: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command,
            args: Vec::new(),
            env: HashMap::new(),
            timeout_seconds: default_timeout_seconds(),
        }
    }

    /// Build a configuration from a server script path.
    ///
    /// `.py` scripts run under `python`, `.js` scripts under `node`.
    pub fn from_script<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let interpreter = match path.extension().and_then(|ext| ext.to_str()) {
            Some("py") => "python",
            Some("js") => "node",
            _ => {
                return Err(ConfigError::UnsupportedServerScript {
                    path: path.display().to_string(),
                }
                .into())
            }
        };

        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("mcp")
            .to_string();

        Ok(Self::new(
            name,
            vec![interpreter.to_string(), path.display().to_string()],
        ))
    }

    /// Set the read timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Add environment variables for the server process
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.command.is_empty() || self.command[0].trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "command".to_string(),
            }
            .into());
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_seconds".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
