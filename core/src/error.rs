//! Error types and handling for relay core

use thiserror::Error;

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for relay core
///
/// Every variant is scoped to a single query: the session stays usable after
/// any of them is returned.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Model backend errors (the completion request failed or was unusable)
    #[error("Model request failed: {0}")]
    Llm(#[from] LlmError),

    /// Tool provider transport errors
    #[error("Tool provider unavailable: {0}")]
    Provider(#[from] ProviderError),

    /// Tool catalog and reference errors
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for field '{field}': {value}")]
    InvalidValue { field: String, value: String },

    #[error("Unsupported server script '{path}': must be a .py or .js file")]
    UnsupportedServerScript { path: String },
}

/// Model backend errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("API error: {message}")]
    ApiError { message: String },

    #[error("Empty response: {message}")]
    EmptyResponse { message: String },
}

/// Tool provider connection errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{message}")]
    Unavailable { message: String },

    #[error("tool provider '{name}' is not started")]
    NotStarted { name: String },

    #[error("protocol error: {message}")]
    Protocol { message: String },
}

/// Tool catalog and reference errors
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Model requested unknown tool '{name}' (available: {available})")]
    InvalidReference { name: String, available: String },

    #[error("Provider advertised tool '{name}' more than once")]
    DuplicateTool { name: String },
}

impl Error {
    /// Whether this error means the tool provider could not be reached
    pub fn is_provider_unavailable(&self) -> bool {
        matches!(self, Error::Provider(_))
    }

    /// Whether this error came from the model backend
    pub fn is_model_failure(&self) -> bool {
        matches!(self, Error::Llm(_))
    }

    /// Whether the model referenced a tool that is not in the catalog
    pub fn is_invalid_tool_reference(&self) -> bool {
        matches!(self, Error::Tool(ToolError::InvalidReference { .. }))
    }
}

impl ProviderError {
    /// Shorthand for a transport-level failure
    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        ProviderError::Unavailable {
            message: message.into(),
        }
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Generic(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Generic(msg.to_string())
    }
}
