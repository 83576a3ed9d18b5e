//! Tool descriptors, call requests and call results

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Arguments passed to a tool: a JSON object keyed by parameter name
pub type ToolArguments = Map<String, Value>;

/// Metadata advertised by a provider for one callable tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Name of the tool, unique within a catalog
    pub name: String,

    /// Description of what the tool does
    #[serde(default)]
    pub description: String,

    /// JSON schema for the tool's arguments
    #[serde(rename = "inputSchema", alias = "input_schema", default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}

/// A call to a tool, as requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Unique identifier for this tool call
    pub id: String,

    /// Name of the tool to call
    pub tool_name: String,

    /// Arguments as produced by the model; not yet checked
    pub arguments: Value,
}

/// Why a tool call did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolFailure {
    /// Arguments did not match the tool's input schema
    InvalidArguments,

    /// The provider was reached but the tool itself failed
    Execution,

    /// The provider could not be reached
    Unavailable,
}

/// Result of a tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// ID of the tool call this is a result for
    pub tool_call_id: String,

    /// Name of the tool that was called
    pub tool_name: String,

    /// Arguments the model passed to the call
    pub arguments: Value,

    /// Whether the execution was successful
    pub success: bool,

    /// Payload text on success, error detail on failure
    pub content: String,

    /// Optional structured payload
    pub data: Option<Value>,

    /// Failure kind, set only when `success` is false
    pub failure: Option<ToolFailure>,

    /// Execution duration in milliseconds
    pub duration_ms: Option<u64>,
}

impl ToolDescriptor {
    /// Create a new descriptor
    pub fn new<S: Into<String>>(name: S, description: S, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Loosely check arguments against the input schema.
    ///
    /// Only required properties and primitive `type` declarations are
    /// checked; the provider performs full validation.
    pub fn check_arguments(&self, arguments: &ToolArguments) -> Result<(), String> {
        if let Some(required) = self.input_schema.get("required").and_then(Value::as_array) {
            for key in required.iter().filter_map(Value::as_str) {
                if !arguments.contains_key(key) {
                    return Err(format!("missing required argument '{}'", key));
                }
            }
        }

        let Some(properties) = self
            .input_schema
            .get("properties")
            .and_then(Value::as_object)
        else {
            return Ok(());
        };

        for (key, value) in arguments {
            let expected = properties
                .get(key)
                .and_then(|prop| prop.get("type"))
                .and_then(Value::as_str);
            if let Some(expected) = expected {
                if !value_has_type(value, expected) {
                    return Err(format!(
                        "argument '{}' should be of type {}, got {}",
                        key, expected, value
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Unknown type names are accepted
fn value_has_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

impl ToolCallRequest {
    /// Create a new tool call with a generated id
    pub fn new<S: Into<String>>(tool_name: S, arguments: Value) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), tool_name.into(), arguments)
    }

    /// Create a new tool call with an explicit id
    pub fn with_id(id: String, tool_name: String, arguments: Value) -> Self {
        Self {
            id,
            tool_name,
            arguments,
        }
    }

    /// Arguments as an object map; `null` counts as no arguments
    pub fn argument_map(&self) -> Result<ToolArguments, String> {
        match &self.arguments {
            Value::Object(map) => Ok(map.clone()),
            Value::Null => Ok(ToolArguments::new()),
            other => Err(format!("arguments must be a JSON object, got {}", other)),
        }
    }

    /// Announcement line included in the final answer
    pub fn announcement(&self) -> String {
        format!(
            "[Calling tool {} with args {}]",
            self.tool_name, self.arguments
        )
    }
}

impl ToolCallResult {
    /// Create a successful result
    pub fn success<S: Into<String>>(call: &ToolCallRequest, content: S) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            tool_name: call.tool_name.clone(),
            arguments: call.arguments.clone(),
            success: true,
            content: content.into(),
            data: None,
            failure: None,
            duration_ms: None,
        }
    }

    /// Create a failed result
    pub fn failure<S: Into<String>>(call: &ToolCallRequest, kind: ToolFailure, error: S) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            tool_name: call.tool_name.clone(),
            arguments: call.arguments.clone(),
            success: false,
            content: format!("Error: {}", error.into()),
            data: None,
            failure: Some(kind),
            duration_ms: None,
        }
    }

    /// Set structured data
    pub fn with_data(mut self, data: Option<Value>) -> Self {
        self.data = data;
        self
    }

    /// Set execution duration
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Whether the provider could not be reached for this call
    pub fn is_unavailable(&self) -> bool {
        self.failure == Some(ToolFailure::Unavailable)
    }
}
