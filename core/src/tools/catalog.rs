//! Catalog of the tools a provider currently exposes

use crate::error::{Result, ToolError};
use crate::llm::{FunctionDefinition, ToolDefinition};
use crate::tools::{ToolDescriptor, ToolProvider};
use std::collections::HashSet;
use tracing::debug;

/// The most recently fetched descriptor set, in the order the provider listed it
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<ToolDescriptor>,
}

impl ToolCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-query the provider and replace the descriptor set wholesale.
    ///
    /// On any error the previous set is kept.
    pub async fn refresh(&mut self, provider: &dyn ToolProvider) -> Result<&[ToolDescriptor]> {
        let tools = provider.list_tools().await?;

        if let Some(name) = first_duplicate(&tools) {
            return Err(ToolError::DuplicateTool { name }.into());
        }

        debug!(
            "Tool catalog for '{}' refreshed: {} tools",
            provider.name(),
            tools.len()
        );
        self.tools = tools;
        Ok(&self.tools)
    }

    /// Look up a descriptor by name
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    /// Check whether a tool with this name is available
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Names of all tools, in listing order
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name.as_str()).collect()
    }

    /// All descriptors, in listing order
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Function signatures for the model
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|tool| ToolDefinition {
                tool_type: "function".to_string(),
                function: FunctionDefinition {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.input_schema.clone(),
                },
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn first_duplicate(tools: &[ToolDescriptor]) -> Option<String> {
    let mut seen = HashSet::new();
    tools
        .iter()
        .find(|tool| !seen.insert(tool.name.as_str()))
        .map(|tool| tool.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{weather_tool, FakeProvider};
    use crate::tools::ToolOutput;
    use serde_json::json;

    fn ping_tool() -> ToolDescriptor {
        ToolDescriptor::new("ping", "Check the server is alive.", json!({"type": "object"}))
    }

    #[tokio::test]
    async fn test_refresh_and_definitions() {
        let provider = FakeProvider::new()
            .with_tool(weather_tool(), ToolOutput::text("sunny"))
            .with_tool(ping_tool(), ToolOutput::text("pong"));

        let mut catalog = ToolCatalog::new();
        assert!(catalog.is_empty());

        let tools = catalog.refresh(&provider).await.unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(catalog.names(), vec!["get_weather", "ping"]);
        assert!(catalog.contains("ping"));
        assert!(catalog.get("missing").is_none());

        let definitions = catalog.definitions();
        assert_eq!(definitions[0].tool_type, "function");
        assert_eq!(definitions[0].function.name, "get_weather");
        assert_eq!(
            definitions[0].function.parameters["required"],
            json!(["location"])
        );
    }

    #[tokio::test]
    async fn test_refresh_is_idempotent() {
        let provider = FakeProvider::new().with_tool(weather_tool(), ToolOutput::text("sunny"));
        let mut catalog = ToolCatalog::new();

        let first = catalog.refresh(&provider).await.unwrap().to_vec();
        let second = catalog.refresh(&provider).await.unwrap().to_vec();
        assert_eq!(first, second);
        assert_eq!(catalog.len(), 1);
        assert_eq!(provider.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_names_keep_previous_set() {
        let good = FakeProvider::new().with_tool(weather_tool(), ToolOutput::text("sunny"));
        let bad = FakeProvider::new()
            .with_tool(ping_tool(), ToolOutput::text("pong"))
            .with_tool(ping_tool(), ToolOutput::text("pong"));

        let mut catalog = ToolCatalog::new();
        catalog.refresh(&good).await.unwrap();

        let err = catalog.refresh(&bad).await.unwrap_err();
        assert!(err.to_string().contains("ping"));
        assert_eq!(catalog.names(), vec!["get_weather"]);
    }

    #[tokio::test]
    async fn test_unavailable_provider_keeps_previous_set() {
        let provider = FakeProvider::new().with_tool(weather_tool(), ToolOutput::text("sunny"));
        let mut catalog = ToolCatalog::new();
        catalog.refresh(&provider).await.unwrap();

        provider.set_down(true);
        let err = catalog.refresh(&provider).await.unwrap_err();
        assert!(err.is_provider_unavailable());
        assert_eq!(catalog.len(), 1);
    }
}
