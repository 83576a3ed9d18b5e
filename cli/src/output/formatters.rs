//! Formatting utilities for CLI output

use colored::Colorize;
use relay_core::llm::Usage;
use relay_core::{ToolCallResult, ToolDescriptor};

/// Longest tool result shown under a status line
const MAX_RESULT_CHARS: usize = 200;

/// Tool execution formatter
pub struct ToolFormatter;

impl ToolFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Format tool execution status for CLI display
    pub fn format_tool_status(&self, result: &ToolCallResult) -> String {
        let dot = if result.success {
            "⏺".green()
        } else {
            "⏺".red()
        };
        format!(
            "{} {}({})",
            dot,
            result.tool_name,
            self.extract_display_argument(&result.arguments)
        )
    }

    /// First string argument, or the compact JSON when there is none
    fn extract_display_argument(&self, arguments: &serde_json::Value) -> String {
        match arguments {
            serde_json::Value::Object(map) if map.is_empty() => String::new(),
            serde_json::Value::Object(map) => map
                .values()
                .find_map(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| arguments.to_string()),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Format tool result content for display
    pub fn format_tool_result(&self, result: &ToolCallResult) -> Option<String> {
        let content = result.content.trim();
        if content.is_empty() {
            return None;
        }

        let first_line = content.lines().next().unwrap_or_default();
        let display = if first_line.chars().count() > MAX_RESULT_CHARS || content.contains('\n') {
            let truncated: String = first_line.chars().take(MAX_RESULT_CHARS - 3).collect();
            format!("{}...", truncated)
        } else {
            first_line.to_string()
        };

        Some(format!("  ⎿  {}", display).dimmed().to_string())
    }

    /// Format one entry of the tool listing
    pub fn format_tool_entry(&self, tool: &ToolDescriptor) -> String {
        if tool.description.is_empty() {
            format!("  • {}", tool.name.bold())
        } else {
            format!("  • {} - {}", tool.name.bold(), tool.description.trim())
        }
    }
}

impl Default for ToolFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Session-level messages
pub struct SessionFormatter;

impl SessionFormatter {
    /// Banner printed once the server is connected
    pub fn connected(tool_names: &[&str]) -> String {
        format!("{} {:?}", "Connected to server with tools:".green(), tool_names)
    }

    pub fn error(message: &str) -> String {
        format!("{} {}", "Error:".red().bold(), message)
    }

    pub fn usage(usage: &Usage) -> String {
        format!(
            "🪙 Tokens: {} input + {} output = {} total",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        )
        .dimmed()
        .to_string()
    }
}
