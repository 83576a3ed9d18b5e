//! # relay CLI
//!
//! Command-line client that lets a language model answer questions with the
//! tools of an MCP server.
//!
//! ## Usage
//!
//! - `relay server.py` - Start interactive mode
//! - `relay server.py "query"` - Answer a single query
//! - `relay server.py --list-tools` - Show the server's tools

use anyhow::{Context, Result};
use clap::Parser;
use relay_core::{McpServerConfig, Session};
use std::path::PathBuf;

mod commands;
mod config;
mod output;

use commands::{interactive_command, run_command, tools_command};
use config::CliConfigLoader;
use output::SessionFormatter;

/// relay - chat with a language model that can call MCP tools
#[derive(Parser)]
#[command(name = "relay")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Chat with a language model that can call the tools of an MCP server")]
#[command(long_about = None)]
struct Cli {
    /// Path to the MCP server script (.py or .js)
    server: String,

    /// The query to answer (if provided, runs in single-query mode)
    query: Option<String>,

    /// List the server's tools and exit
    #[arg(long)]
    list_tools: bool,

    /// Configuration file or directory path
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// API key override
    #[arg(long)]
    api_key: Option<String>,

    /// Base URL override
    #[arg(long)]
    base_url: Option<String>,

    /// Model name override
    #[arg(long)]
    model: Option<String>,

    /// System prompt placed at the head of the conversation
    #[arg(long)]
    system_prompt: Option<String>,

    /// Launch the server with this command instead of python/node
    #[arg(long)]
    server_command: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Build a configuration loader from CLI arguments
fn build_config_loader(cli: &Cli) -> CliConfigLoader {
    let mut loader = CliConfigLoader::new();

    if let Some(config_path) = &cli.config {
        loader = loader.with_config_override(config_path.clone());
    }

    if let Some(api_key) = &cli.api_key {
        loader = loader.with_api_key_override(api_key.clone());
    }

    if let Some(base_url) = &cli.base_url {
        loader = loader.with_base_url_override(base_url.clone());
    }

    if let Some(model) = &cli.model {
        loader = loader.with_model_override(model.clone());
    }

    if let Some(system_prompt) = &cli.system_prompt {
        loader = loader.with_system_prompt_override(system_prompt.clone());
    }

    loader
}

/// Work out how to launch the MCP server
fn build_server_config(cli: &Cli) -> Result<McpServerConfig> {
    let script = shellexpand::tilde(&cli.server).into_owned();

    match &cli.server_command {
        Some(command) => {
            let command: Vec<String> = command.split_whitespace().map(str::to_string).collect();
            anyhow::ensure!(!command.is_empty(), "--server-command cannot be empty");

            let name = PathBuf::from(&script)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("mcp-server")
                .to_string();
            let mut config = McpServerConfig::new(name, command);
            config.args.push(script);
            Ok(config)
        }
        None => McpServerConfig::from_script(&script)
            .with_context(|| format!("Cannot launch server script: {}", script)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    relay_core::init_tracing(cli.verbose);

    let mut server_config = build_server_config(&cli)?;
    let loaded = build_config_loader(&cli).load().await?;
    if let Some(timeout) = loaded.server_timeout_seconds {
        server_config = server_config.with_timeout(timeout);
    }

    tracing::debug!(
        "Using protocol {} with model {}",
        loaded.llm.protocol.as_str(),
        loaded.llm.model
    );

    let mut session = Session::connect(&loaded.llm, server_config, loaded.session)
        .await
        .context("Failed to connect to MCP server")?;

    let tool_names: Vec<&str> = session.tools().iter().map(|t| t.name.as_str()).collect();
    println!("\n{}", SessionFormatter::connected(&tool_names));

    let result = match (&cli.query, cli.list_tools) {
        (_, true) => tools_command(&mut session).await,
        (Some(query), false) => run_command(&mut session, query, cli.verbose).await,
        (None, false) => interactive_command(&mut session, cli.verbose).await,
    };

    session.shutdown().await?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_server_config_from_script() {
        let cli = parse(&["relay", "weather.py"]);
        let config = build_server_config(&cli).unwrap();
        assert_eq!(config.command[0], "python");
        assert_eq!(config.name, "weather");

        let cli = parse(&["relay", "weather.rb"]);
        assert!(build_server_config(&cli).is_err());
    }

    #[test]
    fn test_server_command_override() {
        let cli = parse(&["relay", "weather.rb", "--server-command", "uv run"]);
        let config = build_server_config(&cli).unwrap();
        assert_eq!(config.command, vec!["uv", "run"]);
        assert_eq!(config.args, vec!["weather.rb"]);
    }

    #[test]
    fn test_query_and_flags() {
        let cli = parse(&["relay", "weather.py", "weather in Beijing?", "-v"]);
        assert_eq!(cli.query.as_deref(), Some("weather in Beijing?"));
        assert!(cli.verbose);
        assert!(!cli.list_tools);
    }
}
