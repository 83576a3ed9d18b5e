//! MCP (Model Context Protocol) tool provider over stdio
//!
//! Speaks newline-delimited JSON-RPC 2.0 to a server process: an `initialize`
//! handshake, then `tools/list` and `tools/call` requests. Messages the server
//! sends on its own (notifications, replies to other ids) are skipped while a
//! reply is awaited.

use crate::config::McpServerConfig;
use crate::error::{ProviderError, Result};
use crate::tools::{ToolArguments, ToolDescriptor, ToolOutput, ToolProvider};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// MCP protocol revision announced during initialization
pub const PROTOCOL_VERSION: &str = "2024-11-05";

type BoxedReader = BufReader<Box<dyn AsyncRead + Send + Unpin>>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Identity the server reported during initialization
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// Live pipes to a server, plus the process when we spawned it
struct McpChannel {
    process: Option<Child>,
    reader: BoxedReader,
    writer: BoxedWriter,
    /// Bytes of a reply line not yet terminated; survives a timed-out read
    pending: Vec<u8>,
}

impl McpChannel {
    fn new(
        process: Option<Child>,
        reader: Box<dyn AsyncRead + Send + Unpin>,
        writer: BoxedWriter,
    ) -> Self {
        Self {
            process,
            reader: BufReader::new(reader),
            writer,
            pending: Vec::new(),
        }
    }
}

/// One page of a `tools/list` reply
#[derive(Deserialize)]
struct ToolsPage {
    #[serde(default)]
    tools: Vec<ToolDescriptor>,
    #[serde(rename = "nextCursor")]
    next_cursor: Option<String>,
}

/// MCP server connection
pub struct McpServer {
    config: McpServerConfig,
    channel: Mutex<Option<McpChannel>>,
    request_id: AtomicU64,
    server_info: Option<ServerInfo>,
}

impl McpServer {
    pub fn new(config: McpServerConfig) -> Self {
        Self {
            config,
            channel: Mutex::new(None),
            request_id: AtomicU64::new(0),
            server_info: None,
        }
    }

    /// Spawn the server process and perform the initialization handshake
    pub async fn start(&mut self) -> Result<()> {
        if self.channel.get_mut().is_some() {
            return Ok(());
        }
        self.config.validate()?;

        let mut cmd = Command::new(&self.config.command[0]);
        cmd.args(&self.config.command[1..]);
        cmd.args(&self.config.args);
        for (key, value) in &self.config.env {
            cmd.env(key, value);
        }

        // Server logs go straight to our stderr
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut process = cmd.spawn().map_err(|e| {
            ProviderError::unavailable(format!(
                "failed to start MCP server '{}' ({}): {}",
                self.config.name,
                self.config.command.join(" "),
                e
            ))
        })?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| ProviderError::unavailable("No stdin available for MCP server"))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| ProviderError::unavailable("No stdout available for MCP server"))?;

        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(stdout);
        let writer: BoxedWriter = Box::new(stdin);
        *self.channel.get_mut() = Some(McpChannel::new(Some(process), reader, writer));

        info!(
            "Started MCP server '{}': {}",
            self.config.name,
            self.config.command.join(" ")
        );

        if let Err(e) = self.initialize().await {
            // Dropping the channel kills the process
            *self.channel.get_mut() = None;
            return Err(e);
        }
        Ok(())
    }

    /// Connect over already-open streams instead of spawning a process
    pub async fn connect_streams<R, W>(config: McpServerConfig, reader: R, writer: W) -> Result<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(reader);
        let writer: BoxedWriter = Box::new(writer);
        let mut server = Self::new(config);
        *server.channel.get_mut() = Some(McpChannel::new(None, reader, writer));
        server.initialize().await?;
        Ok(server)
    }

    /// Identity reported by the server, once initialized
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    /// Send the initialization request, then the initialized notification
    async fn initialize(&mut self) -> Result<()> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "relay",
                "version": env!("CARGO_PKG_VERSION")
            }
        });

        let response = self.send_request("initialize", Some(params)).await?;
        if let Some(error) = rpc_error(&response) {
            return Err(ProviderError::Protocol {
                message: format!("initialize failed: {}", error),
            }
            .into());
        }

        self.server_info = response
            .get("result")
            .and_then(|result| result.get("serverInfo"))
            .and_then(|info| serde_json::from_value(info.clone()).ok());

        self.send_notification("notifications/initialized").await?;

        if let Some(info) = &self.server_info {
            debug!("MCP server identified as {} {}", info.name, info.version);
        }
        Ok(())
    }

    fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Send a JSON-RPC request and wait for the reply carrying its id
    async fn send_request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_request_id();
        let mut request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method
        });
        if let Some(params) = params {
            request["params"] = params;
        }

        let mut guard = self.channel.lock().await;
        let channel = guard.as_mut().ok_or_else(|| ProviderError::NotStarted {
            name: self.config.name.clone(),
        })?;

        debug!("MCP request #{}: {}", id, method);
        write_message(&mut channel.writer, &request).await?;

        let wait = Duration::from_secs(self.config.timeout_seconds);
        timeout(wait, read_response(channel, id))
            .await
            .map_err(|_| {
                ProviderError::unavailable(format!(
                    "MCP server '{}' did not answer '{}' within {}s",
                    self.config.name, method, self.config.timeout_seconds
                ))
            })?
    }

    async fn send_notification(&self, method: &str) -> Result<()> {
        let notification = json!({
            "jsonrpc": "2.0",
            "method": method
        });

        let mut guard = self.channel.lock().await;
        let channel = guard.as_mut().ok_or_else(|| ProviderError::NotStarted {
            name: self.config.name.clone(),
        })?;
        write_message(&mut channel.writer, &notification).await
    }
}

#[async_trait]
impl ToolProvider for McpServer {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let response = self.send_request("tools/list", params).await?;

            if let Some(error) = rpc_error(&response) {
                return Err(ProviderError::Protocol {
                    message: format!("tools/list failed: {}", error),
                }
                .into());
            }

            let result = response.get("result").cloned().ok_or_else(|| {
                ProviderError::Protocol {
                    message: "No result in tools/list response".to_string(),
                }
            })?;
            let page: ToolsPage =
                serde_json::from_value(result).map_err(|e| ProviderError::Protocol {
                    message: format!("malformed tools/list result: {}", e),
                })?;

            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        debug!("MCP server '{}' listed {} tools", self.config.name, tools.len());
        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: ToolArguments) -> Result<ToolOutput> {
        let params = json!({
            "name": name,
            "arguments": arguments
        });

        let response = self.send_request("tools/call", Some(params)).await?;

        // Rejected calls (unknown tool, invalid params) are tool failures
        if let Some(error) = rpc_error(&response) {
            return Ok(ToolOutput::error(error));
        }

        let result = response.get("result").ok_or_else(|| ProviderError::Protocol {
            message: "No result in tools/call response".to_string(),
        })?;

        Ok(parse_call_result(result))
    }

    async fn shutdown(&self) -> Result<()> {
        let channel = self.channel.lock().await.take();
        if let Some(McpChannel {
            process: Some(mut process),
            ..
        }) = channel
        {
            if let Err(e) = process.kill().await {
                warn!("Failed to stop MCP server '{}': {}", self.config.name, e);
            } else {
                info!("Stopped MCP server '{}'", self.config.name);
            }
        }
        Ok(())
    }
}

async fn write_message(writer: &mut BoxedWriter, message: &Value) -> Result<()> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');

    let io = async {
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await
    };
    io.await.map_err(|e| {
        ProviderError::unavailable(format!("failed to write to MCP server: {}", e)).into()
    })
}

/// Read lines until the reply to `id` arrives.
///
/// Partial lines accumulate in the channel, so a read cut short by the timeout
/// resumes where it stopped on the next request.
async fn read_response(channel: &mut McpChannel, id: u64) -> Result<Value> {
    loop {
        let read = channel
            .reader
            .read_until(b'\n', &mut channel.pending)
            .await
            .map_err(|e| {
                ProviderError::unavailable(format!("failed to read from MCP server: {}", e))
            })?;
        if read == 0 {
            return Err(ProviderError::unavailable("MCP server closed the connection").into());
        }

        let line = std::mem::take(&mut channel.pending);
        let text = String::from_utf8_lossy(&line);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }

        let message: Value = serde_json::from_str(trimmed).map_err(|e| ProviderError::Protocol {
            message: format!("invalid JSON from MCP server: {}", e),
        })?;

        let is_reply = message.get("result").is_some() || message.get("error").is_some();
        if is_reply && message.get("id").and_then(Value::as_u64) == Some(id) {
            return Ok(message);
        }

        let method = message
            .get("method")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("reply");
        debug!("Skipping MCP message while waiting for #{}: {}", id, method);
    }
}

/// Format a JSON-RPC error object, if the response carries one
fn rpc_error(response: &Value) -> Option<String> {
    let error = response.get("error")?;
    let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    Some(format!("MCP error {}: {}", code, message))
}

/// Text items are joined by newlines; other content items are kept as JSON
fn parse_call_result(result: &Value) -> ToolOutput {
    let content = match result.get("content") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item.get("type").and_then(Value::as_str) {
                Some("text") => item
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                _ => item.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };

    ToolOutput {
        content,
        data: result.get("structuredContent").cloned(),
        is_error: result
            .get("isError")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}
