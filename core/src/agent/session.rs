//! Session: one provider connection, one model client, one conversation

use crate::agent::orchestrator::{ConversationOrchestrator, OrchestratorState, QueryOutcome};
use crate::config::{McpServerConfig, Protocol, ResolvedLlmConfig, SessionConfig};
use crate::conversation::ConversationLog;
use crate::error::{ConfigError, Result};
use crate::llm::{LlmClient, LlmMessage, OpenAiClient, Usage};
use crate::tools::{McpServer, ToolCatalog, ToolDescriptor, ToolProvider};
use std::sync::Arc;
use tracing::info;

/// Owns everything a query needs; queries run one at a time through `&mut self`
pub struct Session {
    llm: Arc<dyn LlmClient>,
    provider: Box<dyn ToolProvider>,
    catalog: ToolCatalog,
    log: ConversationLog,
    config: SessionConfig,
    state: OrchestratorState,
    usage: Usage,
}

impl Session {
    /// Start the MCP server, connect the model backend and fetch the initial
    /// tool list
    pub async fn connect(
        llm_config: &ResolvedLlmConfig,
        server_config: McpServerConfig,
        config: SessionConfig,
    ) -> Result<Self> {
        llm_config
            .validate()
            .map_err(|message| ConfigError::InvalidValue {
                field: "llm".to_string(),
                value: message,
            })?;

        // Create LLM client based on protocol
        let llm: Arc<dyn LlmClient> = match &llm_config.protocol {
            Protocol::OpenAICompat => Arc::new(OpenAiClient::new(llm_config)?),
            Protocol::Custom(name) => {
                return Err(ConfigError::InvalidValue {
                    field: "protocol".to_string(),
                    value: name.clone(),
                }
                .into());
            }
        };

        let mut server = McpServer::new(server_config);
        server.start().await?;

        Self::new(Box::new(server), llm, config).await
    }

    /// Build a session over an already-connected provider
    pub async fn new(
        provider: Box<dyn ToolProvider>,
        llm: Arc<dyn LlmClient>,
        config: SessionConfig,
    ) -> Result<Self> {
        let mut log = ConversationLog::new();
        if let Some(prompt) = config.system_prompt.as_deref().filter(|p| !p.is_empty()) {
            log.append(LlmMessage::system(prompt));
        }

        let mut catalog = ToolCatalog::new();
        catalog.refresh(provider.as_ref()).await?;
        info!(
            "Connected to server '{}' with tools: {:?}",
            provider.name(),
            catalog.names()
        );

        Ok(Self {
            llm,
            provider,
            catalog,
            log,
            config,
            state: OrchestratorState::AwaitingQuery,
            usage: Usage::default(),
        })
    }

    /// Answer one query, calling tools as the model requests them.
    ///
    /// A failed query leaves the session usable; its log entries stay.
    pub async fn process_query(&mut self, query: &str) -> Result<QueryOutcome> {
        let mut orchestrator = ConversationOrchestrator::new(
            self.llm.as_ref(),
            self.provider.as_ref(),
            &mut self.catalog,
            &mut self.log,
            &self.config,
        );

        let result = orchestrator.run(query).await;
        self.state = orchestrator.state();
        self.usage.add(&orchestrator.usage());
        result
    }

    /// Re-query the provider for its tools
    pub async fn refresh_tools(&mut self) -> Result<&[ToolDescriptor]> {
        self.catalog.refresh(self.provider.as_ref()).await
    }

    /// Tools as of the last refresh
    pub fn tools(&self) -> &[ToolDescriptor] {
        self.catalog.tools()
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    /// Tokens used by every model request this session has made
    pub fn usage(&self) -> Usage {
        self.usage
    }

    /// State the last query ended in
    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// Stop the provider connection
    pub async fn shutdown(self) -> Result<()> {
        info!("Shutting down session with '{}'", self.provider.name());
        self.provider.shutdown().await
    }
}
