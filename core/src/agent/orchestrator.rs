//! Tool-augmented conversation orchestrator
//!
//! Drives one query through the decide, call, reinsert loop:
//!
//! 1. The query is appended to the log and the catalog is refreshed.
//! 2. The model sees the whole log plus every tool signature.
//! 3. Without tool calls its text is the answer. Otherwise each call is
//!    executed in order, its result is appended to the log, and a follow-up
//!    request without tool signatures turns the result into prose.
//!
//! The log is never rewound: on failure everything appended so far stays.

use crate::config::SessionConfig;
use crate::conversation::ConversationLog;
use crate::error::{ProviderError, Result, ToolError};
use crate::llm::{ChatOptions, LlmClient, LlmMessage, LlmResponse, ToolDefinition, Usage};
use crate::tools::{ToolCallRequest, ToolCallResult, ToolCatalog, ToolInvoker, ToolProvider};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, info};

/// Where the orchestrator is in processing a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    AwaitingQuery,
    ModelDeciding,
    ToolExecuting,
    Done,
    Failed,
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrchestratorState::AwaitingQuery => "awaiting_query",
            OrchestratorState::ModelDeciding => "model_deciding",
            OrchestratorState::ToolExecuting => "tool_executing",
            OrchestratorState::Done => "done",
            OrchestratorState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of one successfully processed query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    /// Final answer shown to the user
    pub answer: String,

    /// Results of every tool call made for this query, in call order
    pub tool_results: Vec<ToolCallResult>,

    /// Tokens consumed by the model requests of this query
    pub usage: Usage,
}

/// Processes a single query against borrowed session state
pub struct ConversationOrchestrator<'s> {
    llm: &'s dyn LlmClient,
    provider: &'s dyn ToolProvider,
    catalog: &'s mut ToolCatalog,
    log: &'s mut ConversationLog,
    config: &'s SessionConfig,
    state: OrchestratorState,
    usage: Usage,
}

impl<'s> ConversationOrchestrator<'s> {
    pub fn new(
        llm: &'s dyn LlmClient,
        provider: &'s dyn ToolProvider,
        catalog: &'s mut ToolCatalog,
        log: &'s mut ConversationLog,
        config: &'s SessionConfig,
    ) -> Self {
        Self {
            llm,
            provider,
            catalog,
            log,
            config,
            state: OrchestratorState::AwaitingQuery,
            usage: Usage::default(),
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Tokens consumed so far, including requests made before a failure
    pub fn usage(&self) -> Usage {
        self.usage
    }

    /// Process one query to completion
    pub async fn run(&mut self, query: &str) -> Result<QueryOutcome> {
        let result = self.drive(query).await;
        match &result {
            Ok(_) => self.transition(OrchestratorState::Done),
            Err(e) => {
                error!("Query failed: {}", e);
                self.transition(OrchestratorState::Failed);
            }
        }
        result
    }

    async fn drive(&mut self, query: &str) -> Result<QueryOutcome> {
        self.log.append(LlmMessage::user(query));
        self.transition(OrchestratorState::ModelDeciding);

        self.catalog.refresh(self.provider).await?;
        let definitions = self.catalog.definitions();

        let options = self.decision_options();
        let decision = self.request(Some(definitions), options).await?;
        let text = decision.text();
        let calls = decision.tool_calls();

        if calls.is_empty() {
            // Backends reject an assistant entry with no content
            if !text.is_empty() {
                self.log.append(LlmMessage::assistant(text.clone()));
            }
            return Ok(QueryOutcome {
                answer: text,
                tool_results: Vec::new(),
                usage: self.usage,
            });
        }

        self.check_references(&calls)?;

        let mut parts = Vec::with_capacity(calls.len() * 2);
        let mut tool_results = Vec::with_capacity(calls.len());

        for call in &calls {
            parts.push(call.announcement());

            let result = self.execute(call).await?;
            self.log.append(LlmMessage::assistant_tool_use(
                Some(&text),
                &call.id,
                &call.tool_name,
                call.arguments.clone(),
            ));
            self.log.append(LlmMessage::tool_result(
                call.id.clone(),
                result.content.clone(),
                !result.success,
            ));
            tool_results.push(result);

            self.transition(OrchestratorState::ModelDeciding);
            let options = self.follow_up_options();
            let follow_up = self.request(None, options).await?;
            let follow_up_text = follow_up.text();
            if !follow_up_text.is_empty() {
                self.log.append(LlmMessage::assistant(follow_up_text.clone()));
                parts.push(follow_up_text);
            }
        }

        Ok(QueryOutcome {
            answer: parts.join("\n"),
            tool_results,
            usage: self.usage,
        })
    }

    /// Every requested tool must exist before any of them runs
    fn check_references(&self, calls: &[ToolCallRequest]) -> Result<()> {
        for call in calls {
            if !self.catalog.contains(&call.tool_name) {
                return Err(ToolError::InvalidReference {
                    name: call.tool_name.clone(),
                    available: self.catalog.names().join(", "),
                }
                .into());
            }
        }
        Ok(())
    }

    async fn execute(&mut self, call: &ToolCallRequest) -> Result<ToolCallResult> {
        self.transition(OrchestratorState::ToolExecuting);

        let descriptor = self.catalog.get(&call.tool_name);
        let result = ToolInvoker::new(self.provider)
            .invoke(call, descriptor)
            .await;

        if result.is_unavailable() {
            let detail = result
                .content
                .strip_prefix("Error: ")
                .unwrap_or(&result.content);
            return Err(ProviderError::unavailable(detail).into());
        }
        Ok(result)
    }

    async fn request(
        &mut self,
        tools: Option<Vec<ToolDefinition>>,
        options: ChatOptions,
    ) -> Result<LlmResponse> {
        let messages = self.log.snapshot().to_vec();
        debug!(
            "Model request: {} messages, {} tools, max_tokens {:?}",
            messages.len(),
            tools.as_ref().map_or(0, Vec::len),
            options.max_tokens
        );

        let response = self
            .llm
            .chat_completion(messages, tools, Some(options))
            .await?;
        if let Some(usage) = &response.usage {
            self.usage.add(usage);
        }
        Ok(response)
    }

    fn decision_options(&self) -> ChatOptions {
        ChatOptions::from_params(&self.config.model_params)
    }

    fn follow_up_options(&self) -> ChatOptions {
        ChatOptions::from_params(&self.config.model_params)
            .with_max_tokens(self.config.follow_up_max_tokens)
    }

    fn transition(&mut self, next: OrchestratorState) {
        debug!("Orchestrator state: {} -> {}", self.state, next);
        if next == OrchestratorState::ToolExecuting || next == OrchestratorState::Done {
            info!("Orchestrator {}", next);
        }
        self.state = next;
    }
}
