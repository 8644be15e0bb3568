//! Agent loop - tool calling with approval gating

use std::sync::Arc;
use tracing::{debug, info, warn};

use logpilot_config::Config;
use logpilot_provider::{create_provider, ChatResponse, Message, ModelClient, Provider, ToolCall};

use crate::confirmation::is_confirmation;
use crate::context::ContextBuilder;
use crate::observer::ProgressObserver;
use crate::tools::{default_registry, ToolRegistry};
use crate::AgentError;

/// Answer when the model ends a cycle without any text
pub const NO_RESPONSE: &str = "No response generated.";

/// Answer when the iteration ceiling is hit without any text
pub const MAX_STEPS_REACHED: &str = "Reached maximum analysis steps.";

/// Result text fed back to the model for a held-back action
pub fn blocked_notice(name: &str) -> String {
    format!(
        "Action '{}' requires human approval and was not executed. \
         Present your findings and ask the user to confirm. \
         When the user confirms, call this tool again -- \
         the system will allow it through.",
        name
    )
}

/// Runs one processing cycle per user message.
///
/// Each model turn that requests tools is executed in request order and
/// answered with exactly one result per call before the model is asked
/// again. Approval-required tools only run when the user message of the
/// same cycle is a bare confirmation; otherwise they are recorded in
/// [`AgentLoop::pending_actions`] and the model is told to ask for approval.
pub struct AgentLoop {
    client: ModelClient,
    tools: ToolRegistry,
    context: ContextBuilder,
    max_iterations: u32,
    pending_actions: Vec<ToolCall>,
}

impl AgentLoop {
    pub fn new(
        client: ModelClient,
        tools: ToolRegistry,
        context: ContextBuilder,
        max_iterations: u32,
    ) -> Self {
        Self {
            client,
            tools,
            context,
            max_iterations,
            pending_actions: Vec::new(),
        }
    }

    /// Backend, tools and prompt all taken from `config`
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let provider = create_provider(config)?;
        Ok(Self::with_provider(provider, config))
    }

    /// Use `provider` with the tools and settings from `config`
    pub fn with_provider(provider: Arc<dyn Provider>, config: &Config) -> Self {
        let tools = default_registry(config);
        let client = ModelClient::new(provider, tools.definitions())
            .with_model(config.model())
            .with_temperature(config.agent.temperature)
            .with_max_tokens(config.agent.max_tokens);

        Self::new(
            client,
            tools,
            ContextBuilder::from_config(config),
            config.agent.max_iterations,
        )
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn client(&self) -> &ModelClient {
        &self.client
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Calls held back during the last cycle
    pub fn pending_actions(&self) -> &[ToolCall] {
        &self.pending_actions
    }

    /// Answer one user message.
    ///
    /// Model invocation failures are reported to `observer.error` and
    /// returned; tool failures never end the cycle.
    pub async fn process_query(
        &mut self,
        user_input: &str,
        history: &[Message],
        observer: &mut dyn ProgressObserver,
    ) -> crate::Result<String> {
        match self.run_cycle(user_input, history, observer).await {
            Ok(answer) => {
                observer.complete();
                Ok(answer)
            }
            Err(e) => {
                observer.error(&e.to_string());
                Err(e)
            }
        }
    }

    async fn run_cycle(
        &mut self,
        user_input: &str,
        history: &[Message],
        observer: &mut dyn ProgressObserver,
    ) -> crate::Result<String> {
        self.pending_actions.clear();

        let approval_granted = is_confirmation(user_input);
        if approval_granted {
            info!("User confirmed, approval-required tools are allowed this cycle");
        }

        let mut messages = self.context.build_messages(history, user_input).await;
        let mut response = self.invoke(&messages, observer).await?;
        let mut last_text: Option<String> = None;

        for iteration in 1..=self.max_iterations {
            if !response.has_tool_calls() {
                return Ok(response
                    .text_content()
                    .or(last_text)
                    .unwrap_or_else(|| NO_RESPONSE.to_string()));
            }

            debug!(
                "Iteration {}: {} tool call(s)",
                iteration,
                response.tool_calls.len()
            );

            if let Some(text) = response.text_content() {
                observer.on_reasoning(&text);
                last_text = Some(text);
            }

            let mut results = Vec::with_capacity(response.tool_calls.len());
            for call in &response.tool_calls {
                results.push(self.execute_tool_call(call, approval_granted, observer).await);
            }

            ContextBuilder::add_assistant_message(
                &mut messages,
                response.content.as_deref(),
                &response.tool_calls,
            );
            for (call, result) in response.tool_calls.iter().zip(&results) {
                ContextBuilder::add_tool_result(&mut messages, &call.id, &call.name, result);
            }

            response = self.invoke(&messages, observer).await?;
        }

        warn!(
            "Stopped after {} iterations without a final answer",
            self.max_iterations
        );
        Ok(response
            .text_content()
            .or(last_text)
            .unwrap_or_else(|| MAX_STEPS_REACHED.to_string()))
    }

    async fn invoke(
        &self,
        messages: &[Message],
        observer: &mut dyn ProgressObserver,
    ) -> crate::Result<ChatResponse> {
        observer.on_thinking();
        let response = self.client.invoke(messages).await?;
        debug!(
            "Model turn: {} tool call(s), {} tokens",
            response.tool_calls.len(),
            response.usage.total_tokens
        );
        Ok(response)
    }

    /// Run or hold back one call, always yielding its result text
    async fn execute_tool_call(
        &mut self,
        call: &ToolCall,
        approval_granted: bool,
        observer: &mut dyn ProgressObserver,
    ) -> String {
        let name = call.name.as_str();

        if self.tools.requires_approval(name) {
            if !approval_granted {
                info!("Holding back {} until the user confirms", name);
                self.pending_actions.push(call.clone());
                observer.on_approval_skipped(name, &call.arguments);
                return blocked_notice(name);
            }
            warn!(
                "Running {} on blanket confirmation with arguments {}",
                name, call.arguments
            );
        }

        observer.on_tool_start(name, &call.arguments);

        let Some(tool) = self.tools.find(name) else {
            warn!("Model requested unknown tool {}", name);
            return AgentError::ToolNotFound(name.to_string()).to_string();
        };

        debug!("Executing tool: {}", name);
        match tool.execute(call.arguments.clone()).await {
            Ok(result) => {
                observer.on_tool_end(name, &result, true);
                result
            }
            Err(e) => {
                let message = e.to_string();
                warn!("Tool {} failed: {}", name, message);
                observer.on_tool_end(name, &message, false);
                format!("Error: {}", message)
            }
        }
    }
}
