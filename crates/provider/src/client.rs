//! Tool-bound model client

use std::sync::Arc;
use tracing::debug;

use crate::{ChatParams, ChatResponse, Message, Provider, Result, Tool, ToolChoice};

/// A provider with its tool schemas and sampling settings bound once.
///
/// The agent loop only ever calls [`ModelClient::invoke`]; which backend sits
/// behind it is decided by configuration.
pub struct ModelClient {
    provider: Arc<dyn Provider>,
    tools: Vec<Tool>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl ModelClient {
    pub fn new(provider: Arc<dyn Provider>, tools: Vec<Tool>) -> Self {
        let model = provider.default_model();
        let defaults = ChatParams::default();
        Self {
            provider,
            tools,
            model,
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Ask the model for its next turn given the conversation so far.
    ///
    /// Errors from the backend are returned as-is; there is no retry here.
    pub async fn invoke(&self, messages: &[Message]) -> Result<ChatResponse> {
        debug!(
            "Invoking {} ({}) with {} messages",
            self.provider.name(),
            self.model,
            messages.len()
        );

        let params = ChatParams {
            model: self.model.clone(),
            messages: messages.to_vec(),
            tools: self.tools.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            tool_choice: ToolChoice::Auto,
        };

        self.provider.chat(params).await
    }
}
