//! System instructions and conversation assembly

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use logpilot_config::Config;
use logpilot_provider::{Message, ToolCall};

/// Instructions used when no prompt file is present
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an AI logging agent for a DevOps team. You analyze application logs, explain what went wrong and propose remediation.

## Tools
- list_log_files: see which log files exist
- read_log_file: read a whole log file
- search_logs: find lines containing a term (case-insensitive)
- send_slack_notification: notify the team about an incident and the actions taken
- restart_kubernetes_pod: restart a pod (requires operator approval)
- reboot_rds_instance: reboot an RDS database instance (requires operator approval)

## Working rules
- Start from the logs. Quote the lines that support your conclusion.
- Give a short diagnosis: what failed, the likely root cause and the impact.
- Restarting a pod or rebooting a database disrupts service. Explain the action you propose and ask the operator to confirm before calling the tool.
- If a tool result says an action requires human approval, present your findings and ask the operator to confirm. When they confirm, call the same tool again.
- After a remediation action succeeds, send a Slack notification summarizing the incident and the action taken.
- Be concise."#;

/// Builds the conversation sent to the model
pub struct ContextBuilder {
    system_prompt_path: PathBuf,
    examples_path: PathBuf,
}

impl ContextBuilder {
    pub fn new(system_prompt_path: impl AsRef<Path>, examples_path: impl AsRef<Path>) -> Self {
        Self {
            system_prompt_path: system_prompt_path.as_ref().to_path_buf(),
            examples_path: examples_path.as_ref().to_path_buf(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.system_prompt_path(), config.examples_path())
    }

    /// Prompt file contents (or the built-in prompt) with examples appended
    pub async fn build_system_prompt(&self) -> String {
        let mut prompt = match tokio::fs::read_to_string(&self.system_prompt_path).await {
            Ok(content) if !content.trim().is_empty() => content,
            Ok(_) => {
                warn!("{:?} is empty, using built-in prompt", self.system_prompt_path);
                DEFAULT_SYSTEM_PROMPT.to_string()
            }
            Err(e) => {
                debug!(
                    "No system prompt at {:?} ({}), using built-in prompt",
                    self.system_prompt_path, e
                );
                DEFAULT_SYSTEM_PROMPT.to_string()
            }
        };

        if let Ok(examples) = tokio::fs::read_to_string(&self.examples_path).await {
            prompt.push_str("\n\n");
            prompt.push_str(&examples);
        }

        prompt
    }

    /// System instructions, then prior turns, then the new user message
    pub async fn build_messages(&self, history: &[Message], current_message: &str) -> Vec<Message> {
        let system_prompt = self.build_system_prompt().await;

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(system_prompt));
        messages.extend_from_slice(history);
        messages.push(Message::user(current_message));

        messages
    }

    pub fn add_tool_result(
        messages: &mut Vec<Message>,
        tool_call_id: &str,
        name: &str,
        result: &str,
    ) {
        messages.push(Message::tool(tool_call_id, name, result));
    }

    /// Record a model turn that requested tools, keeping every request
    pub fn add_assistant_message(
        messages: &mut Vec<Message>,
        content: Option<&str>,
        tool_calls: &[ToolCall],
    ) {
        messages.push(Message::assistant_with_tools(
            content.map(str::to_string),
            tool_calls,
        ));
    }
}
