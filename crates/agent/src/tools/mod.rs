//! Tool registry and the log, notification and infrastructure tools

pub mod aws;
pub mod command;
pub mod kubernetes;
pub mod logs;
pub mod path_utils;
pub mod slack;

pub use aws::RebootRdsInstanceTool;
pub use kubernetes::RestartKubernetesPodTool;
pub use logs::{ListLogFilesTool, ReadLogFileTool, SearchLogsTool};
pub use slack::SlackNotificationTool;

use async_trait::async_trait;
use logpilot_config::Config;
use logpilot_provider::Tool;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use crate::AgentError;

type BoxedTool = Box<dyn ToolTrait + Send + Sync>;

/// Whether a tool may run as soon as the model asks for it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolClass {
    /// Read-only, diagnostic or notification tools
    AutoExecute,
    /// Tools that change infrastructure state
    ApprovalRequired,
}

impl ToolClass {
    pub fn requires_approval(self) -> bool {
        matches!(self, ToolClass::ApprovalRequired)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ToolClass::AutoExecute => "auto",
            ToolClass::ApprovalRequired => "approval",
        }
    }
}

/// A tool the model can call
#[async_trait]
pub trait ToolTrait: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> Value;
    fn class(&self) -> ToolClass;
    async fn execute(
        &self,
        args: Value,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

pub fn to_provider_tool(tool: &dyn ToolTrait) -> Tool {
    Tool::new(tool.name(), tool.description(), tool.parameters())
}

/// Named tools in registration order
pub struct ToolRegistry {
    tools: Vec<BoxedTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add a tool. Registering a name twice replaces the earlier tool in place.
    pub fn register<T: ToolTrait + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&slot) => {
                warn!("Tool '{}' registered twice, replacing", name);
                self.tools[slot] = Box::new(tool);
            }
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(Box::new(tool));
            }
        }
    }

    pub fn list(&self) -> impl Iterator<Item = &(dyn ToolTrait + Send + Sync)> {
        self.tools.iter().map(|t| t.as_ref())
    }

    pub fn find(&self, name: &str) -> Option<&(dyn ToolTrait + Send + Sync)> {
        self.index.get(name).map(|&slot| self.tools[slot].as_ref())
    }

    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// False for auto-executed tools and for names that are not registered
    pub fn requires_approval(&self, name: &str) -> bool {
        self.find(name)
            .map(|t| t.class().requires_approval())
            .unwrap_or(false)
    }

    pub fn definitions(&self) -> Vec<Tool> {
        self.list().map(|t| to_provider_tool(t)).collect()
    }

    pub async fn execute(
        &self,
        name: &str,
        args: Value,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let tool = self
            .find(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;
        tool.execute(args).await
    }

    pub fn names(&self) -> Vec<String> {
        self.list().map(|t| t.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The six log, infrastructure and notification tools wired from `config`
pub fn default_registry(config: &Config) -> ToolRegistry {
    let log_dir = config.log_dir();
    let mut registry = ToolRegistry::new();

    registry.register(ListLogFilesTool::new(log_dir.clone()));
    registry.register(ReadLogFileTool::new(log_dir.clone()));
    registry.register(SearchLogsTool::new(log_dir));

    registry.register(RestartKubernetesPodTool::from_config(config));
    registry.register(RebootRdsInstanceTool::from_config(config));

    registry.register(SlackNotificationTool::from_config(config));

    registry
}
