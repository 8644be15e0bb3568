//! Log analysis agent core
//!
//! The tool-calling loop with approval gating, the tool registry and its
//! tools, the confirmation detector and the progress observer contract.

use thiserror::Error;

use logpilot_provider::ProviderError;

pub mod confirmation;
pub mod context;
pub mod loop_agent;
pub mod observer;
pub mod tools;

pub use confirmation::is_confirmation;
pub use context::ContextBuilder;
pub use loop_agent::AgentLoop;
pub use observer::{NullObserver, ProgressObserver, Step, StepRecorder};
pub use tools::{default_registry, ToolClass, ToolRegistry, ToolTrait};

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Tool '{0}' not found")]
    ToolNotFound(String),

    #[error("model invocation failed: {0}")]
    Provider(#[from] ProviderError),
}

pub type Result<T> = std::result::Result<T, AgentError>;
