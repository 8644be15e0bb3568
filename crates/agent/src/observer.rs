//! Progress reporting for a processing cycle

use serde_json::Value;

/// Receives lifecycle events from [`crate::AgentLoop`].
///
/// Purely observational: nothing an observer does feeds back into the loop.
/// Every method defaults to a no-op so implementations pick what they need.
pub trait ProgressObserver: Send {
    /// A model invocation is about to start
    fn on_thinking(&mut self) {}

    /// Text the model produced alongside tool calls
    fn on_reasoning(&mut self, _text: &str) {}

    fn on_tool_start(&mut self, _name: &str, _args: &Value) {}

    fn on_tool_end(&mut self, _name: &str, _result: &str, _success: bool) {}

    /// An approval-required tool was held back this cycle
    fn on_approval_skipped(&mut self, _name: &str, _args: &Value) {}

    fn complete(&mut self) {}

    fn error(&mut self, _message: &str) {}
}

/// Ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ProgressObserver for NullObserver {}

/// One entry in a recorded transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub label: String,
    pub detail: String,
}

impl Step {
    pub fn new(label: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            detail: detail.into(),
        }
    }
}

/// Keeps a transcript of the cycle for later display
#[derive(Debug, Default, Clone)]
pub struct StepRecorder {
    steps: Vec<Step>,
    tools_used: usize,
    thinking: usize,
    completed: bool,
    last_error: Option<String>,
}

impl StepRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Tool executions that finished, successful or not
    pub fn tools_used(&self) -> usize {
        self.tools_used
    }

    /// Model invocations started
    pub fn thinking_count(&self) -> usize {
        self.thinking
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl ProgressObserver for StepRecorder {
    fn on_thinking(&mut self) {
        self.thinking += 1;
    }

    fn on_reasoning(&mut self, text: &str) {
        self.steps.push(Step::new("reasoning", text));
    }

    fn on_tool_start(&mut self, name: &str, args: &Value) {
        self.steps.push(Step::new(format!("start {}", name), args.to_string()));
    }

    fn on_tool_end(&mut self, name: &str, result: &str, success: bool) {
        self.tools_used += 1;
        let label = if success { "ok" } else { "fail" };
        self.steps
            .push(Step::new(format!("{} {}", label, name), result));
    }

    fn on_approval_skipped(&mut self, name: &str, args: &Value) {
        self.steps
            .push(Step::new(format!("blocked {}", name), args.to_string()));
    }

    fn complete(&mut self) {
        self.completed = true;
    }

    fn error(&mut self, message: &str) {
        self.last_error = Some(message.to_string());
    }
}
