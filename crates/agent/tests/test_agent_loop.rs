//! Agent loop scenarios driven by a scripted provider

use async_trait::async_trait;
use logpilot_agent::loop_agent::{blocked_notice, MAX_STEPS_REACHED, NO_RESPONSE};
use logpilot_agent::tools::{ListLogFilesTool, ToolClass, ToolRegistry, ToolTrait};
use logpilot_agent::{AgentError, AgentLoop, ContextBuilder, NullObserver, StepRecorder};
use logpilot_config::Config;
use logpilot_provider::{
    ChatParams, ChatResponse, Message, ModelClient, Provider, ProviderError, ToolCall,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Replays canned turns and records every conversation it was sent
struct ScriptedProvider {
    turns: Mutex<VecDeque<Result<ChatResponse, ProviderError>>>,
    repeat: Option<ChatResponse>,
    seen: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl ScriptedProvider {
    fn new(turns: Vec<ChatResponse>) -> Self {
        Self {
            turns: Mutex::new(turns.into_iter().map(Ok).collect()),
            repeat: None,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn repeating(turn: ChatResponse) -> Self {
        Self {
            turns: Mutex::new(VecDeque::new()),
            repeat: Some(turn),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing(error: ProviderError) -> Self {
        Self {
            turns: Mutex::new(VecDeque::from([Err(error)])),
            repeat: None,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError> {
        self.seen.lock().unwrap().push(params.messages);
        if let Some(turn) = self.turns.lock().unwrap().pop_front() {
            return turn;
        }
        self.repeat.clone().ok_or(ProviderError::InvalidResponse)
    }
    fn name(&self) -> &str {
        "scripted"
    }
    fn default_model(&self) -> String {
        "scripted-model".to_string()
    }
    fn is_configured(&self) -> bool {
        true
    }
}

/// Counts executions; optionally fails
struct CountingTool {
    name: &'static str,
    class: ToolClass,
    calls: Arc<AtomicUsize>,
    fail_with: Option<&'static str>,
}

#[async_trait]
impl ToolTrait for CountingTool {
    fn name(&self) -> &str {
        self.name
    }
    fn description(&self) -> &str {
        "test tool"
    }
    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }
    fn class(&self) -> ToolClass {
        self.class
    }
    async fn execute(
        &self,
        args: Value,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_with {
            Some(message) => Err(message.into()),
            None => Ok(format!("{} done with {}", self.name, args)),
        }
    }
}

fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

fn tool_turn(text: Option<&str>, calls: Vec<ToolCall>) -> ChatResponse {
    ChatResponse::tool_calls(text.map(str::to_string), calls)
}

struct Harness {
    _dir: TempDir,
    agent: AgentLoop,
    seen: Arc<Mutex<Vec<Vec<Message>>>>,
    restarts: Arc<AtomicUsize>,
    failures: Arc<AtomicUsize>,
}

impl Harness {
    fn invocations(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// Conversation sent on the `n`th model invocation
    fn sent(&self, n: usize) -> Vec<Message> {
        self.seen.lock().unwrap()[n].clone()
    }
}

fn harness(provider: ScriptedProvider, max_iterations: u32) -> Harness {
    let dir = TempDir::new().unwrap();
    let logs = dir.path().join("logs");
    fs::create_dir(&logs).unwrap();
    fs::write(logs.join("app.log"), "INFO ok\n").unwrap();
    fs::write(logs.join("error.log"), "ERROR boom\n").unwrap();
    fs::write(dir.path().join("system_prompt.txt"), "You analyze logs.").unwrap();

    let restarts = Arc::new(AtomicUsize::new(0));
    let failures = Arc::new(AtomicUsize::new(0));

    let mut tools = ToolRegistry::new();
    tools.register(ListLogFilesTool::new(logs));
    tools.register(CountingTool {
        name: "restart_kubernetes_pod",
        class: ToolClass::ApprovalRequired,
        calls: restarts.clone(),
        fail_with: None,
    });
    tools.register(CountingTool {
        name: "flaky_probe",
        class: ToolClass::AutoExecute,
        calls: failures.clone(),
        fail_with: Some("probe crashed"),
    });

    let seen = provider.seen.clone();
    let client = ModelClient::new(Arc::new(provider), tools.definitions());
    let context = ContextBuilder::new(
        dir.path().join("system_prompt.txt"),
        dir.path().join("examples.txt"),
    );

    Harness {
        _dir: dir,
        agent: AgentLoop::new(client, tools, context, max_iterations),
        seen,
        restarts,
        failures,
    }
}

#[tokio::test]
async fn test_text_only_turn_is_returned_trimmed() {
    let provider = ScriptedProvider::new(vec![ChatResponse::text("  All services look healthy.\n")]);
    let mut h = harness(provider, 10);
    let mut recorder = StepRecorder::new();

    let answer = h.agent.process_query("status?", &[], &mut recorder).await.unwrap();

    assert_eq!(answer, "All services look healthy.");
    assert_eq!(h.invocations(), 1);
    assert_eq!(recorder.tools_used(), 0);
    assert_eq!(recorder.thinking_count(), 1);
    assert!(recorder.is_complete());
}

#[tokio::test]
async fn test_first_conversation_has_prompt_history_and_input() {
    let provider = ScriptedProvider::new(vec![ChatResponse::text("ok")]);
    let mut h = harness(provider, 10);
    let history = vec![Message::user("hi"), Message::assistant("hello")];

    h.agent
        .process_query("list log files", &history, &mut NullObserver)
        .await
        .unwrap();

    let sent = h.sent(0);
    let roles: Vec<&str> = sent.iter().map(|m| m.role.as_str()).collect();
    assert_eq!(roles, ["system", "user", "assistant", "user"]);
    assert_eq!(sent[0].content.as_deref(), Some("You analyze logs."));
    assert_eq!(sent[3].content.as_deref(), Some("list log files"));
}

#[tokio::test]
async fn test_list_log_files_scenario() {
    let provider = ScriptedProvider::new(vec![
        tool_turn(None, vec![call("c1", "list_log_files", json!({}))]),
        ChatResponse::text("There are 2 log files: app.log, error.log."),
    ]);
    let mut h = harness(provider, 10);
    let mut recorder = StepRecorder::new();

    let answer = h
        .agent
        .process_query("list log files", &[], &mut recorder)
        .await
        .unwrap();

    assert_eq!(answer, "There are 2 log files: app.log, error.log.");
    assert!(h.agent.pending_actions().is_empty());
    assert_eq!(recorder.tools_used(), 1);
    assert_eq!(recorder.thinking_count(), 2);

    let second = h.sent(1);
    let assistant = &second[second.len() - 2];
    assert_eq!(assistant.role, "assistant");
    assert_eq!(assistant.tool_calls.as_ref().unwrap()[0].id, "c1");

    let result = second.last().unwrap();
    assert_eq!(result.role, "tool");
    assert_eq!(result.tool_call_id.as_deref(), Some("c1"));
    let content = result.content.as_deref().unwrap();
    assert!(content.contains("  - app.log"));
    assert!(content.contains("  - error.log"));
}

#[tokio::test]
async fn test_restart_blocked_then_confirmed() {
    let restart = call("r1", "restart_kubernetes_pod", json!({"pod_name": "web-1"}));
    let provider = ScriptedProvider::new(vec![
        tool_turn(Some("The pod is out of memory."), vec![restart.clone()]),
        ChatResponse::text("Restarting web-1 needs your approval. Shall I proceed?"),
        tool_turn(None, vec![call("r2", "restart_kubernetes_pod", json!({"pod_name": "web-1"}))]),
        ChatResponse::text("web-1 was restarted."),
    ]);
    let mut h = harness(provider, 10);

    // First cycle: no approval
    let mut recorder = StepRecorder::new();
    let answer = h
        .agent
        .process_query("restart the app pod", &[], &mut recorder)
        .await
        .unwrap();

    assert_eq!(answer, "Restarting web-1 needs your approval. Shall I proceed?");
    assert_eq!(h.restarts.load(Ordering::SeqCst), 0);
    assert_eq!(h.agent.pending_actions(), &[restart]);
    assert_eq!(recorder.tools_used(), 0);
    assert!(recorder
        .steps()
        .iter()
        .any(|s| s.label == "blocked restart_kubernetes_pod"));
    assert!(recorder.steps().iter().any(|s| s.label == "reasoning"));

    let fed_back = h.sent(1);
    let blocked = fed_back.last().unwrap();
    assert_eq!(blocked.tool_call_id.as_deref(), Some("r1"));
    assert_eq!(
        blocked.content.as_deref(),
        Some(blocked_notice("restart_kubernetes_pod").as_str())
    );
    // The model turn is kept whole, blocked call included
    let assistant = &fed_back[fed_back.len() - 2];
    assert_eq!(assistant.content.as_deref(), Some("The pod is out of memory."));
    assert_eq!(assistant.tool_calls.as_ref().unwrap().len(), 1);

    // Second cycle: operator confirms
    let history = vec![
        Message::user("restart the app pod"),
        Message::assistant(answer),
    ];
    let answer = h
        .agent
        .process_query("Yes!", &history, &mut NullObserver)
        .await
        .unwrap();

    assert_eq!(answer, "web-1 was restarted.");
    assert_eq!(h.restarts.load(Ordering::SeqCst), 1);
    assert!(h.agent.pending_actions().is_empty());

    let result = h.sent(3).last().unwrap().clone();
    assert_eq!(result.tool_call_id.as_deref(), Some("r2"));
    assert!(result
        .content
        .unwrap()
        .starts_with("restart_kubernetes_pod done with"));
}

#[tokio::test]
async fn test_hedged_reply_does_not_grant_approval() {
    let provider = ScriptedProvider::new(vec![
        tool_turn(None, vec![call("r1", "restart_kubernetes_pod", json!({}))]),
        ChatResponse::text("Please confirm."),
    ]);
    let mut h = harness(provider, 10);

    h.agent
        .process_query("I guess so", &[], &mut NullObserver)
        .await
        .unwrap();

    assert_eq!(h.restarts.load(Ordering::SeqCst), 0);
    assert_eq!(h.agent.pending_actions().len(), 1);
}

#[tokio::test]
async fn test_every_call_in_a_turn_gets_one_result_in_order() {
    let provider = ScriptedProvider::new(vec![
        tool_turn(
            None,
            vec![
                call("a", "list_log_files", json!({})),
                call("b", "restart_kubernetes_pod", json!({"pod_name": "web-1"})),
                call("c", "nonexistent_tool", json!({})),
                call("d", "flaky_probe", json!({})),
            ],
        ),
        ChatResponse::text("done"),
    ]);
    let mut h = harness(provider, 10);

    h.agent
        .process_query("investigate", &[], &mut NullObserver)
        .await
        .unwrap();

    let sent = h.sent(1);
    let results: Vec<&Message> = sent.iter().filter(|m| m.role == "tool").collect();
    let ids: Vec<&str> = results
        .iter()
        .map(|m| m.tool_call_id.as_deref().unwrap())
        .collect();
    assert_eq!(ids, ["a", "b", "c", "d"]);

    assert!(results[0].content.as_deref().unwrap().starts_with("Available log files"));
    assert_eq!(
        results[1].content.as_deref(),
        Some(blocked_notice("restart_kubernetes_pod").as_str())
    );
    assert_eq!(
        results[2].content.as_deref(),
        Some("Tool 'nonexistent_tool' not found")
    );
    assert_eq!(results[3].content.as_deref(), Some("Error: probe crashed"));
    assert_eq!(h.agent.pending_actions().len(), 1);
}

#[tokio::test]
async fn test_tool_failure_does_not_abort_cycle() {
    let provider = ScriptedProvider::new(vec![
        tool_turn(None, vec![call("p", "flaky_probe", json!({}))]),
        ChatResponse::text("The probe failed; check the agent."),
    ]);
    let mut h = harness(provider, 10);
    let mut recorder = StepRecorder::new();

    let answer = h
        .agent
        .process_query("probe it", &[], &mut recorder)
        .await
        .unwrap();

    assert_eq!(answer, "The probe failed; check the agent.");
    assert_eq!(h.failures.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.tools_used(), 1);
    let failed = recorder
        .steps()
        .iter()
        .find(|s| s.label == "fail flaky_probe")
        .unwrap();
    assert_eq!(failed.detail, "probe crashed");
}

#[tokio::test]
async fn test_unknown_tool_reports_start_but_no_end() {
    let provider = ScriptedProvider::new(vec![
        tool_turn(None, vec![call("x", "delete_everything", json!({}))]),
        ChatResponse::text("I cannot do that."),
    ]);
    let mut h = harness(provider, 10);
    let mut recorder = StepRecorder::new();

    let answer = h
        .agent
        .process_query("wipe it", &[], &mut recorder)
        .await
        .unwrap();

    assert_eq!(answer, "I cannot do that.");
    assert_eq!(recorder.tools_used(), 0);
    assert!(recorder
        .steps()
        .iter()
        .any(|s| s.label == "start delete_everything"));
}

#[tokio::test]
async fn test_ceiling_returns_last_intermediate_text() {
    let provider = ScriptedProvider::repeating(tool_turn(
        Some("Still digging through logs"),
        vec![call("l", "list_log_files", json!({}))],
    ));
    let mut h = harness(provider, 3);

    let answer = h
        .agent
        .process_query("find the root cause", &[], &mut NullObserver)
        .await
        .unwrap();

    assert_eq!(answer, "Still digging through logs");
    assert_eq!(h.invocations(), 4);
}

#[tokio::test]
async fn test_ceiling_without_text_falls_back() {
    let provider =
        ScriptedProvider::repeating(tool_turn(None, vec![call("l", "list_log_files", json!({}))]));
    let mut h = harness(provider, 10);
    let mut recorder = StepRecorder::new();

    let answer = h
        .agent
        .process_query("loop forever", &[], &mut recorder)
        .await
        .unwrap();

    assert_eq!(answer, MAX_STEPS_REACHED);
    assert_eq!(h.invocations(), 11);
    assert_eq!(recorder.tools_used(), 10);
}

#[tokio::test]
async fn test_empty_final_text_uses_intermediate() {
    let provider = ScriptedProvider::new(vec![
        tool_turn(Some("app.log shows an OOM at 10:05."), vec![call("l", "list_log_files", json!({}))]),
        ChatResponse::text("   "),
    ]);
    let mut h = harness(provider, 10);

    let answer = h.agent.process_query("why?", &[], &mut NullObserver).await.unwrap();
    assert_eq!(answer, "app.log shows an OOM at 10:05.");
}

#[tokio::test]
async fn test_empty_final_text_without_intermediate() {
    let provider = ScriptedProvider::new(vec![ChatResponse::tool_calls(None, vec![])]);
    let mut h = harness(provider, 10);

    let answer = h.agent.process_query("hm", &[], &mut NullObserver).await.unwrap();
    assert_eq!(answer, NO_RESPONSE);
}

#[tokio::test]
async fn test_model_failure_propagates() {
    let provider = ScriptedProvider::failing(ProviderError::Api("invalid API key (401)".to_string()));
    let mut h = harness(provider, 10);
    let mut recorder = StepRecorder::new();

    let err = h
        .agent
        .process_query("hello", &[], &mut recorder)
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::Provider(ProviderError::Api(_))));
    assert!(!recorder.is_complete());
    assert!(recorder.last_error().unwrap().contains("invalid API key"));
}

#[tokio::test]
async fn test_pending_actions_reset_each_cycle() {
    let provider = ScriptedProvider::new(vec![
        tool_turn(None, vec![call("r1", "restart_kubernetes_pod", json!({}))]),
        ChatResponse::text("Confirm?"),
        ChatResponse::text("Nothing to do."),
    ]);
    let mut h = harness(provider, 10);

    h.agent.process_query("restart", &[], &mut NullObserver).await.unwrap();
    assert_eq!(h.agent.pending_actions().len(), 1);

    h.agent.process_query("never mind", &[], &mut NullObserver).await.unwrap();
    assert!(h.agent.pending_actions().is_empty());
}

#[tokio::test]
async fn test_with_provider_uses_config_tools() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.agent.log_directory = dir.path().to_string_lossy().into_owned();
    config.agent.max_iterations = 4;

    let provider = ScriptedProvider::new(vec![
        tool_turn(None, vec![call("r", "restart_kubernetes_pod", json!({"pod_name": "web-1"}))]),
        ChatResponse::text("Restarted."),
    ]);
    let seen = provider.seen.clone();
    let mut agent = AgentLoop::with_provider(Arc::new(provider), &config);

    assert_eq!(agent.max_iterations(), 4);
    assert_eq!(agent.client().tools().len(), 6);
    assert_eq!(agent.client().model(), "gemini-2.5-flash");

    let answer = agent.process_query("ok", &[], &mut NullObserver).await.unwrap();
    assert_eq!(answer, "Restarted.");

    let result = seen.lock().unwrap()[1].last().unwrap().clone();
    assert_eq!(
        result.content.as_deref(),
        Some(
            "[SIMULATED] Successfully restarted pod 'web-1' in namespace 'production'. \
             Pod will be recreated automatically."
        )
    );
}
