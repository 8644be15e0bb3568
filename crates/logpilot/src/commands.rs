//! CLI command implementations

use anyhow::{Context, Result};
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

use logpilot_agent::context::DEFAULT_SYSTEM_PROMPT;
use logpilot_agent::tools::default_registry;
use logpilot_agent::{AgentLoop, ProgressObserver, Step};
use logpilot_config::Config;
use logpilot_provider::Message;

/// Human label for a tool in progress output
pub fn tool_label(name: &str) -> &str {
    match name {
        "list_log_files" => "Listing log files",
        "read_log_file" => "Reading log file",
        "search_logs" => "Searching logs",
        "reboot_rds_instance" => "Rebooting RDS instance",
        "restart_kubernetes_pod" => "Restarting Kubernetes pod",
        "send_slack_notification" => "Sending Slack notification",
        other => other,
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

/// One-line preview of a tool result
pub fn summarize_result(name: &str, result: &str) -> String {
    match name {
        "list_log_files" => format!("found {}", plural(result.matches(".log").count(), "log file")),
        "read_log_file" => "file read".to_string(),
        "search_logs" => {
            let first_line = result.lines().next().unwrap_or_default();
            if first_line.contains("Found") {
                first_line.to_lowercase()
            } else {
                "search complete".to_string()
            }
        }
        "send_slack_notification" => "notification sent".to_string(),
        "reboot_rds_instance" | "restart_kubernetes_pod" => "initiated".to_string(),
        _ => result.chars().take(80).collect(),
    }
}

/// Prints cycle progress to the terminal and keeps the steps for `/steps`
#[derive(Default)]
pub struct ConsoleProgress {
    tool_count: usize,
    steps: Vec<Step>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn tool_count(&self) -> usize {
        self.tool_count
    }

    /// Status line printed when a cycle finishes
    pub fn done_line(&self) -> String {
        if self.tool_count == 0 {
            "Done".to_string()
        } else {
            format!("Done — {} used", plural(self.tool_count, "tool"))
        }
    }
}

impl ProgressObserver for ConsoleProgress {
    fn on_thinking(&mut self) {
        println!("  ◆ Thinking...");
    }

    fn on_reasoning(&mut self, text: &str) {
        println!("  {}", text);
        self.steps.push(Step::new("Reasoning", text));
    }

    fn on_tool_start(&mut self, name: &str, _args: &Value) {
        self.tool_count += 1;
        println!("  ◆ {}...", tool_label(name));
    }

    fn on_tool_end(&mut self, name: &str, result: &str, success: bool) {
        let label = tool_label(name);
        let marker = if success { "OK" } else { "FAIL" };
        let preview = summarize_result(name, result);
        println!("  [{}] {} — {}", marker, label, preview);
        self.steps
            .push(Step::new(label, format!("[{}] {}", marker, preview)));
    }

    fn on_approval_skipped(&mut self, name: &str, _args: &Value) {
        let label = tool_label(name);
        println!("  [BLOCKED] {} — requires your approval", label);
        self.steps.push(Step::new(label, "[BLOCKED] requires approval"));
    }

    fn complete(&mut self) {
        println!("  ◆ {}", self.done_line());
    }

    fn error(&mut self, message: &str) {
        println!("  ◆ Error: {}", message);
    }
}

/// Drop the oldest user/assistant exchanges so at most `max` turns remain.
///
/// The kept history always opens with a user turn.
pub fn trim_history(history: &mut Vec<Message>, max: usize) {
    let keep = max - max % 2;
    if history.len() > keep {
        let excess = history.len() - keep;
        history.drain(..excess);
    }
    let leading = history
        .iter()
        .take_while(|m| m.role != "user")
        .count();
    history.drain(..leading);
}

async fn load_config(config_path: &Path) -> Result<Config> {
    Config::load_layered(config_path)
        .await
        .with_context(|| format!("Failed to load config from {}", config_path.display()))
}

/// Chat with the agent
pub async fn chat_command(message: Option<String>, config_path: &Path) -> Result<()> {
    let config = load_config(config_path).await?;
    config
        .validate()
        .await
        .context("Configuration is incomplete. Run `logpilot status` to inspect it")?;

    let mut agent = AgentLoop::from_config(&config).context("Failed to set up the model backend")?;
    info!(
        "Agent ready: {} ({}), {} tools",
        agent.client().provider_name(),
        agent.client().model(),
        agent.tools().len()
    );

    let mut history: Vec<Message> = Vec::new();

    if let Some(msg) = message {
        let mut progress = ConsoleProgress::new();
        let answer = agent
            .process_query(&msg, &history, &mut progress)
            .await
            .context("The model could not be reached")?;
        println!("\n◆ {}", answer);
        return Ok(());
    }

    println!("◆ LogPilot interactive mode");
    println!("  'exit' to quit, /clear resets history, /pending shows held-back actions, /steps shows the last cycle");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut last_steps: Vec<Step> = Vec::new();

    loop {
        print!("\n◆ ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();
        match input {
            "" => continue,
            "exit" | "quit" => break,
            "/clear" => {
                history.clear();
                println!("History cleared.");
                continue;
            }
            "/pending" => {
                print_pending(&agent);
                continue;
            }
            "/steps" => {
                print_steps(&last_steps);
                continue;
            }
            _ => {}
        }

        let mut progress = ConsoleProgress::new();
        match agent.process_query(input, &history, &mut progress).await {
            Ok(answer) => {
                println!("\n◆ {}", answer);
                history.push(Message::user(input));
                history.push(Message::assistant(answer));
                trim_history(&mut history, config.agent.max_history_messages);
            }
            Err(e) => warn!("Cycle failed: {}", e),
        }
        last_steps = progress.steps().to_vec();
    }

    Ok(())
}

fn print_pending(agent: &AgentLoop) {
    let pending = agent.pending_actions();
    if pending.is_empty() {
        println!("No actions awaiting approval.");
        return;
    }
    println!("Awaiting approval (reply 'yes' to allow):");
    for call in pending {
        println!("  - {} {}", call.name, call.arguments);
    }
}

fn print_steps(steps: &[Step]) {
    if steps.is_empty() {
        println!("No steps recorded.");
        return;
    }
    for step in steps {
        println!("  {}: {}", step.label, step.detail);
    }
}

/// List the registered tools
pub async fn tools_command(config_path: &Path) -> Result<()> {
    let config = load_config(config_path).await?;
    let registry = default_registry(&config);

    println!("◆ Tools");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for tool in registry.list() {
        println!("{:<26} [{}]", tool.name(), tool.class().as_str());
        println!("    {}", tool.description());
    }

    Ok(())
}

fn mark(ok: bool, yes: &str, no: &str) -> String {
    format!("[{}]", if ok { yes } else { no })
}

/// Show configuration and integration status
pub async fn status_command(config_path: &Path) -> Result<()> {
    let config = load_config(config_path).await?;
    let log_dir = config.log_dir();

    println!("◆ LogPilot Status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "Config:      {} {}",
        config_path.display(),
        mark(config_path.exists(), "OK", "Missing")
    );
    println!("Provider:    {}", config.agent.provider);
    println!("Model:       {}", config.model());
    println!(
        "Credential:  {}",
        mark(config.has_credential(), "Set", "Missing")
    );
    println!(
        "Log dir:     {} {}",
        log_dir.display(),
        mark(log_dir.is_dir(), "OK", "Missing")
    );
    println!("Iterations:  {}", config.agent.max_iterations);
    println!(
        "Kubernetes:  {}",
        mark(config.kubernetes_live(), "Live", "Simulated")
    );
    println!("AWS RDS:     {}", mark(config.aws_live(), "Live", "Simulated"));
    println!("Slack:       {}", mark(config.slack_live(), "Live", "Simulated"));

    if let Err(e) = config.check() {
        println!("\n◆ Not ready: {}", e);
    } else {
        println!("\n◆ Ready");
    }

    Ok(())
}

/// Write a default config, create the log directory and a starter prompt
pub async fn init_command(config_path: &Path) -> Result<()> {
    println!("◆ Initializing LogPilot...");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = logpilot_config::init(config_path)
        .await
        .with_context(|| format!("Failed to initialize {}", config_path.display()))?;

    let prompt_path = config.system_prompt_path();
    if !prompt_path.exists() {
        tokio::fs::write(&prompt_path, DEFAULT_SYSTEM_PROMPT)
            .await
            .with_context(|| format!("Failed to write {}", prompt_path.display()))?;
        info!("◆ Created {}", prompt_path.display());
    }

    println!("Config:        {}", config_path.display());
    println!("Log dir:       {}", config.log_dir().display());
    println!("System prompt: {}", prompt_path.display());
    println!("\n◆ LogPilot initialized");
    println!("\nNext steps:");
    println!("  1. Set GEMINI_API_KEY (or LLM_PROVIDER=github and GITHUB_TOKEN) in .env");
    println!("  2. Put your .log files in {}", config.log_dir().display());
    println!("  3. Start chatting: logpilot chat -m \"What errors are in app.log?\"");

    Ok(())
}
