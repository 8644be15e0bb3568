//! Configuration management for LogPilot
//!
//! Settings are layered: built-in defaults, then the JSON config file, then
//! environment variables. The resulting [`Config`] is built once at startup
//! and handed by reference to everything that needs it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod paths;

pub use paths::{config_path, data_dir, expand_tilde};

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown LLM provider '{0}'. Supported values: gemini, github")]
    UnknownProvider(String),

    #[error("LLM_PROVIDER={provider} but {variable} is not set")]
    MissingCredential {
        provider: LlmProvider,
        variable: &'static str,
    },

    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Which model backend drives the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Gemini,
    Github,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Gemini => "gemini",
            LlmProvider::Github => "github",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(LlmProvider::Gemini),
            "github" => Ok(LlmProvider::Github),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// Agent loop and prompt settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefaults {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_log_directory")]
    pub log_directory: String,
    #[serde(default = "default_system_prompt_path")]
    pub system_prompt_path: String,
    #[serde(default = "default_examples_path")]
    pub examples_path: String,
    #[serde(default = "default_max_history_messages")]
    pub max_history_messages: usize,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_iterations: default_max_iterations(),
            log_directory: default_log_directory(),
            system_prompt_path: default_system_prompt_path(),
            examples_path: default_examples_path(),
            max_history_messages: default_max_history_messages(),
        }
    }
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_max_iterations() -> u32 {
    10
}

fn default_log_directory() -> String {
    "logs".to_string()
}

fn default_system_prompt_path() -> String {
    "system_prompt.txt".to_string()
}

fn default_examples_path() -> String {
    "examples.txt".to_string()
}

fn default_max_history_messages() -> usize {
    20
}

/// Google Gemini backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_gemini_model(),
            api_base: None,
        }
    }
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

/// GitHub Models backend (OpenAI-compatible endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_github_model")]
    pub model: String,
    #[serde(default = "default_github_endpoint")]
    pub endpoint: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            model: default_github_model(),
            endpoint: default_github_endpoint(),
        }
    }
}

fn default_github_model() -> String {
    "openai/gpt-5".to_string()
}

fn default_github_endpoint() -> String {
    "https://models.github.ai/inference".to_string()
}

/// All model backends
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub github: GithubConfig,
}

/// Kubernetes cluster access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KubernetesConfig {
    #[serde(default)]
    pub kubeconfig: String,
    #[serde(default = "default_k8s_context")]
    pub context: String,
    #[serde(default = "default_namespace")]
    pub default_namespace: String,
    #[serde(default)]
    pub live: bool,
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self {
            kubeconfig: String::new(),
            context: default_k8s_context(),
            default_namespace: default_namespace(),
            live: false,
        }
    }
}

fn default_k8s_context() -> String {
    "default".to_string()
}

fn default_namespace() -> String {
    "production".to_string()
}

/// AWS access for RDS actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub rds_instance_id: String,
    #[serde(default)]
    pub live: bool,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            rds_instance_id: String::new(),
            live: false,
        }
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// Slack incident notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    #[serde(default)]
    pub webhook_url: String,
    #[serde(default = "default_slack_channel")]
    pub channel: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            channel: default_slack_channel(),
        }
    }
}

fn default_slack_channel() -> String {
    "#devops-alerts".to_string()
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentDefaults,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub kubernetes: KubernetesConfig,
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub slack: SlackConfig,
}

/// Environment variables whose presence means AWS credentials are available
const AWS_CREDENTIAL_VARS: &[&str] = &["AWS_ACCESS_KEY_ID", "AWS_PROFILE", "AWS_ROLE_ARN"];

impl Config {
    /// Load from the default location
    pub async fn load() -> Result<Self> {
        let path = config_path();
        Self::load_from(&path).await
    }

    /// Load from a specific location, falling back to defaults when absent
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        debug!("Reading config from {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load the file at `path` and overlay the process environment
    pub async fn load_layered(path: &Path) -> Result<Self> {
        let mut config = Self::load_from(path).await?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Save to the default location
    pub async fn save(&self) -> Result<()> {
        let path = config_path();
        self.save_to(&path).await
    }

    /// Save to a specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("Writing config to {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Overlay environment variables read through `lookup`.
    ///
    /// Empty values are ignored so that a blank line in `.env` does not wipe
    /// a value set in the config file.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("LLM_PROVIDER") {
            self.agent.provider = v.parse()?;
        }
        if let Some(v) = get("TEMPERATURE") {
            self.agent.temperature = parse_number("TEMPERATURE", &v)?;
        }
        if let Some(v) = get("MAX_ITERATIONS") {
            self.agent.max_iterations = parse_number("MAX_ITERATIONS", &v)?;
        }
        if let Some(v) = get("LOG_DIRECTORY") {
            self.agent.log_directory = v;
        }

        if let Some(v) = get("GEMINI_API_KEY") {
            self.providers.gemini.api_key = v;
        }
        if let Some(v) = get("GEMINI_MODEL") {
            self.providers.gemini.model = v;
        }
        if let Some(v) = get("GITHUB_TOKEN") {
            self.providers.github.token = v;
        }
        if let Some(v) = get("GITHUB_MODEL") {
            self.providers.github.model = v;
        }
        if let Some(v) = get("GITHUB_ENDPOINT") {
            self.providers.github.endpoint = v;
        }

        if let Some(v) = get("K8S_KUBECONFIG") {
            self.kubernetes.kubeconfig = v;
        }
        if let Some(v) = get("K8S_CONTEXT") {
            self.kubernetes.context = v;
        }
        if let Some(v) = get("K8S_DEFAULT_NAMESPACE") {
            self.kubernetes.default_namespace = v;
        }

        if let Some(v) = get("AWS_REGION") {
            self.aws.region = v;
        }
        if let Some(v) = get("AWS_RDS_INSTANCE_ID") {
            self.aws.rds_instance_id = v;
        }
        if AWS_CREDENTIAL_VARS.iter().any(|key| get(key).is_some()) {
            self.aws.live = true;
        }

        if let Some(v) = get("SLACK_WEBHOOK_URL") {
            self.slack.webhook_url = v;
        }
        if let Some(v) = get("SLACK_CHANNEL") {
            self.slack.channel = v;
        }

        Ok(())
    }

    /// Check settings that do not touch the filesystem
    pub fn check(&self) -> Result<()> {
        match self.agent.provider {
            LlmProvider::Gemini if self.providers.gemini.api_key.is_empty() => {
                return Err(ConfigError::MissingCredential {
                    provider: LlmProvider::Gemini,
                    variable: "GEMINI_API_KEY",
                });
            }
            LlmProvider::Github if self.providers.github.token.is_empty() => {
                return Err(ConfigError::MissingCredential {
                    provider: LlmProvider::Github,
                    variable: "GITHUB_TOKEN",
                });
            }
            _ => {}
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::Invalid {
                key: "max_iterations".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Check settings and make sure the log directory exists
    pub async fn validate(&self) -> Result<()> {
        self.check()?;

        let log_dir = self.log_dir();
        if !log_dir.exists() {
            warn!("Log directory {:?} missing, creating it", log_dir);
            tokio::fs::create_dir_all(&log_dir).await?;
        }
        Ok(())
    }

    /// Directory the log tools read from
    pub fn log_dir(&self) -> PathBuf {
        expand_tilde(&self.agent.log_directory)
    }

    pub fn system_prompt_path(&self) -> PathBuf {
        expand_tilde(&self.agent.system_prompt_path)
    }

    pub fn examples_path(&self) -> PathBuf {
        expand_tilde(&self.agent.examples_path)
    }

    /// Model name of the selected backend
    pub fn model(&self) -> &str {
        match self.agent.provider {
            LlmProvider::Gemini => &self.providers.gemini.model,
            LlmProvider::Github => &self.providers.github.model,
        }
    }

    /// Whether the selected backend has its credential
    pub fn has_credential(&self) -> bool {
        match self.agent.provider {
            LlmProvider::Gemini => !self.providers.gemini.api_key.is_empty(),
            LlmProvider::Github => !self.providers.github.token.is_empty(),
        }
    }

    /// Pod restarts go to a real cluster
    pub fn kubernetes_live(&self) -> bool {
        self.kubernetes.live || !self.kubernetes.kubeconfig.is_empty()
    }

    /// RDS reboots go to real AWS
    pub fn aws_live(&self) -> bool {
        self.aws.live
    }

    /// Notifications are posted to a real webhook
    pub fn slack_live(&self) -> bool {
        !self.slack.webhook_url.is_empty()
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key: key.to_string(),
        message: e.to_string(),
    })
}

/// Write a default config when none exists and prepare the log directory
pub async fn init(path: &Path) -> Result<Config> {
    if path.exists() {
        warn!("Config already exists at {:?}", path);
    } else {
        Config::default().save_to(path).await?;
        info!("Created config at {:?}", path);
    }

    let config = Config::load_from(path).await?;
    tokio::fs::create_dir_all(config.log_dir()).await?;
    info!("Log directory ready at {:?}", config.log_dir());

    Ok(config)
}
