//! Pod restarts

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

use logpilot_config::Config;

use super::command;
use super::{ToolClass, ToolTrait};

/// Restarts a pod by deleting it so its controller recreates it
pub struct RestartKubernetesPodTool {
    live: bool,
    kubeconfig: Option<String>,
    context: Option<String>,
    default_namespace: String,
    timeout: Duration,
}

impl RestartKubernetesPodTool {
    /// Simulated restarts only
    pub fn simulated(default_namespace: impl Into<String>) -> Self {
        Self {
            live: false,
            kubeconfig: None,
            context: None,
            default_namespace: default_namespace.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let k8s = &config.kubernetes;
        let non_empty = |s: &str| Some(s.to_string()).filter(|s| !s.is_empty());
        Self {
            live: config.kubernetes_live(),
            kubeconfig: non_empty(&k8s.kubeconfig),
            context: non_empty(&k8s.context).filter(|c| c != "default"),
            default_namespace: k8s.default_namespace.clone(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Arguments passed to `kubectl`
    pub fn kubectl_args(&self, pod_name: &str, namespace: &str) -> Vec<String> {
        let mut args = vec![
            "delete".to_string(),
            "pod".to_string(),
            pod_name.to_string(),
            "-n".to_string(),
            namespace.to_string(),
        ];
        if let Some(context) = &self.context {
            args.push(format!("--context={}", context));
        }
        if let Some(kubeconfig) = &self.kubeconfig {
            args.push(format!("--kubeconfig={}", kubeconfig));
        }
        args
    }
}

/// Lowercase RFC 1123 name: alphanumerics, `-` and `.`, alphanumeric at both ends
fn is_valid_object_name(name: &str, max_len: usize, allow_dots: bool) -> bool {
    let bytes = name.as_bytes();
    let edge_ok =
        |b: Option<&u8>| matches!(b, Some(b) if b.is_ascii_lowercase() || b.is_ascii_digit());
    !name.is_empty()
        && name.len() <= max_len
        && edge_ok(bytes.first())
        && edge_ok(bytes.last())
        && bytes.iter().all(|b| {
            b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-' || (allow_dots && *b == b'.')
        })
}

pub fn is_valid_pod_name(name: &str) -> bool {
    is_valid_object_name(name, 253, true)
}

pub fn is_valid_namespace(name: &str) -> bool {
    is_valid_object_name(name, 63, false)
}

#[derive(Deserialize)]
struct RestartArgs {
    pod_name: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    reason: String,
}

#[async_trait]
impl ToolTrait for RestartKubernetesPodTool {
    fn name(&self) -> &str {
        "restart_kubernetes_pod"
    }
    fn description(&self) -> &str {
        "Restart a Kubernetes pod by deleting it (it will be recreated by its deployment/replicaset). \
         Causes service disruption and requires operator approval."
    }
    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "pod_name": {
                    "type": "string",
                    "description": "Name of the pod to restart (e.g., 'pod-java-app-7d9f8b6c5-xk2m9')"
                },
                "namespace": {
                    "type": "string",
                    "description": format!("Kubernetes namespace (default: '{}')", self.default_namespace)
                },
                "reason": {
                    "type": "string",
                    "description": "Reason for restart (e.g., 'OutOfMemoryError recovery')"
                }
            },
            "required": ["pod_name"]
        })
    }
    fn class(&self) -> ToolClass {
        ToolClass::ApprovalRequired
    }
    async fn execute(
        &self,
        args: serde_json::Value,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let args: RestartArgs = serde_json::from_value(args)?;
        let namespace = args
            .namespace
            .filter(|ns| !ns.trim().is_empty())
            .unwrap_or_else(|| self.default_namespace.clone());

        if !is_valid_pod_name(&args.pod_name) {
            warn!("Refusing restart of invalid pod name {:?}", args.pod_name);
            return Err(format!("'{}' is not a valid pod name", args.pod_name).into());
        }
        if !is_valid_namespace(&namespace) {
            warn!("Refusing restart in invalid namespace {:?}", namespace);
            return Err(format!("'{}' is not a valid namespace", namespace).into());
        }

        if !self.live {
            info!(
                "Simulated restart of pod {} in {} (reason: {})",
                args.pod_name, namespace, args.reason
            );
            return Ok(format!(
                "[SIMULATED] Successfully restarted pod '{}' in namespace '{}'. \
                 Pod will be recreated automatically.",
                args.pod_name, namespace
            ));
        }

        let output = command::run(
            "kubectl",
            &self.kubectl_args(&args.pod_name, &namespace),
            self.timeout,
        )
        .await?;

        if !output.success() {
            warn!("kubectl exited with {}: {}", output.code, output.message());
            return Err(format!(
                "kubectl could not restart pod '{}' in namespace '{}': {}",
                args.pod_name,
                namespace,
                output.message()
            )
            .into());
        }

        info!("Restarted pod {} in {}", args.pod_name, namespace);
        Ok(format!(
            "Successfully restarted pod '{}' in namespace '{}'. \
             Pod will be recreated automatically.\nReason: {}\n{}",
            args.pod_name,
            namespace,
            args.reason,
            output.message()
        ))
    }
}
