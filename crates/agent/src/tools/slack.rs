//! Incident notifications to Slack

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use logpilot_config::Config;

use super::{ToolClass, ToolTrait};

const FOOTER: &str = "Sent by AI Logging Agent | DevOps Automation";

/// Posts a Block Kit incident report to a webhook, or simulates it
pub struct SlackNotificationTool {
    webhook_url: Option<String>,
    default_channel: String,
    client: reqwest::Client,
}

impl SlackNotificationTool {
    pub fn new(webhook_url: Option<String>, default_channel: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.filter(|url| !url.trim().is_empty()),
            default_channel: default_channel.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Some(config.slack.webhook_url.clone()),
            config.slack.channel.clone(),
        )
    }

    pub fn is_live(&self) -> bool {
        self.webhook_url.is_some()
    }
}

fn default_severity() -> String {
    "P1".to_string()
}

#[derive(Deserialize)]
struct NotifyArgs {
    #[serde(default)]
    channel: Option<String>,
    summary: String,
    #[serde(default = "default_severity")]
    severity: String,
    #[serde(default)]
    details: String,
    #[serde(default)]
    actions_taken: String,
}

/// Tag shown in front of the severity in the message header
pub fn severity_tag(severity: &str) -> &'static str {
    match severity {
        "P1" => "[CRITICAL]",
        "P2" => "[HIGH]",
        "P3" => "[MEDIUM]",
        "info" => "[INFO]",
        _ => "[UNKNOWN]",
    }
}

fn mrkdwn_section(text: String) -> Value {
    json!({ "type": "section", "text": { "type": "mrkdwn", "text": text } })
}

/// Block Kit payload for one incident report
pub fn build_payload(
    channel: &str,
    summary: &str,
    severity: &str,
    details: &str,
    actions_taken: &str,
) -> Value {
    let tag = severity_tag(severity);

    let mut blocks = vec![
        json!({
            "type": "header",
            "text": {
                "type": "plain_text",
                "text": format!("{} {} Incident: {}", tag, severity, summary)
            }
        }),
        mrkdwn_section(format!("*Severity:* {}\n*Summary:* {}", severity, summary)),
    ];

    if !details.is_empty() {
        blocks.push(mrkdwn_section(format!("*Details:*\n{}", details)));
    }
    if !actions_taken.is_empty() {
        blocks.push(mrkdwn_section(format!("*Actions Taken:*\n{}", actions_taken)));
    }

    blocks.push(json!({
        "type": "context",
        "elements": [{ "type": "mrkdwn", "text": FOOTER }]
    }));

    json!({
        "channel": channel,
        "blocks": blocks,
        "text": format!("{} {}: {}", tag, severity, summary)
    })
}

#[async_trait]
impl ToolTrait for SlackNotificationTool {
    fn name(&self) -> &str {
        "send_slack_notification"
    }
    fn description(&self) -> &str {
        "Send an incident notification to a Slack channel with details about the issue and \
         actions taken. Use this AFTER an action has been executed to notify the team."
    }
    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "channel": {
                    "type": "string",
                    "description": "Slack channel name (e.g., '#devops-alerts', '#incident-response')"
                },
                "summary": {
                    "type": "string",
                    "description": "Brief incident summary (e.g., 'RDS connection exhaustion on orders-db-prod')"
                },
                "severity": {
                    "type": "string",
                    "description": "Incident severity level ('P1', 'P2', 'P3', 'info')"
                },
                "details": {
                    "type": "string",
                    "description": "Detailed description of the issue and root cause"
                },
                "actions_taken": {
                    "type": "string",
                    "description": "Description of remediation actions that were executed"
                }
            },
            "required": ["channel", "summary"]
        })
    }
    fn class(&self) -> ToolClass {
        ToolClass::AutoExecute
    }
    async fn execute(
        &self,
        args: Value,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let args: NotifyArgs = serde_json::from_value(args)?;
        let channel = args
            .channel
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| self.default_channel.clone());

        let payload = build_payload(
            &channel,
            &args.summary,
            &args.severity,
            &args.details,
            &args.actions_taken,
        );

        let Some(url) = &self.webhook_url else {
            info!(
                "Simulated Slack notification to {} ({}): {}",
                channel, args.severity, args.summary
            );
            debug!("Payload: {}", payload);
            return Ok(format!(
                "[SIMULATED] Slack notification sent to {}.\nSummary: {} - {}\n\
                 The team has been notified about the incident and actions taken.",
                channel, args.severity, args.summary
            ));
        };

        let response = self
            .client
            .post(url)
            .json(&payload)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| format!("Failed to send Slack notification: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("Slack API returned status {}", status.as_u16()).into());
        }

        info!("Slack notification sent to {}", channel);
        Ok(format!(
            "Slack notification sent to {}.\nSummary: {} - {}",
            channel, args.severity, args.summary
        ))
    }
}
