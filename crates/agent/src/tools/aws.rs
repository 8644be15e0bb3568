//! RDS instance reboots

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

use logpilot_config::Config;

use super::command;
use super::{ToolClass, ToolTrait};

/// Reboots an RDS instance through the `aws` CLI, or simulates it
pub struct RebootRdsInstanceTool {
    live: bool,
    region: String,
    default_instance: Option<String>,
    timeout: Duration,
}

impl RebootRdsInstanceTool {
    pub fn simulated(region: impl Into<String>) -> Self {
        Self {
            live: false,
            region: region.into(),
            default_instance: None,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            live: config.aws_live(),
            region: config.aws.region.clone(),
            default_instance: Some(config.aws.rds_instance_id.clone()).filter(|id| !id.is_empty()),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    fn rds_args(&self, action: &str, instance: &str) -> Vec<String> {
        vec![
            "rds".to_string(),
            action.to_string(),
            "--db-instance-identifier".to_string(),
            instance.to_string(),
            "--region".to_string(),
            self.region.clone(),
        ]
    }

    async fn instance_status(
        &self,
        instance: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let mut args = self.rds_args("describe-db-instances", instance);
        args.extend(
            [
                "--query",
                "DBInstances[0].DBInstanceStatus",
                "--output",
                "text",
            ]
            .map(String::from),
        );

        let output = command::run("aws", &args, self.timeout).await?;
        if !output.success() {
            if output.message().contains("DBInstanceNotFound") {
                return Err(format!(
                    "RDS instance '{}' not found in region {}.",
                    instance, self.region
                )
                .into());
            }
            return Err(format!("AWS API error: {}", output.message()).into());
        }
        Ok(output.stdout.trim().to_string())
    }

    async fn reboot_live(
        &self,
        instance: &str,
        reason: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let status = self.instance_status(instance).await?;
        if status != "available" {
            warn!("Refusing to reboot {} while {}", instance, status);
            return Ok(format!(
                "Cannot reboot RDS instance '{}'. Current status: {}. \
                 Instance must be 'available' to reboot.",
                instance, status
            ));
        }

        let output = command::run(
            "aws",
            &self.rds_args("reboot-db-instance", instance),
            self.timeout,
        )
        .await?;
        if !output.success() {
            return Err(format!("AWS API error: {}", output.message()).into());
        }

        info!("Reboot of {} initiated in {}", instance, self.region);
        Ok(format!(
            "Successfully initiated reboot of RDS instance '{}' in region {}.\n\
             Reason: {}\n\
             Previous status: {}\n\
             Expected downtime: 1-3 minutes for a standard reboot.\n\
             The instance will transition: available → rebooting → available.\n\
             All existing connections will be dropped and new connections can be \
             established after reboot.",
            instance, self.region, reason, status
        ))
    }
}

#[derive(Deserialize)]
struct RebootArgs {
    #[serde(default)]
    db_instance_id: Option<String>,
    #[serde(default)]
    reason: String,
}

#[async_trait]
impl ToolTrait for RebootRdsInstanceTool {
    fn name(&self) -> &str {
        "reboot_rds_instance"
    }
    fn description(&self) -> &str {
        "Reboot an AWS RDS database instance to reset connections and restore service. \
         Use when logs show 'Too many connections' errors across several application pods. \
         Causes a 1-3 minute interruption and requires operator approval."
    }
    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "db_instance_id": {
                    "type": "string",
                    "description": "The RDS instance identifier (e.g., 'orders-db-prod')"
                },
                "reason": {
                    "type": "string",
                    "description": "Reason for the reboot (e.g., 'Connection pool exhaustion recovery')"
                }
            },
            "required": ["db_instance_id"]
        })
    }
    fn class(&self) -> ToolClass {
        ToolClass::ApprovalRequired
    }
    async fn execute(
        &self,
        args: serde_json::Value,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let args: RebootArgs = serde_json::from_value(args)?;
        let instance = args
            .db_instance_id
            .filter(|id| !id.trim().is_empty())
            .or_else(|| self.default_instance.clone())
            .ok_or("db_instance_id is required")?;

        if self.live {
            return self.reboot_live(&instance, &args.reason).await;
        }

        info!(
            "Simulated reboot of {} in {} (reason: {})",
            instance, self.region, args.reason
        );
        Ok(format!(
            "[SIMULATED] Successfully initiated reboot of RDS instance '{}' in region {}.\n\
             Reason: {}\n\
             Expected downtime: 1-3 minutes.\n\
             All existing database connections will be dropped. \
             Application pods will reconnect automatically via HikariCP connection pool.",
            instance, self.region, args.reason
        ))
    }
}
