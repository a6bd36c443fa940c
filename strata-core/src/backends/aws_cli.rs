//! AWS CLI backend integration.
//!
//! Drives the `aws` binary with `--output json` and parses its responses.
//! Credential and region resolution stay with the CLI's own configuration
//! chain; this adapter only passes `--region` through.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::json;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, StrataError};
use crate::types::{NotificationRule, StackOutput, StackRequest};

use super::{FunctionRegistry, GrantOutcome, InvokePermission, ProvisioningBackend, StorageRegistry};

/// Backend driving the `aws` command-line binary.
#[derive(Clone)]
pub struct AwsCliBackend {
    /// Path to the `aws` binary.
    binary_path: PathBuf,
    /// Region passed to every invocation.
    region: String,
}

impl AwsCliBackend {
    /// Create a backend, auto-detecting the binary location.
    pub fn new(region: impl Into<String>) -> Result<Self> {
        let binary_path = Self::find_aws_binary()?;
        Ok(Self { binary_path, region: region.into() })
    }

    /// Create a backend with a specific binary path.
    pub fn with_path(binary_path: PathBuf, region: impl Into<String>) -> Result<Self> {
        if !binary_path.exists() {
            return Err(StrataError::FileNotFound {
                path: binary_path,
                hint: "Please install the AWS CLI: https://aws.amazon.com/cli/".into(),
            });
        }
        Ok(Self { binary_path, region: region.into() })
    }

    /// Find the `aws` binary in common locations.
    fn find_aws_binary() -> Result<PathBuf> {
        if let Ok(output) = std::process::Command::new("which").arg("aws").output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Ok(PathBuf::from(path));
                }
            }
        }

        let common_paths = ["/usr/local/bin/aws", "/usr/bin/aws", "/opt/homebrew/bin/aws"];
        for path in common_paths {
            let path = PathBuf::from(path);
            if path.exists() {
                return Ok(path);
            }
        }

        Err(StrataError::FileNotFound {
            path: PathBuf::from("aws"),
            hint: "Please install the AWS CLI: https://aws.amazon.com/cli/".into(),
        })
    }

    /// Run one CLI invocation, returning (success, stdout, stderr).
    async fn run(&self, args: &[&str]) -> Result<(bool, Vec<u8>, String)> {
        debug!(args = ?args, "Running aws CLI");
        let output = Command::new(&self.binary_path)
            .args(args)
            .arg("--region")
            .arg(&self.region)
            .arg("--output")
            .arg("json")
            .output()
            .await
            .map_err(|e| StrataError::Internal(format!("Failed to run aws CLI: {}", e)))?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Ok((output.status.success(), output.stdout, stderr))
    }

    async fn describe_stack(&self, name: &str) -> Result<StackSummary> {
        let (success, stdout, stderr) =
            self.run(&["cloudformation", "describe-stacks", "--stack-name", name]).await?;

        if !success {
            if stderr.contains("does not exist") {
                return Err(StrataError::StackNotFound { stack: name.to_string() });
            }
            return Err(StrataError::Internal(format!(
                "describe-stacks failed for {}: {}",
                name, stderr
            )));
        }

        let described: DescribeStacksOutput = serde_json::from_slice(&stdout).map_err(|e| {
            StrataError::Internal(format!("Failed to parse describe-stacks output: {}", e))
        })?;

        described
            .stacks
            .into_iter()
            .next()
            .ok_or_else(|| StrataError::StackNotFound { stack: name.to_string() })
    }
}

#[async_trait::async_trait]
impl ProvisioningBackend for AwsCliBackend {
    async fn submit_stack(&self, request: &StackRequest) -> Result<String> {
        let mut args = vec![
            "cloudformation",
            "create-stack",
            "--stack-name",
            &request.name,
            "--template-url",
            &request.template_url,
        ];
        let capability_tokens: Vec<&str> =
            request.capabilities.iter().map(|c| c.as_str()).collect();
        if !capability_tokens.is_empty() {
            args.push("--capabilities");
            args.extend(&capability_tokens);
        }

        let (success, stdout, stderr) = self.run(&args).await?;
        if !success {
            return Err(StrataError::SubmissionFailed {
                stack: request.name.clone(),
                reason: stderr,
            });
        }

        let created: CreateStackOutput = serde_json::from_slice(&stdout).map_err(|e| {
            StrataError::Internal(format!("Failed to parse create-stack output: {}", e))
        })?;
        Ok(created.stack_id)
    }

    async fn stack_status(&self, name: &str) -> Result<String> {
        Ok(self.describe_stack(name).await?.stack_status)
    }

    async fn stack_outputs(&self, name: &str) -> Result<Vec<StackOutput>> {
        let stack = self.describe_stack(name).await?;
        Ok(stack
            .outputs
            .unwrap_or_default()
            .into_iter()
            .map(|o| StackOutput { key: o.output_key, value: o.output_value })
            .collect())
    }
}

#[async_trait::async_trait]
impl FunctionRegistry for AwsCliBackend {
    async fn add_invoke_permission(&self, permission: &InvokePermission) -> Result<GrantOutcome> {
        let (success, _stdout, stderr) = self
            .run(&[
                "lambda",
                "add-permission",
                "--function-name",
                &permission.function_name,
                "--principal",
                &permission.principal,
                "--statement-id",
                &permission.statement_id,
                "--action",
                &permission.action,
                "--source-arn",
                &permission.source_arn,
            ])
            .await?;

        if success {
            return Ok(GrantOutcome::Granted);
        }
        if stderr.contains("ResourceConflictException") {
            return Ok(GrantOutcome::Conflict);
        }
        Err(StrataError::GrantFailed {
            function: permission.function_name.clone(),
            reason: stderr,
        })
    }
}

#[async_trait::async_trait]
impl StorageRegistry for AwsCliBackend {
    async fn put_notification_rule(&self, bucket: &str, rule: &NotificationRule) -> Result<()> {
        let events: Vec<&str> = rule.events.iter().map(|e| e.as_str()).collect();
        let configuration = json!({
            "LambdaFunctionConfigurations": [{
                "LambdaFunctionArn": rule.function_arn,
                "Events": events,
                "Filter": {
                    "Key": {
                        "FilterRules": [{ "Name": "prefix", "Value": rule.key_prefix }]
                    }
                }
            }]
        })
        .to_string();

        let (success, _stdout, stderr) = self
            .run(&[
                "s3api",
                "put-bucket-notification-configuration",
                "--bucket",
                bucket,
                "--notification-configuration",
                &configuration,
            ])
            .await?;

        if !success {
            return Err(StrataError::NotificationFailed {
                bucket: bucket.to_string(),
                reason: stderr,
            });
        }
        Ok(())
    }

    async fn put_bucket_policy(&self, bucket: &str, policy_json: &str) -> Result<()> {
        let (success, _stdout, stderr) = self
            .run(&["s3api", "put-bucket-policy", "--bucket", bucket, "--policy", policy_json])
            .await?;

        if !success {
            return Err(StrataError::PolicyWriteFailed {
                bucket: bucket.to_string(),
                reason: stderr,
            });
        }
        Ok(())
    }

    async fn put_object(&self, bucket: &str, key: &str, local_path: &Path) -> Result<()> {
        if !local_path.exists() {
            return Err(StrataError::FileNotFound {
                path: local_path.to_path_buf(),
                hint: "Check the smoke-test file path".into(),
            });
        }
        let body = local_path.to_string_lossy();

        let (success, _stdout, stderr) = self
            .run(&["s3api", "put-object", "--bucket", bucket, "--key", key, "--body", &body])
            .await?;

        if !success {
            return Err(StrataError::UploadFailed {
                bucket: bucket.to_string(),
                key: key.to_string(),
                reason: stderr,
            });
        }
        Ok(())
    }
}

// AWS CLI JSON output structures

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateStackOutput {
    stack_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStacksOutput {
    stacks: Vec<StackSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StackSummary {
    stack_status: String,
    outputs: Option<Vec<OutputEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OutputEntry {
    output_key: String,
    output_value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_describe_stacks_output() {
        let output = r#"{
            "Stacks": [
                {
                    "StackId": "arn:aws:cloudformation:us-east-1:123:stack/s1/abc",
                    "StackName": "s1",
                    "StackStatus": "CREATE_COMPLETE",
                    "Outputs": [
                        { "OutputKey": "ApiUrl", "OutputValue": "https://x" }
                    ]
                }
            ]
        }"#;

        let described: DescribeStacksOutput = serde_json::from_str(output).unwrap();
        assert_eq!(described.stacks.len(), 1);
        assert_eq!(described.stacks[0].stack_status, "CREATE_COMPLETE");
        let outputs = described.stacks[0].outputs.as_ref().unwrap();
        assert_eq!(outputs[0].output_key, "ApiUrl");
        assert_eq!(outputs[0].output_value, "https://x");
    }

    #[test]
    fn parse_describe_stacks_without_outputs() {
        let output = r#"{
            "Stacks": [
                { "StackStatus": "CREATE_IN_PROGRESS" }
            ]
        }"#;

        let described: DescribeStacksOutput = serde_json::from_str(output).unwrap();
        assert!(described.stacks[0].outputs.is_none());
    }

    #[test]
    fn parse_create_stack_output() {
        let output = r#"{ "StackId": "arn:aws:cloudformation:us-east-1:123:stack/s1/abc" }"#;
        let created: CreateStackOutput = serde_json::from_str(output).unwrap();
        assert!(created.stack_id.ends_with("stack/s1/abc"));
    }
}
