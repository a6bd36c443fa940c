//! Pipeline orchestration across provisioning stages.
//!
//! Stages run strictly in order: each provisioning stage, then wiring
//! (permission grant before notification registration), then the smoke-test
//! upload. Advancing past a stage whose outputs feed the next template goes
//! through an injected [`ConfirmationProvider`]; output propagation itself
//! is an out-of-band operator step, surfaced as a [`PendingParameter`] and
//! never automated.
//!
//! Components report outcomes; whether a failure halts the run is decided
//! here, by the [`FailurePolicy`], not inside the components.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{error, info, instrument, warn};

use crate::backends::{
    FunctionRegistry, GrantOutcome, InvokePermission, ProvisioningBackend, StorageRegistry,
};
use crate::config::PipelineConfig;
use crate::deploy::StackDeployer;
use crate::error::{Result, StrataError};
use crate::policy::compose_artifact_policy;
use crate::types::{NotificationRule, StackOutput, StackRequest};
use crate::wiring::{NotificationConfigurator, PermissionGrantor};

/// Operator decision boundary.
///
/// Implementations answer gate questions and supply identifiers the pipeline
/// cannot derive itself. The console implementation lives in the CLI; tests
/// script one.
#[async_trait]
pub trait ConfirmationProvider: Send + Sync {
    /// Ask a yes/no question. Anything but an affirmative answer declines.
    async fn confirm(&self, prompt: &str) -> Result<bool>;

    /// Request a free-form value.
    async fn prompt_value(&self, prompt: &str) -> Result<String>;
}

/// A value produced by one stage that the operator must thread into a later
/// template by hand before the pipeline may continue.
#[derive(Debug, Clone)]
pub struct PendingParameter {
    /// Stack whose outputs carry the value.
    pub from_stage: String,

    /// What has to happen with it.
    pub description: String,

    /// The outputs themselves, so the operator sees the values they are
    /// confirming without digging through logs.
    pub outputs: Vec<StackOutput>,
}

impl PendingParameter {
    fn render(&self, next_stage: &str) -> String {
        let mut text = self.description.clone();
        for output in &self.outputs {
            text.push_str(&format!("\n  {} = {}", output.key, output.value));
        }
        text.push_str(&format!(
            "\nConfirm once done, then stack {} will be deployed. Continue?",
            next_stage
        ));
        text
    }
}

/// Orchestration-level decision table for non-fatal failures.
#[derive(Debug, Clone)]
pub struct FailurePolicy {
    /// Halt the run when a stack ends in a terminal failure or its
    /// submission is rejected.
    pub halt_on_stack_failure: bool,

    /// Halt the run when wiring (grant or notification) fails. Off by
    /// default: wiring failures are reported and the run continues.
    pub halt_on_wiring_failure: bool,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self { halt_on_stack_failure: true, halt_on_wiring_failure: false }
    }
}

/// How a finished step turned out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Fatal,
}

/// Record of one pipeline step.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: String,
    pub severity: Severity,
    pub detail: String,
    pub outputs: Vec<StackOutput>,
}

impl StageReport {
    fn new(stage: impl Into<String>, severity: Severity, detail: impl Into<String>) -> Self {
        Self { stage: stage.into(), severity, detail: detail.into(), outputs: Vec::new() }
    }
}

/// Terminal state of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// All stages ran to the end (possibly with warnings).
    Completed,
    /// The operator declined a gate. A normal ending, not a failure.
    Declined { stage: String },
    /// The failure policy stopped the run.
    Halted { stage: String },
}

/// Full record of a pipeline run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    pub stages: Vec<StageReport>,
}

impl RunReport {
    pub fn is_declined(&self) -> bool {
        matches!(self.status, RunStatus::Declined { .. })
    }
}

/// Sequences stack deployments and the wiring that follows them.
pub struct Orchestrator {
    config: PipelineConfig,
    deployer: StackDeployer,
    grantor: PermissionGrantor,
    configurator: NotificationConfigurator,
    storage: Arc<dyn StorageRegistry>,
    confirm: Arc<dyn ConfirmationProvider>,
    policy: FailurePolicy,
}

impl Orchestrator {
    pub fn new(
        config: PipelineConfig,
        provisioning: Arc<dyn ProvisioningBackend>,
        functions: Arc<dyn FunctionRegistry>,
        storage: Arc<dyn StorageRegistry>,
        confirm: Arc<dyn ConfirmationProvider>,
    ) -> Self {
        let deployer = StackDeployer::new(provisioning)
            .with_poll_interval(Duration::from_secs(config.poll_interval_secs))
            .with_max_poll_attempts(config.max_poll_attempts);
        Self {
            deployer,
            grantor: PermissionGrantor::new(functions),
            configurator: NotificationConfigurator::new(storage.clone()),
            storage,
            confirm,
            policy: FailurePolicy::default(),
            config,
        }
    }

    /// Override the default failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run the whole pipeline: every provisioning stage, wiring, smoke test.
    #[instrument(skip(self, cancel))]
    pub async fn run(&self, cancel: &mut broadcast::Receiver<()>) -> Result<RunReport> {
        self.config.validate()?;
        let mut reports = Vec::new();

        let total = self.config.stages.len();
        let mut previous: Option<(String, Vec<StackOutput>)> = None;

        for (idx, stage) in self.config.stages.iter().enumerate() {
            if let Some((prev_name, prev_outputs)) = &previous {
                let pending = PendingParameter {
                    from_stage: prev_name.clone(),
                    description: format!(
                        "The outputs of stack {} must be threaded into the {} template by hand.",
                        prev_name, stage.stack_name
                    ),
                    outputs: prev_outputs.clone(),
                };
                if !self.confirm.confirm(&pending.render(&stage.stack_name)).await? {
                    info!(stage = %stage.stack_name, "Operator declined the gate, stopping");
                    return Ok(RunReport {
                        status: RunStatus::Declined { stage: stage.stack_name.clone() },
                        stages: reports,
                    });
                }
            }

            info!(stage = %stage.stack_name, step = idx + 1, total, "Deploying stage");
            let request = StackRequest {
                name: stage.stack_name.clone(),
                template_url: stage.template_url.clone(),
                capabilities: stage.capabilities.clone(),
            };

            let mut stage_outputs = Vec::new();
            match self.deployer.deploy(&request, cancel).await {
                Ok(outcome) if outcome.succeeded() => {
                    for output in &outcome.outputs {
                        info!(key = %output.key, value = %output.value, "Stage output");
                    }
                    stage_outputs = outcome.outputs.clone();
                    let mut report = StageReport::new(
                        stage.stack_name.clone(),
                        Severity::Info,
                        format!("Stack created ({})", outcome.stack_id),
                    );
                    report.outputs = outcome.outputs;
                    reports.push(report);
                }
                Ok(outcome) => {
                    warn!(stage = %stage.stack_name, "Stack ended in a terminal failure state");
                    reports.push(StageReport::new(
                        stage.stack_name.clone(),
                        Severity::Fatal,
                        format!("Stack creation failed ({})", outcome.stack_id),
                    ));
                    if self.policy.halt_on_stack_failure {
                        return Ok(RunReport {
                            status: RunStatus::Halted { stage: stage.stack_name.clone() },
                            stages: reports,
                        });
                    }
                }
                Err(StrataError::Cancelled { stack }) => {
                    return Err(StrataError::Cancelled { stack });
                }
                Err(e) => {
                    error!(stage = %stage.stack_name, error = %e, "Stage deployment failed");
                    reports.push(StageReport::new(
                        stage.stack_name.clone(),
                        Severity::Fatal,
                        e.to_string(),
                    ));
                    if self.policy.halt_on_stack_failure {
                        return Ok(RunReport {
                            status: RunStatus::Halted { stage: stage.stack_name.clone() },
                            stages: reports,
                        });
                    }
                }
            }

            previous = Some((stage.stack_name.clone(), stage_outputs));
        }

        if let Some(halted) = self.wire(&mut reports).await? {
            return Ok(RunReport { status: RunStatus::Halted { stage: halted }, stages: reports });
        }

        self.smoke_test(&mut reports).await?;

        Ok(RunReport { status: RunStatus::Completed, stages: reports })
    }

    /// Wiring phase: grant invoke permission, then register the trigger and
    /// replace the bucket policy. Grant comes first so the trigger has a
    /// working permission by the time events can fire.
    ///
    /// Returns the stage name to halt on, if the failure policy says so.
    async fn wire(&self, reports: &mut Vec<StageReport>) -> Result<Option<String>> {
        let function_name = self
            .confirm
            .prompt_value("Name of the compute function that deploys the frontend artifact:")
            .await?;
        let function_arn =
            self.confirm.prompt_value("Invocation ARN of that function:").await?;
        let app_id = self.confirm.prompt_value("Application id of the hosting app:").await?;

        let permission = InvokePermission::s3_invoke(&function_name, &self.config.bucket);
        match self.grantor.grant(&permission).await {
            Ok(GrantOutcome::Granted) => {
                reports.push(StageReport::new(
                    "wiring:grant",
                    Severity::Info,
                    format!("Invoke permission granted on {}", function_name),
                ));
            }
            Ok(GrantOutcome::Conflict) => {
                reports.push(StageReport::new(
                    "wiring:grant",
                    Severity::Warning,
                    format!(
                        "Statement {} already exists on {}, grant skipped",
                        permission.statement_id, function_name
                    ),
                ));
            }
            Err(e) => {
                error!(error = %e, "Invoke permission grant failed");
                reports.push(StageReport::new("wiring:grant", Severity::Fatal, e.to_string()));
                if self.policy.halt_on_wiring_failure {
                    return Ok(Some("wiring:grant".to_string()));
                }
            }
        }

        let rule = NotificationRule::object_created(function_arn, self.config.artifact_key.clone());
        let policy = compose_artifact_policy(
            &self.config.bucket,
            &self.config.account_id,
            &app_id,
            &self.config.region,
        );
        match self.configurator.configure(&self.config.bucket, &rule, &policy).await {
            Ok(()) => {
                reports.push(StageReport::new(
                    "wiring:notification",
                    Severity::Info,
                    format!("Trigger registered on bucket {}", self.config.bucket),
                ));
            }
            Err(e) => {
                error!(error = %e, "Notification configuration failed");
                reports.push(StageReport::new(
                    "wiring:notification",
                    Severity::Fatal,
                    e.to_string(),
                ));
                if self.policy.halt_on_wiring_failure {
                    return Ok(Some("wiring:notification".to_string()));
                }
            }
        }

        Ok(None)
    }

    /// Smoke test: upload one operator-chosen file. Failure is reported and
    /// never affects the stages that already ran.
    async fn smoke_test(&self, reports: &mut Vec<StageReport>) -> Result<()> {
        let path =
            self.confirm.prompt_value("Local path of the file to upload for the smoke test:").await?;
        let key = self.confirm.prompt_value("Object key for the upload:").await?;

        match self.storage.put_object(&self.config.bucket, &key, Path::new(&path)).await {
            Ok(()) => {
                info!(bucket = %self.config.bucket, key = %key, "Smoke-test upload complete");
                reports.push(StageReport::new(
                    "smoke-test",
                    Severity::Info,
                    format!("Uploaded {} to {}", key, self.config.bucket),
                ));
            }
            Err(e) => {
                warn!(error = %e, "Smoke-test upload failed");
                reports.push(StageReport::new("smoke-test", Severity::Warning, e.to_string()));
            }
        }
        Ok(())
    }
}
