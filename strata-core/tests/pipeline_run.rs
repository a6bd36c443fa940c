//! Integration tests for a full pipeline run.
//!
//! These exercise the whole sequence against the in-memory cloud:
//! - Deploy every configured stage in order
//! - Grant the invoke permission, register the trigger, replace the policy
//! - Smoke-test upload
//!
//! The confirmation provider is scripted, so runs are fully deterministic.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use strata_core::{
    compose_artifact_policy, Capability, ConfirmationProvider, EventType, FailurePolicy,
    InMemoryCloud, Orchestrator, PipelineConfig, Result, RunStatus, Severity, StackOutput,
    StageConfig, StrataError,
};
use tokio::sync::broadcast;

struct ScriptedPrompt {
    confirms: Mutex<VecDeque<bool>>,
    values: Mutex<VecDeque<String>>,
}

impl ScriptedPrompt {
    fn new(confirms: &[bool], values: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            confirms: Mutex::new(confirms.iter().copied().collect()),
            values: Mutex::new(values.iter().map(|v| v.to_string()).collect()),
        })
    }
}

#[async_trait::async_trait]
impl ConfirmationProvider for ScriptedPrompt {
    async fn confirm(&self, _prompt: &str) -> Result<bool> {
        self.confirms.lock().unwrap().pop_front().ok_or_else(|| StrataError::PromptFailed {
            reason: "confirmation script exhausted".to_string(),
        })
    }

    async fn prompt_value(&self, _prompt: &str) -> Result<String> {
        self.values.lock().unwrap().pop_front().ok_or_else(|| StrataError::PromptFailed {
            reason: "value script exhausted".to_string(),
        })
    }
}

fn three_stage_config() -> PipelineConfig {
    let stage = |name: &str| StageConfig {
        stack_name: name.to_string(),
        template_url: format!("https://templates.example.com/{}.yml", name),
        capabilities: vec![Capability::Iam],
    };
    PipelineConfig {
        region: "us-east-1".to_string(),
        account_id: "123456789012".to_string(),
        bucket: "artifact-bucket".to_string(),
        stages: vec![stage("network"), stage("backend"), stage("frontend")],
        poll_interval_secs: 0,
        ..Default::default()
    }
}

fn scripted_cloud() -> Arc<InMemoryCloud> {
    let cloud = Arc::new(InMemoryCloud::new());
    cloud.script_statuses("network", &["CREATE_IN_PROGRESS", "CREATE_COMPLETE"]);
    cloud.script_statuses(
        "backend",
        &["CREATE_IN_PROGRESS", "CREATE_IN_PROGRESS", "CREATE_COMPLETE"],
    );
    cloud.script_statuses("frontend", &["CREATE_COMPLETE"]);
    cloud.set_outputs(
        "backend",
        vec![StackOutput { key: "ApiEndpoint".to_string(), value: "https://api".to_string() }],
    );
    cloud
}

#[tokio::test]
async fn full_pipeline_runs_end_to_end() {
    let cloud = scripted_cloud();
    // Two gates (network->backend, backend->frontend), then the wiring and
    // smoke-test values.
    let prompt = ScriptedPrompt::new(
        &[true, true],
        &[
            "deploy-fn",
            "arn:aws:lambda:us-east-1:123456789012:function:deploy-fn",
            "d1a2b3c4",
            "/tmp/index.zip",
            "proj3/index.zip",
        ],
    );
    let orchestrator = Orchestrator::new(
        three_stage_config(),
        cloud.clone(),
        cloud.clone(),
        cloud.clone(),
        prompt,
    );

    let (_tx, mut rx) = broadcast::channel(1);
    let report = orchestrator.run(&mut rx).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(
        cloud.submitted_stacks(),
        vec!["network".to_string(), "backend".to_string(), "frontend".to_string()]
    );

    // Grant landed before the trigger.
    assert_eq!(cloud.granted_statements("deploy-fn"), vec!["AllowS3EventInvoke".to_string()]);
    let rule = cloud.notification_rule("artifact-bucket").unwrap();
    assert_eq!(rule.key_prefix, "proj3/index.zip");
    assert_eq!(rule.events, vec![EventType::ObjectCreated]);

    // The applied policy is exactly the composed document.
    let expected =
        compose_artifact_policy("artifact-bucket", "123456789012", "d1a2b3c4", "us-east-1");
    assert_eq!(cloud.bucket_policy("artifact-bucket").unwrap(), expected.to_json().unwrap());

    // Smoke-test upload recorded against the chosen key.
    let uploads = cloud.uploaded_objects();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, "artifact-bucket");
    assert_eq!(uploads[0].1, "proj3/index.zip");

    // 3 stages + grant + notification + smoke test.
    assert_eq!(report.stages.len(), 6);
    assert!(report.stages.iter().all(|s| s.severity == Severity::Info));
    let backend = report.stages.iter().find(|s| s.stage == "backend").unwrap();
    assert_eq!(backend.outputs[0].key, "ApiEndpoint");
}

#[tokio::test]
async fn declining_a_gate_stops_cleanly_with_no_side_effects_past_it() {
    let cloud = scripted_cloud();
    let prompt = ScriptedPrompt::new(&[true, false], &[]);
    let orchestrator = Orchestrator::new(
        three_stage_config(),
        cloud.clone(),
        cloud.clone(),
        cloud.clone(),
        prompt,
    );

    let (_tx, mut rx) = broadcast::channel(1);
    let report = orchestrator.run(&mut rx).await.unwrap();

    assert_eq!(report.status, RunStatus::Declined { stage: "frontend".to_string() });
    assert_eq!(cloud.submitted_stacks(), vec!["network".to_string(), "backend".to_string()]);
    assert!(cloud.notification_rule("artifact-bucket").is_none());
    assert!(cloud.bucket_policy("artifact-bucket").is_none());
    assert!(cloud.uploaded_objects().is_empty());
}

#[tokio::test]
async fn mid_pipeline_stack_failure_halts_before_wiring() {
    let cloud = Arc::new(InMemoryCloud::new());
    cloud.script_statuses("network", &["CREATE_COMPLETE"]);
    cloud.script_statuses("backend", &["CREATE_IN_PROGRESS", "ROLLBACK_COMPLETE"]);
    cloud.script_statuses("frontend", &["CREATE_COMPLETE"]);

    let prompt = ScriptedPrompt::new(&[true, true], &[]);
    let orchestrator = Orchestrator::new(
        three_stage_config(),
        cloud.clone(),
        cloud.clone(),
        cloud.clone(),
        prompt,
    );

    let (_tx, mut rx) = broadcast::channel(1);
    let report = orchestrator.run(&mut rx).await.unwrap();

    assert_eq!(report.status, RunStatus::Halted { stage: "backend".to_string() });
    assert_eq!(cloud.submitted_stacks(), vec!["network".to_string(), "backend".to_string()]);
    assert_eq!(report.stages.last().unwrap().severity, Severity::Fatal);
    assert!(cloud.notification_rule("artifact-bucket").is_none());
}

#[tokio::test]
async fn lenient_policy_reports_the_failure_and_keeps_going() {
    let cloud = Arc::new(InMemoryCloud::new());
    cloud.script_statuses("network", &["CREATE_COMPLETE"]);
    cloud.script_statuses("backend", &["CREATE_FAILED"]);
    cloud.script_statuses("frontend", &["CREATE_COMPLETE"]);

    let prompt = ScriptedPrompt::new(
        &[true, true],
        &[
            "deploy-fn",
            "arn:aws:lambda:us-east-1:123456789012:function:deploy-fn",
            "d1a2b3c4",
            "/tmp/index.zip",
            "proj3/index.zip",
        ],
    );
    let orchestrator = Orchestrator::new(
        three_stage_config(),
        cloud.clone(),
        cloud.clone(),
        cloud.clone(),
        prompt,
    )
    .with_failure_policy(FailurePolicy {
        halt_on_stack_failure: false,
        halt_on_wiring_failure: false,
    });

    let (_tx, mut rx) = broadcast::channel(1);
    let report = orchestrator.run(&mut rx).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(cloud.submitted_stacks().len(), 3);
    let backend = report.stages.iter().find(|s| s.stage == "backend").unwrap();
    assert_eq!(backend.severity, Severity::Fatal);
    // Wiring still ran.
    assert!(cloud.notification_rule("artifact-bucket").is_some());
}

#[tokio::test]
async fn cancellation_during_a_poll_aborts_the_run() {
    let cloud = Arc::new(InMemoryCloud::new());
    cloud.script_statuses("network", &["CREATE_IN_PROGRESS"]);
    cloud.script_statuses("backend", &["CREATE_COMPLETE"]);
    cloud.script_statuses("frontend", &["CREATE_COMPLETE"]);

    let mut config = three_stage_config();
    config.poll_interval_secs = 60;

    let prompt = ScriptedPrompt::new(&[], &[]);
    let orchestrator =
        Orchestrator::new(config, cloud.clone(), cloud.clone(), cloud.clone(), prompt);

    let (tx, mut rx) = broadcast::channel(1);
    tx.send(()).unwrap();

    let err = orchestrator.run(&mut rx).await.unwrap_err();
    assert!(matches!(err, StrataError::Cancelled { .. }));
    assert_eq!(cloud.submitted_stacks(), vec!["network".to_string()]);
}
