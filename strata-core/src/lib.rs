//! Core library for staged cloud provisioning pipelines.
//!
//! A pipeline deploys infrastructure stacks in order, wires the storage
//! bucket to the deployment function (invoke grant, event trigger, bucket
//! policy), and finishes with a smoke-test upload. Cloud interactions go
//! through backend traits; the shipped implementations are an `aws` CLI
//! adapter and an in-memory scripted cloud for tests and dry runs.

pub mod backends;
pub mod config;
pub mod deploy;
pub mod error;
pub mod orchestrator;
pub mod policy;
pub mod types;
pub mod wiring;

pub use backends::{
    AwsCliBackend, FunctionRegistry, GrantOutcome, InMemoryCloud, InvokePermission,
    ProvisioningBackend, StorageRegistry,
};
pub use config::{PipelineConfig, StageConfig};
pub use deploy::{StackDeployer, DEFAULT_POLL_INTERVAL};
pub use error::{Result, StrataError};
pub use orchestrator::{
    ConfirmationProvider, FailurePolicy, Orchestrator, PendingParameter, RunReport, RunStatus,
    Severity, StageReport,
};
pub use policy::{compose_artifact_policy, ARTIFACT_KEY};
pub use types::{
    Capability, Effect, EventType, NotificationRule, PolicyDocument, PolicyStatement, Principal,
    StackOutcome, StackOutput, StackRequest, StatusClass, TerminalStatus,
};
pub use wiring::{NotificationConfigurator, PermissionGrantor};
