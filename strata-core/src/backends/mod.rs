//! Cloud backend adapter abstraction.
//!
//! The pipeline talks to three external registries through these traits:
//! - `ProvisioningBackend`: submits infrastructure templates and reports
//!   their status (CloudFormation-shaped).
//! - `FunctionRegistry`: mutates a compute function's resource policy
//!   (Lambda-shaped).
//! - `StorageRegistry`: bucket notification configuration, bucket policy,
//!   and object upload (S3-shaped).
//!
//! `AwsCliBackend` implements all three against the `aws` binary;
//! `InMemoryCloud` implements them in memory for tests and dry runs.

use crate::error::Result;
use crate::types::{NotificationRule, StackOutput, StackRequest};
use async_trait::async_trait;
use std::path::Path;

/// Infrastructure-provisioning registry.
///
/// Submission is asynchronous: `submit_stack` returns an opaque id
/// immediately and provisioning continues in the backend.
#[async_trait]
pub trait ProvisioningBackend: Send + Sync {
    /// Submit a stack creation request.
    ///
    /// An existing stack with the same name is a submission error; this
    /// interface never updates in place.
    async fn submit_stack(&self, request: &StackRequest) -> Result<String>;

    /// Current raw status token for a stack, queried by name.
    async fn stack_status(&self, name: &str) -> Result<String>;

    /// Declared outputs of a stack, in declaration order.
    ///
    /// Meaningful only once the stack has reached a terminal success state.
    async fn stack_outputs(&self, name: &str) -> Result<Vec<StackOutput>>;
}

/// A grant on a compute function's invocation policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokePermission {
    /// Function whose policy is mutated.
    pub function_name: String,

    /// Principal being allowed to invoke.
    pub principal: String,

    /// Caller-chosen label, unique per function.
    pub statement_id: String,

    /// Action being granted.
    pub action: String,

    /// Resource the invocations must originate from.
    pub source_arn: String,
}

impl InvokePermission {
    /// Standard grant letting the storage service invoke a function for
    /// events on the given bucket.
    pub fn s3_invoke(function_name: impl Into<String>, bucket: &str) -> Self {
        Self {
            function_name: function_name.into(),
            principal: "s3.amazonaws.com".to_string(),
            statement_id: "AllowS3EventInvoke".to_string(),
            action: "lambda:InvokeFunction".to_string(),
            source_arn: format!("arn:aws:s3:::{}", bucket),
        }
    }
}

/// Result of a grant attempt.
///
/// A duplicate statement id is an expected outcome, not a fault: it is
/// reported as `Conflict`, never retried and never silently upserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    Granted,
    Conflict,
}

/// Compute-function registry.
#[async_trait]
pub trait FunctionRegistry: Send + Sync {
    /// Add an invoke permission to a function's resource policy.
    async fn add_invoke_permission(&self, permission: &InvokePermission) -> Result<GrantOutcome>;
}

/// Storage registry.
#[async_trait]
pub trait StorageRegistry: Send + Sync {
    /// Register a notification rule on a bucket, replacing any prior rule.
    async fn put_notification_rule(&self, bucket: &str, rule: &NotificationRule) -> Result<()>;

    /// Replace the bucket's access policy in full.
    async fn put_bucket_policy(&self, bucket: &str, policy_json: &str) -> Result<()>;

    /// Upload a single local file to the bucket under the given key.
    async fn put_object(&self, bucket: &str, key: &str, local_path: &Path) -> Result<()>;
}

pub mod aws_cli;
pub mod memory;

pub use aws_cli::AwsCliBackend;
pub use memory::InMemoryCloud;
