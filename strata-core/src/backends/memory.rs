//! In-memory cloud backend for tests and dry runs.
//!
//! Stack statuses are scripted: each `stack_status` query consumes the next
//! token in the stack's sequence until only the terminal token remains,
//! which then repeats. Every mutation is recorded and can be inspected
//! afterwards.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::{Result, StrataError};
use crate::types::{NotificationRule, StackOutput, StackRequest};

use super::{FunctionRegistry, GrantOutcome, InvokePermission, ProvisioningBackend, StorageRegistry};

#[derive(Default)]
struct CloudState {
    status_scripts: HashMap<String, VecDeque<String>>,
    outputs: HashMap<String, Vec<StackOutput>>,
    submitted: Vec<String>,
    grants: HashMap<String, Vec<String>>,
    notification_rules: HashMap<String, NotificationRule>,
    bucket_policies: HashMap<String, String>,
    uploads: Vec<(String, String, PathBuf)>,
    fail_notification_writes: bool,
    fail_policy_writes: bool,
    fail_uploads: bool,
}

/// Scripted in-memory implementation of all three backend traits.
#[derive(Default)]
pub struct InMemoryCloud {
    state: Mutex<CloudState>,
}

impl InMemoryCloud {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, CloudState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Script the status tokens a stack reports, in order. The last token
    /// repeats once reached.
    pub fn script_statuses(&self, stack: &str, statuses: &[&str]) {
        self.state()
            .status_scripts
            .insert(stack.to_string(), statuses.iter().map(|s| s.to_string()).collect());
    }

    /// Set the outputs a stack declares once complete.
    pub fn set_outputs(&self, stack: &str, outputs: Vec<StackOutput>) {
        self.state().outputs.insert(stack.to_string(), outputs);
    }

    /// Make notification-rule writes fail.
    pub fn fail_notification_writes(&self) {
        self.state().fail_notification_writes = true;
    }

    /// Make bucket-policy writes fail.
    pub fn fail_policy_writes(&self) {
        self.state().fail_policy_writes = true;
    }

    /// Make object uploads fail.
    pub fn fail_uploads(&self) {
        self.state().fail_uploads = true;
    }

    /// Names of stacks submitted so far, in submission order.
    pub fn submitted_stacks(&self) -> Vec<String> {
        self.state().submitted.clone()
    }

    /// Statement ids granted on a function, in grant order.
    pub fn granted_statements(&self, function: &str) -> Vec<String> {
        self.state().grants.get(function).cloned().unwrap_or_default()
    }

    /// The currently active notification rule for a bucket, if any.
    pub fn notification_rule(&self, bucket: &str) -> Option<NotificationRule> {
        self.state().notification_rules.get(bucket).cloned()
    }

    /// The currently applied bucket policy, if any.
    pub fn bucket_policy(&self, bucket: &str) -> Option<String> {
        self.state().bucket_policies.get(bucket).cloned()
    }

    /// Objects uploaded so far as (bucket, key, local path).
    pub fn uploaded_objects(&self) -> Vec<(String, String, PathBuf)> {
        self.state().uploads.clone()
    }
}

#[async_trait::async_trait]
impl ProvisioningBackend for InMemoryCloud {
    async fn submit_stack(&self, request: &StackRequest) -> Result<String> {
        let mut state = self.state();
        if state.submitted.iter().any(|name| name == &request.name) {
            return Err(StrataError::SubmissionFailed {
                stack: request.name.clone(),
                reason: format!("Stack [{}] already exists", request.name),
            });
        }
        if !state.status_scripts.contains_key(&request.name) {
            return Err(StrataError::SubmissionFailed {
                stack: request.name.clone(),
                reason: format!("No template registered for {}", request.template_url),
            });
        }
        state.submitted.push(request.name.clone());
        Ok(format!(
            "arn:aws:cloudformation:us-east-1:000000000000:stack/{}/{:04}",
            request.name,
            state.submitted.len()
        ))
    }

    async fn stack_status(&self, name: &str) -> Result<String> {
        let mut state = self.state();
        let script = state
            .status_scripts
            .get_mut(name)
            .ok_or_else(|| StrataError::StackNotFound { stack: name.to_string() })?;
        if script.len() > 1 {
            // unwrap is safe: len checked above
            Ok(script.pop_front().unwrap())
        } else {
            script
                .front()
                .cloned()
                .ok_or_else(|| StrataError::StackNotFound { stack: name.to_string() })
        }
    }

    async fn stack_outputs(&self, name: &str) -> Result<Vec<StackOutput>> {
        Ok(self.state().outputs.get(name).cloned().unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl FunctionRegistry for InMemoryCloud {
    async fn add_invoke_permission(&self, permission: &InvokePermission) -> Result<GrantOutcome> {
        let mut state = self.state();
        let statements = state.grants.entry(permission.function_name.clone()).or_default();
        if statements.iter().any(|sid| sid == &permission.statement_id) {
            return Ok(GrantOutcome::Conflict);
        }
        statements.push(permission.statement_id.clone());
        Ok(GrantOutcome::Granted)
    }
}

#[async_trait::async_trait]
impl StorageRegistry for InMemoryCloud {
    async fn put_notification_rule(&self, bucket: &str, rule: &NotificationRule) -> Result<()> {
        let mut state = self.state();
        if state.fail_notification_writes {
            return Err(StrataError::NotificationFailed {
                bucket: bucket.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        // Replace semantics: one active rule per bucket.
        state.notification_rules.insert(bucket.to_string(), rule.clone());
        Ok(())
    }

    async fn put_bucket_policy(&self, bucket: &str, policy_json: &str) -> Result<()> {
        let mut state = self.state();
        if state.fail_policy_writes {
            return Err(StrataError::PolicyWriteFailed {
                bucket: bucket.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        state.bucket_policies.insert(bucket.to_string(), policy_json.to_string());
        Ok(())
    }

    async fn put_object(&self, bucket: &str, key: &str, local_path: &Path) -> Result<()> {
        let mut state = self.state();
        if state.fail_uploads {
            return Err(StrataError::UploadFailed {
                bucket: bucket.to_string(),
                key: key.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        state.uploads.push((bucket.to_string(), key.to_string(), local_path.to_path_buf()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_statuses_drain_to_terminal() {
        let cloud = InMemoryCloud::new();
        cloud.script_statuses("s1", &["CREATE_IN_PROGRESS", "CREATE_COMPLETE"]);

        assert_eq!(cloud.stack_status("s1").await.unwrap(), "CREATE_IN_PROGRESS");
        assert_eq!(cloud.stack_status("s1").await.unwrap(), "CREATE_COMPLETE");
        // Terminal token repeats.
        assert_eq!(cloud.stack_status("s1").await.unwrap(), "CREATE_COMPLETE");
    }

    #[tokio::test]
    async fn duplicate_submission_is_rejected() {
        let cloud = InMemoryCloud::new();
        cloud.script_statuses("s1", &["CREATE_COMPLETE"]);
        let request = StackRequest::new("s1", "https://example.com/t.yml");

        cloud.submit_stack(&request).await.unwrap();
        let err = cloud.submit_stack(&request).await.unwrap_err();
        assert!(matches!(err, StrataError::SubmissionFailed { .. }));
    }

    #[tokio::test]
    async fn unknown_stack_status_is_not_found() {
        let cloud = InMemoryCloud::new();
        let err = cloud.stack_status("ghost").await.unwrap_err();
        assert!(matches!(err, StrataError::StackNotFound { .. }));
    }
}
