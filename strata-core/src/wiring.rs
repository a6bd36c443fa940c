//! Cross-resource wiring: invoke permissions and event notifications.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::backends::{FunctionRegistry, GrantOutcome, InvokePermission, StorageRegistry};
use crate::error::Result;
use crate::types::{NotificationRule, PolicyDocument};

/// Grants a storage service permission to invoke a compute function.
pub struct PermissionGrantor {
    registry: Arc<dyn FunctionRegistry>,
}

impl PermissionGrantor {
    pub fn new(registry: Arc<dyn FunctionRegistry>) -> Self {
        Self { registry }
    }

    /// Issue one grant against the function's invocation policy.
    ///
    /// A duplicate statement id comes back as `GrantOutcome::Conflict`; it is
    /// the caller's decision whether that halts anything. The mutation is not
    /// rolled back on later failures.
    #[instrument(skip(self, permission), fields(function = %permission.function_name))]
    pub async fn grant(&self, permission: &InvokePermission) -> Result<GrantOutcome> {
        let outcome = self.registry.add_invoke_permission(permission).await?;
        match outcome {
            GrantOutcome::Granted => {
                info!(
                    statement = %permission.statement_id,
                    principal = %permission.principal,
                    source = %permission.source_arn,
                    "Invoke permission granted"
                );
            }
            GrantOutcome::Conflict => {
                warn!(
                    statement = %permission.statement_id,
                    "Statement id already present on function, grant skipped"
                );
            }
        }
        Ok(outcome)
    }
}

/// Registers an event-filtered trigger on a bucket and replaces its policy.
pub struct NotificationConfigurator {
    storage: Arc<dyn StorageRegistry>,
}

impl NotificationConfigurator {
    pub fn new(storage: Arc<dyn StorageRegistry>) -> Self {
        Self { storage }
    }

    /// Register the rule, then replace the bucket policy in full.
    ///
    /// The two writes are independent backend calls with no rollback: a
    /// failure in the second leaves the first applied. The returned error
    /// names the half that failed.
    #[instrument(skip(self, rule, policy), fields(bucket = %bucket))]
    pub async fn configure(
        &self,
        bucket: &str,
        rule: &NotificationRule,
        policy: &PolicyDocument,
    ) -> Result<()> {
        self.storage.put_notification_rule(bucket, rule).await?;
        info!(
            target = %rule.function_arn,
            prefix = %rule.key_prefix,
            "Notification rule registered"
        );

        let policy_json = policy.to_json()?;
        self.storage.put_bucket_policy(bucket, &policy_json).await?;
        info!(statements = policy.statement.len(), "Bucket policy replaced");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::InMemoryCloud;
    use crate::error::StrataError;
    use crate::policy::compose_artifact_policy;

    #[tokio::test]
    async fn duplicate_statement_id_is_a_conflict_not_a_crash() {
        let cloud = Arc::new(InMemoryCloud::new());
        let grantor = PermissionGrantor::new(cloud.clone());
        let permission = InvokePermission::s3_invoke("fn1", "bkt");

        assert_eq!(grantor.grant(&permission).await.unwrap(), GrantOutcome::Granted);
        assert_eq!(grantor.grant(&permission).await.unwrap(), GrantOutcome::Conflict);

        // First grant stands; nothing was upserted.
        assert_eq!(cloud.granted_statements("fn1"), vec!["AllowS3EventInvoke".to_string()]);
    }

    #[tokio::test]
    async fn same_statement_id_on_another_function_is_fine() {
        let cloud = Arc::new(InMemoryCloud::new());
        let grantor = PermissionGrantor::new(cloud.clone());

        let first = InvokePermission::s3_invoke("fn1", "bkt");
        let second = InvokePermission::s3_invoke("fn2", "bkt");
        assert_eq!(grantor.grant(&first).await.unwrap(), GrantOutcome::Granted);
        assert_eq!(grantor.grant(&second).await.unwrap(), GrantOutcome::Granted);
    }

    #[tokio::test]
    async fn second_configure_replaces_the_rule() {
        let cloud = Arc::new(InMemoryCloud::new());
        let configurator = NotificationConfigurator::new(cloud.clone());
        let policy = compose_artifact_policy("bkt", "123", "app1", "us-east-1");

        let rule1 = NotificationRule::object_created("arn:aws:lambda:::fn1", "proj3/index.zip");
        let rule2 = NotificationRule::object_created("arn:aws:lambda:::fn2", "proj3/index.zip");

        configurator.configure("bkt", &rule1, &policy).await.unwrap();
        configurator.configure("bkt", &rule2, &policy).await.unwrap();

        let active = cloud.notification_rule("bkt").unwrap();
        assert_eq!(active, rule2);
    }

    #[tokio::test]
    async fn configure_applies_the_composed_policy_verbatim() {
        let cloud = Arc::new(InMemoryCloud::new());
        let configurator = NotificationConfigurator::new(cloud.clone());
        let policy = compose_artifact_policy("bkt", "123", "app1", "us-east-1");
        let rule = NotificationRule::object_created("arn:aws:lambda:::fn1", "proj3/index.zip");

        configurator.configure("bkt", &rule, &policy).await.unwrap();

        assert_eq!(cloud.bucket_policy("bkt").unwrap(), policy.to_json().unwrap());
    }

    #[tokio::test]
    async fn failed_policy_write_leaves_the_rule_applied() {
        let cloud = Arc::new(InMemoryCloud::new());
        cloud.fail_policy_writes();
        let configurator = NotificationConfigurator::new(cloud.clone());
        let policy = compose_artifact_policy("bkt", "123", "app1", "us-east-1");
        let rule = NotificationRule::object_created("arn:aws:lambda:::fn1", "proj3/index.zip");

        let err = configurator.configure("bkt", &rule, &policy).await.unwrap_err();
        assert!(matches!(err, StrataError::PolicyWriteFailed { .. }));

        // No rollback of the first half.
        assert!(cloud.notification_rule("bkt").is_some());
        assert!(cloud.bucket_policy("bkt").is_none());
    }

    #[tokio::test]
    async fn failed_rule_write_never_touches_the_policy() {
        let cloud = Arc::new(InMemoryCloud::new());
        cloud.fail_notification_writes();
        let configurator = NotificationConfigurator::new(cloud.clone());
        let policy = compose_artifact_policy("bkt", "123", "app1", "us-east-1");
        let rule = NotificationRule::object_created("arn:aws:lambda:::fn1", "proj3/index.zip");

        let err = configurator.configure("bkt", &rule, &policy).await.unwrap_err();
        assert!(matches!(err, StrataError::NotificationFailed { .. }));
        assert!(cloud.bucket_policy("bkt").is_none());
    }
}
