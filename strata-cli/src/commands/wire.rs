//! The `wire` command: grant, trigger, policy in one go.

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;

use strata_core::{
    compose_artifact_policy, AwsCliBackend, GrantOutcome, InvokePermission,
    NotificationConfigurator, NotificationRule, PermissionGrantor, ARTIFACT_KEY,
};

pub async fn wire(
    bucket: &str,
    function: &str,
    function_arn: &str,
    account: &str,
    app: &str,
    region: &str,
) -> Result<()> {
    let backend = Arc::new(AwsCliBackend::new(region)?);

    let grantor = PermissionGrantor::new(backend.clone());
    let permission = InvokePermission::s3_invoke(function, bucket);
    match grantor.grant(&permission).await? {
        GrantOutcome::Granted => {
            println!("{} Invoke permission granted on {}", "✓".green().bold(), function.bold());
        }
        GrantOutcome::Conflict => {
            println!(
                "{} Permission already present on {}, grant skipped",
                "⚠".yellow().bold(),
                function.bold()
            );
        }
    }

    let configurator = NotificationConfigurator::new(backend);
    let rule = NotificationRule::object_created(function_arn, ARTIFACT_KEY);
    let policy = compose_artifact_policy(bucket, account, app, region);
    configurator.configure(bucket, &rule, &policy).await?;
    println!("{} Trigger registered and policy applied on {}", "✓".green().bold(), bucket.bold());

    Ok(())
}
