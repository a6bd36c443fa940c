//! Artifact bucket policy composition.
//!
//! Pure function of (bucket, account, app, region); no I/O and no state.
//! The same inputs always produce a byte-identical document.

use std::collections::BTreeMap;

use crate::types::{Effect, PolicyDocument, PolicyStatement, Principal};

/// Object key whose upload carries the deployable frontend artifact.
pub const ARTIFACT_KEY: &str = "proj3/index.zip";

/// Branch the hosting service deploys from.
const BRANCH: &str = "dev";

/// Service principal allowed to read the artifact.
const HOSTING_PRINCIPAL: &str = "amplify.amazonaws.com";

/// Branch-scoped source ARN of the hosting app.
///
/// The condition value is percent-encoded (colons and slashes), matching the
/// form the storage backend compares against.
fn hosting_source_arn(region: &str, account_id: &str, app_id: &str) -> String {
    format!(
        "arn%3Aaws%3Aamplify%3A{}%3A{}%3Aapps%2F{}%2Fbranches%2F{}",
        region, account_id, app_id, BRANCH
    )
}

fn sid(prefix: &str, app_id: &str) -> String {
    format!("{}_{}_{}_{}", prefix, app_id, BRANCH, "proj3_index_zip")
}

fn string_equals(pairs: &[(&str, &str)]) -> BTreeMap<String, BTreeMap<String, String>> {
    let mut keys = BTreeMap::new();
    for (key, value) in pairs {
        keys.insert((*key).to_string(), (*value).to_string());
    }
    let mut conditions = BTreeMap::new();
    conditions.insert("StringEquals".to_string(), keys);
    conditions
}

/// Compose the access policy for the artifact bucket.
///
/// Exactly three statements, in order: allow the hosting service to list the
/// artifact prefix, allow it to read the artifact object, and deny all
/// access over insecure transport.
pub fn compose_artifact_policy(
    bucket: &str,
    account_id: &str,
    app_id: &str,
    region: &str,
) -> PolicyDocument {
    let source_arn = hosting_source_arn(region, account_id, app_id);

    let list = PolicyStatement {
        sid: Some(sid("AllowAmplifyToListPrefix", app_id)),
        effect: Effect::Allow,
        principal: Principal::service(HOSTING_PRINCIPAL),
        action: "s3:ListBucket".to_string(),
        resource: format!("arn:aws:s3:::{}", bucket),
        condition: Some(string_equals(&[
            ("aws:SourceAccount", account_id),
            ("s3:prefix", ARTIFACT_KEY),
            ("aws:SourceArn", &source_arn),
        ])),
    };

    let read = PolicyStatement {
        sid: Some(sid("AllowAmplifyToReadPrefix", app_id)),
        effect: Effect::Allow,
        principal: Principal::service(HOSTING_PRINCIPAL),
        action: "s3:GetObject".to_string(),
        resource: format!("arn:aws:s3:::{}/{}", bucket, ARTIFACT_KEY),
        condition: Some(string_equals(&[
            ("aws:SourceAccount", account_id),
            ("aws:SourceArn", &source_arn),
        ])),
    };

    let mut insecure_transport = BTreeMap::new();
    insecure_transport.insert("aws:SecureTransport".to_string(), "false".to_string());
    let mut deny_condition = BTreeMap::new();
    deny_condition.insert("Bool".to_string(), insecure_transport);

    let deny_insecure = PolicyStatement {
        sid: None,
        effect: Effect::Deny,
        principal: Principal::any(),
        action: "s3:*".to_string(),
        resource: format!("arn:aws:s3:::{}/*", bucket),
        condition: Some(deny_condition),
    };

    PolicyDocument {
        version: "2012-10-17".to_string(),
        statement: vec![list, read, deny_insecure],
    }
}
