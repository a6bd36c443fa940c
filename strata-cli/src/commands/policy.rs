//! The `policy` command: print the composed artifact bucket policy.

use anyhow::Result;
use strata_core::compose_artifact_policy;

pub fn policy(bucket: &str, account: &str, app: &str, region: &str) -> Result<()> {
    let document = compose_artifact_policy(bucket, account, app, region);
    println!("{}", document.to_json()?);
    Ok(())
}
