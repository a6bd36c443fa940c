//! The `upload` command: push one file to the artifact bucket.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;

use strata_core::{AwsCliBackend, StorageRegistry};

pub async fn upload(bucket: &str, key: &str, file: &str, region: &str) -> Result<()> {
    let backend = Arc::new(AwsCliBackend::new(region)?);
    backend.put_object(bucket, key, Path::new(file)).await?;
    println!("{} Uploaded {} to {}", "✓".green().bold(), key.bold(), bucket.bold());
    Ok(())
}
