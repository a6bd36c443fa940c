//! The `init` command: write a starter pipeline config.

use std::path::PathBuf;

use anyhow::{bail, Result};
use colored::Colorize;

use strata_core::{Capability, PipelineConfig, StageConfig};

pub fn init(path: Option<&str>) -> Result<()> {
    let path = path.map(PathBuf::from).unwrap_or_else(PipelineConfig::config_path);
    if path.exists() {
        bail!("Config already exists at {}", path.display());
    }

    let mut config = PipelineConfig::default();
    config.stages.push(StageConfig {
        stack_name: "stage-1".to_string(),
        template_url: "https://example.com/template.yml".to_string(),
        capabilities: vec![Capability::Iam],
    });
    config.save(&path)?;

    println!("{} Wrote starter config to {}", "✓".green().bold(), path.display());
    println!("{}", "Fill in account_id, bucket, and the real stages before running `strata up`.".dimmed());
    Ok(())
}
