//! Pipeline configuration management.

use crate::error::{Result, StrataError};
use crate::types::Capability;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One provisioning stage in the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// Stack name for this stage.
    pub stack_name: String,

    /// Template location to submit.
    pub template_url: String,

    /// Capabilities to attach to the submission.
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

/// Persistent configuration for one pipeline run.
///
/// Lives for the duration of a run; intermediate coordination state is never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Target region.
    pub region: String,

    /// Account id owning the resources.
    pub account_id: String,

    /// Artifact bucket that carries templates and receives the trigger.
    pub bucket: String,

    /// Object key whose creation fires the deployment trigger.
    pub artifact_key: String,

    /// Provisioning stages, deployed strictly in order.
    pub stages: Vec<StageConfig>,

    /// Seconds between status polls.
    pub poll_interval_secs: u64,

    /// Polls before giving up on a stuck backend. `None` waits forever.
    pub max_poll_attempts: Option<u32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            account_id: String::new(),
            bucket: String::new(),
            artifact_key: "proj3/index.zip".to_string(),
            stages: Vec::new(),
            poll_interval_secs: 5,
            max_poll_attempts: Some(240),
        }
    }
}

impl PipelineConfig {
    /// Get the default path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("strata").join("config.json")
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| StrataError::InvalidConfig {
            reason: format!("Failed to read config {}: {}", path.display(), e),
        })?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| StrataError::InvalidConfig {
                reason: format!("Failed to parse config {}: {}", path.display(), e),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default path, falling back to defaults.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Save configuration to disk.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StrataError::IoError { path: parent.to_path_buf(), source: e })?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            StrataError::InvalidConfig { reason: format!("Failed to serialize config: {}", e) }
        })?;
        std::fs::write(path, content)
            .map_err(|e| StrataError::IoError { path: path.to_path_buf(), source: e })
    }

    /// Check run invariants: at least one stage, unique stack names,
    /// non-empty identity fields.
    pub fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            return Err(StrataError::InvalidConfig {
                reason: "No provisioning stages configured".to_string(),
            });
        }
        let mut seen = HashSet::new();
        for stage in &self.stages {
            if !seen.insert(stage.stack_name.as_str()) {
                return Err(StrataError::InvalidConfig {
                    reason: format!("Duplicate stack name in stages: {}", stage.stack_name),
                });
            }
        }
        if self.bucket.is_empty() {
            return Err(StrataError::InvalidConfig {
                reason: "Artifact bucket is not set".to_string(),
            });
        }
        if self.account_id.is_empty() {
            return Err(StrataError::InvalidConfig { reason: "Account id is not set".to_string() });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(name: &str) -> StageConfig {
        StageConfig {
            stack_name: name.to_string(),
            template_url: format!("https://example.com/{}.yml", name),
            capabilities: vec![Capability::Iam],
        }
    }

    fn valid_config() -> PipelineConfig {
        PipelineConfig {
            account_id: "123456789012".to_string(),
            bucket: "artifacts".to_string(),
            stages: vec![stage("backend"), stage("frontend")],
            ..Default::default()
        }
    }

    #[test]
    fn validate_accepts_well_formed_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_duplicate_stack_names() {
        let mut config = valid_config();
        config.stages.push(stage("backend"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate stack name"));
    }

    #[test]
    fn validate_rejects_empty_stages() {
        let mut config = valid_config();
        config.stages.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let config = valid_config();
        config.save(&path).unwrap();

        let loaded = PipelineConfig::load_from(&path).unwrap();
        assert_eq!(loaded.bucket, "artifacts");
        assert_eq!(loaded.stages.len(), 2);
        assert_eq!(loaded.poll_interval_secs, 5);
    }
}
