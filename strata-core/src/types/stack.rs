//! Stack domain types: provisioning requests, status classification, outcomes.

use serde::{Deserialize, Serialize};

/// Capability token authorizing elevated resource creation in a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Capability {
    /// Template may create IAM resources.
    #[serde(rename = "CAPABILITY_IAM")]
    Iam,

    /// Template may create IAM resources with custom names.
    #[serde(rename = "CAPABILITY_NAMED_IAM")]
    NamedIam,

    /// Template may expand macros.
    #[serde(rename = "CAPABILITY_AUTO_EXPAND")]
    AutoExpand,
}

impl Capability {
    /// Wire token understood by the provisioning backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Iam => "CAPABILITY_IAM",
            Capability::NamedIam => "CAPABILITY_NAMED_IAM",
            Capability::AutoExpand => "CAPABILITY_AUTO_EXPAND",
        }
    }
}

/// A provisioning request for one infrastructure stack.
///
/// Immutable once submitted. Names must be unique within a run; submitting a
/// name that already exists in the backend is a submission error, never an
/// update-in-place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackRequest {
    /// Stack name, unique per target environment.
    pub name: String,

    /// Location of the infrastructure template.
    pub template_url: String,

    /// Capability tokens to attach to the submission.
    pub capabilities: Vec<Capability>,
}

impl StackRequest {
    /// Create a request with no capabilities.
    pub fn new(name: impl Into<String>, template_url: impl Into<String>) -> Self {
        Self { name: name.into(), template_url: template_url.into(), capabilities: Vec::new() }
    }

    /// Attach a capability token.
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }
}

/// Classification of a raw backend status token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Terminal success.
    Complete,
    /// Terminal failure (failed or rolled back).
    Failed,
    /// Any other token; the stack is still settling.
    InProgress,
}

impl StatusClass {
    /// Classify a raw status token from the provisioning backend.
    ///
    /// Exact success tokens are checked first so that rollback-complete
    /// states still classify as failures.
    pub fn classify(token: &str) -> Self {
        match token {
            "CREATE_COMPLETE" | "UPDATE_COMPLETE" | "IMPORT_COMPLETE" => StatusClass::Complete,
            t if t.contains("FAILED") || t.contains("ROLLBACK") => StatusClass::Failed,
            _ => StatusClass::InProgress,
        }
    }
}

/// Terminal state of a finished deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalStatus {
    Succeeded,
    Failed,
}

/// One declared output of a provisioned stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutput {
    pub key: String,
    pub value: String,
}

/// Result of driving one stack to a terminal state.
///
/// Outputs preserve the template's declaration order and are populated only
/// on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackOutcome {
    /// Opaque identifier returned by the backend at submission time.
    pub stack_id: String,

    /// Terminal status.
    pub status: TerminalStatus,

    /// Declared outputs, empty unless `status` is `Succeeded`.
    pub outputs: Vec<StackOutput>,
}

impl StackOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == TerminalStatus::Succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_success_tokens() {
        assert_eq!(StatusClass::classify("CREATE_COMPLETE"), StatusClass::Complete);
        assert_eq!(StatusClass::classify("UPDATE_COMPLETE"), StatusClass::Complete);
        assert_eq!(StatusClass::classify("IMPORT_COMPLETE"), StatusClass::Complete);
    }

    #[test]
    fn classify_failure_tokens() {
        assert_eq!(StatusClass::classify("CREATE_FAILED"), StatusClass::Failed);
        assert_eq!(StatusClass::classify("ROLLBACK_IN_PROGRESS"), StatusClass::Failed);
        assert_eq!(StatusClass::classify("ROLLBACK_COMPLETE"), StatusClass::Failed);
        assert_eq!(StatusClass::classify("UPDATE_ROLLBACK_COMPLETE"), StatusClass::Failed);
    }

    #[test]
    fn classify_everything_else_as_in_progress() {
        assert_eq!(StatusClass::classify("CREATE_IN_PROGRESS"), StatusClass::InProgress);
        assert_eq!(StatusClass::classify("REVIEW_IN_PROGRESS"), StatusClass::InProgress);
        assert_eq!(StatusClass::classify(""), StatusClass::InProgress);
    }

    #[test]
    fn capability_wire_tokens() {
        assert_eq!(Capability::Iam.as_str(), "CAPABILITY_IAM");
        assert_eq!(Capability::NamedIam.as_str(), "CAPABILITY_NAMED_IAM");
    }
}
