//! Access policy document types.
//!
//! Documents serialize to the PascalCase JSON shape the storage backend
//! expects. Condition maps are `BTreeMap` so serialization is deterministic:
//! composing the same document twice yields byte-identical JSON.

use crate::error::{Result, StrataError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Condition-operator -> key -> value.
pub type Conditions = BTreeMap<String, BTreeMap<String, String>>;

/// Statement effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// Statement principal: a named service, or everyone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Principal {
    /// `"*"`
    Wildcard(String),
    /// `{"Service": "..."}`
    Service {
        #[serde(rename = "Service")]
        service: String,
    },
}

impl Principal {
    /// A named service principal.
    pub fn service(name: impl Into<String>) -> Self {
        Principal::Service { service: name.into() }
    }

    /// All principals.
    pub fn any() -> Self {
        Principal::Wildcard("*".to_string())
    }
}

/// One allow/deny statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,

    pub effect: Effect,

    pub principal: Principal,

    pub action: String,

    pub resource: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Conditions>,
}

/// An ordered set of statements governing access to a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,

    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    /// Serialize to the backend's JSON shape.
    ///
    /// Deterministic: identical documents produce byte-identical output.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| StrataError::Internal(format!("Failed to serialize policy: {}", e)))
    }
}
