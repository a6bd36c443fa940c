//! Event notification types.

use serde::{Deserialize, Serialize};

/// Storage event type a notification rule can match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    /// Any object-created event.
    ObjectCreated,
}

impl EventType {
    /// Wire token understood by the storage backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ObjectCreated => "s3:ObjectCreated:*",
        }
    }
}

/// An event-filtered trigger registration on a storage bucket.
///
/// At most one rule is active per bucket: configuring a new rule replaces
/// the previous one. The prefix filter must match the object keys intended
/// to fire the trigger; nothing validates this, a mismatched prefix means
/// the trigger silently never fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRule {
    /// Invocation ARN of the compute function to trigger.
    pub function_arn: String,

    /// Event types the rule matches.
    pub events: Vec<EventType>,

    /// Leading-characters filter on object keys.
    pub key_prefix: String,
}

impl NotificationRule {
    /// Rule firing the given function on object creation under a key prefix.
    pub fn object_created(function_arn: impl Into<String>, key_prefix: impl Into<String>) -> Self {
        Self {
            function_arn: function_arn.into(),
            events: vec![EventType::ObjectCreated],
            key_prefix: key_prefix.into(),
        }
    }
}
