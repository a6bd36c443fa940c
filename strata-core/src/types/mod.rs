//! Domain types shared across the pipeline.

pub mod notification;
pub mod policy;
pub mod stack;

pub use notification::{EventType, NotificationRule};
pub use policy::{Effect, PolicyDocument, PolicyStatement, Principal};
pub use stack::{Capability, StackOutcome, StackOutput, StackRequest, StatusClass, TerminalStatus};
