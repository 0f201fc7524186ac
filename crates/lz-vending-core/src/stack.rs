//! Bootstrap stack lifecycle.
//!
//! The deployment controller never stores stack state; it derives it from the
//! latest lifecycle event the stack service reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::StackId;

/// Resource type carried by events about the stack itself.
pub const STACK_RESOURCE_TYPE: &str = "AWS::CloudFormation::Stack";

/// Whole-stack status marking a successful creation.
pub const CREATE_COMPLETE: &str = "CREATE_COMPLETE";

/// Whole-stack statuses marking a finished rollback.
pub const ROLLBACK_TERMINAL: [&str; 2] = ["ROLLBACK_COMPLETE", "ROLLBACK_FAILED"];

/// Stable whole-stack statuses an existing stack reaches after a later update.
pub const UPDATE_SETTLED: [&str; 2] = ["UPDATE_COMPLETE", "UPDATE_ROLLBACK_COMPLETE"];

/// Whole-stack statuses from which the stack can no longer serve as a baseline.
pub const UNUSABLE: [&str; 4] = [
    "UPDATE_ROLLBACK_FAILED",
    "DELETE_IN_PROGRESS",
    "DELETE_COMPLETE",
    "DELETE_FAILED",
];

/// What to deploy, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSpec {
    /// Stack name inside the target account.
    pub stack_name: String,
    /// Region to deploy into.
    pub region: String,
    /// Template text.
    pub template_body: String,
    /// Tags applied to the stack and its resources.
    pub tags: Vec<StackTag>,
}

/// A key/value tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackTag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

impl StackTag {
    fn new(key: &str, value: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            value: value.into(),
        }
    }
}

/// Traceability tags applied to every bootstrap deployment.
///
/// Keys and values are fixed except for the deployment date (`dd/mm/YYYY`).
#[must_use]
pub fn deployment_tags(deployed_at: DateTime<Utc>) -> Vec<StackTag> {
    vec![
        StackTag::new("ManagedResource", "True"),
        StackTag::new("DeployDate", deployed_at.format("%d/%m/%Y").to_string()),
        StackTag::new("isLandingZoneResource", "True"),
    ]
}

/// One lifecycle event reported by the stack service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEvent {
    /// Logical id of the subject resource (the stack name for whole-stack events).
    pub logical_resource_id: String,
    /// Resource type of the subject.
    pub resource_type: String,
    /// Status the subject moved to.
    pub resource_status: String,
    /// Optional explanation attached to the status.
    #[serde(default)]
    pub resource_status_reason: Option<String>,
}

impl StackEvent {
    /// Whether the event is about the stack named `stack_name` rather than a child resource.
    ///
    /// Nested stacks carry the stack resource type too, so the logical id must match.
    #[must_use]
    pub fn is_whole_stack(&self, stack_name: &str) -> bool {
        self.resource_type == STACK_RESOURCE_TYPE && self.logical_resource_id == stack_name
    }
}

/// Deployment status derived from lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackStatus {
    /// Not terminal yet.
    Creating,
    /// The stack reported successful creation.
    Complete,
    /// The stack finished rolling back.
    RolledBack {
        /// The terminal status string.
        status: String,
        /// The reason on the terminal event, if any.
        reason: Option<String>,
    },
    /// An existing stack settled after an update made outside this deployment.
    Settled {
        /// The stable status string.
        status: String,
    },
    /// The stack failed an update rollback or is being deleted.
    Unusable {
        /// The terminal status string.
        status: String,
        /// The reason on the terminal event, if any.
        reason: Option<String>,
    },
}

impl StackStatus {
    /// Classify the most recent event of the stack named `stack_name`.
    ///
    /// Only whole-stack events can end a deployment; child resource events (nested
    /// stacks included), and the absence of any event, leave the stack in `Creating`.
    #[must_use]
    pub fn from_latest(latest: Option<&StackEvent>, stack_name: &str) -> Self {
        let Some(event) = latest.filter(|e| e.is_whole_stack(stack_name)) else {
            return Self::Creating;
        };
        let status = event.resource_status.as_str();
        if status == CREATE_COMPLETE {
            Self::Complete
        } else if ROLLBACK_TERMINAL.contains(&status) {
            Self::RolledBack {
                status: status.to_string(),
                reason: event.resource_status_reason.clone(),
            }
        } else if UPDATE_SETTLED.contains(&status) {
            Self::Settled {
                status: status.to_string(),
            }
        } else if UNUSABLE.contains(&status) {
            Self::Unusable {
                status: status.to_string(),
                reason: event.resource_status_reason.clone(),
            }
        } else {
            Self::Creating
        }
    }

    /// Whether polling can stop.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Creating)
    }
}

/// Final description of a deployed stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDescription {
    /// Stack identifier.
    pub stack_id: StackId,
    /// Stack name.
    pub stack_name: String,
    /// Declared outputs, in template order.
    #[serde(default)]
    pub outputs: Vec<(String, String)>,
}
