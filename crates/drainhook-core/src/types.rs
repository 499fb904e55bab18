//! Lifecycle events and the parameter bag threaded through an episode.
//!
//! Field names on the wire follow the workflow definitions that consume
//! the bag (`EC2InstanceID`, `ECSCluster`, …), so every field carries an
//! explicit rename instead of a blanket `rename_all`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Current version of the serialized [`ParameterBag`] schema.
pub const SCHEMA_VERSION: u32 = 1;

/// Key in [`ParameterBag::params`] holding the result to report when the
/// lifecycle action is completed.
pub const LIFECYCLE_ACTION_RESULT: &str = "LifecycleActionResult";

// ── Lifecycle event ───────────────────────────────────────────────

/// Which way a node is moving through its group's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Transition {
    /// The node is entering service.
    Launching,
    /// The node is leaving service.
    Terminating,
    /// Anything else the fleet manager sends (test notifications, …).
    Other(String),
}

impl Transition {
    pub const LAUNCHING: &'static str = "autoscaling:EC2_INSTANCE_LAUNCHING";
    pub const TERMINATING: &'static str = "autoscaling:EC2_INSTANCE_TERMINATING";

    pub fn as_str(&self) -> &str {
        match self {
            Self::Launching => Self::LAUNCHING,
            Self::Terminating => Self::TERMINATING,
            Self::Other(s) => s,
        }
    }
}

impl Default for Transition {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for Transition {
    fn from(s: String) -> Self {
        match s.as_str() {
            Self::LAUNCHING => Self::Launching,
            Self::TERMINATING => Self::Terminating,
            _ => Self::Other(s),
        }
    }
}

impl From<Transition> for String {
    fn from(t: Transition) -> Self {
        match t {
            Transition::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facts about a node transition, as delivered by the fleet manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    #[serde(rename = "LifecycleActionToken", default)]
    pub lifecycle_action_token: String,
    #[serde(rename = "AutoScalingGroupName")]
    pub auto_scaling_group_name: String,
    #[serde(rename = "LifecycleHookName")]
    pub lifecycle_hook_name: String,
    #[serde(rename = "EC2InstanceId", alias = "EC2InstanceID")]
    pub ec2_instance_id: String,
    #[serde(rename = "LifecycleTransition", default)]
    pub lifecycle_transition: Transition,
}

/// Event-bus envelope wrapping a [`LifecycleEvent`] in its `detail` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudWatchEnvelope {
    pub detail: LifecycleEvent,
}

// ── Parameter bag ─────────────────────────────────────────────────

/// The record threaded through a whole lifecycle episode.
///
/// Identity fields are copied from the [`LifecycleEvent`] when the bag is
/// seeded. Every other field starts absent and is filled in by the step
/// that owns it; no step clears a field another step has set. An absent
/// `ECSInstanceID` means "not resolved yet". An empty string on the wire
/// is read as absent so bags written by older producers still parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterBag {
    #[serde(rename = "SchemaVersion", default = "schema_version")]
    pub schema_version: u32,

    #[serde(rename = "LifecycleActionToken", default)]
    pub lifecycle_action_token: String,
    #[serde(rename = "AutoScalingGroupName", default)]
    pub auto_scaling_group_name: String,
    #[serde(rename = "LifecycleHookName", default)]
    pub lifecycle_hook_name: String,
    #[serde(rename = "EC2InstanceID", alias = "EC2InstanceId", default)]
    pub ec2_instance_id: String,
    #[serde(rename = "LifecycleTransition", default)]
    pub lifecycle_transition: Transition,

    #[serde(
        rename = "StateMachineARN",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub state_machine_arn: Option<String>,
    #[serde(
        rename = "Deadline",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub deadline: Option<String>,
    #[serde(rename = "PastDeadline", default, skip_serializing_if = "Option::is_none")]
    pub past_deadline: Option<bool>,
    #[serde(
        rename = "ECSCluster",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub ecs_cluster: Option<String>,
    #[serde(
        rename = "ECSInstanceID",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub ecs_instance_id: Option<String>,
    #[serde(rename = "ECSTaskCount", default, skip_serializing_if = "Option::is_none")]
    pub ecs_task_count: Option<u64>,
    #[serde(
        rename = "RunningExecutionCount",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub running_execution_count: Option<u64>,
    #[serde(
        rename = "RequiredTaskFamilies",
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub required_task_families: Vec<String>,
    #[serde(rename = "Ready", default, skip_serializing_if = "Option::is_none")]
    pub ready: Option<bool>,
    #[serde(
        rename = "InternalIPAddr",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub internal_ip_addr: Option<String>,
    #[serde(rename = "KafkaPort", default, skip_serializing_if = "Option::is_none")]
    pub kafka_port: Option<u16>,
    #[serde(
        rename = "Params",
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub params: BTreeMap<String, String>,
}

impl Default for ParameterBag {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            lifecycle_action_token: String::new(),
            auto_scaling_group_name: String::new(),
            lifecycle_hook_name: String::new(),
            ec2_instance_id: String::new(),
            lifecycle_transition: Transition::default(),
            state_machine_arn: None,
            deadline: None,
            past_deadline: None,
            ecs_cluster: None,
            ecs_instance_id: None,
            ecs_task_count: None,
            running_execution_count: None,
            required_task_families: Vec::new(),
            ready: None,
            internal_ip_addr: None,
            kafka_port: None,
            params: BTreeMap::new(),
        }
    }
}

impl ParameterBag {
    /// Seed a bag with the identity fields of `event`.
    pub fn from_event(event: &LifecycleEvent) -> Self {
        Self {
            lifecycle_action_token: event.lifecycle_action_token.clone(),
            auto_scaling_group_name: event.auto_scaling_group_name.clone(),
            lifecycle_hook_name: event.lifecycle_hook_name.clone(),
            ec2_instance_id: event.ec2_instance_id.clone(),
            lifecycle_transition: event.lifecycle_transition.clone(),
            ..Self::default()
        }
    }

    /// Parse a bag from its JSON form.
    pub fn from_json(input: &str) -> crate::CoreResult<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Render the bag as compact JSON, the form handed to the workflow engine.
    pub fn to_json(&self) -> crate::CoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// The cluster name, or a fatal error if no step has set it.
    pub fn require_cluster(&self) -> crate::CoreResult<&str> {
        self.ecs_cluster
            .as_deref()
            .ok_or(crate::CoreError::MissingParameter("ECSCluster"))
    }

    /// The workflow identifier, or a fatal error if no step has set it.
    pub fn require_state_machine_arn(&self) -> crate::CoreResult<&str> {
        self.state_machine_arn
            .as_deref()
            .ok_or(crate::CoreError::MissingParameter("StateMachineARN"))
    }
}

fn schema_version() -> u32 {
    SCHEMA_VERSION
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
