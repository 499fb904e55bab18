//! The compute-fleet API as consumed by drainhook.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use drainhook_core::{ApiResult, CoreError, ParameterBag};

/// A group of fleet nodes launched together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reservation {
    pub instances: Vec<FleetInstance>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetInstance {
    pub instance_id: String,
    pub private_ip_address: Option<String>,
}

/// Identifies the pending lifecycle action of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleAction {
    pub auto_scaling_group_name: String,
    pub lifecycle_hook_name: String,
    pub instance_id: String,
    pub lifecycle_action_token: Option<String>,
}

impl LifecycleAction {
    pub fn from_bag(bag: &ParameterBag) -> Self {
        Self {
            auto_scaling_group_name: bag.auto_scaling_group_name.clone(),
            lifecycle_hook_name: bag.lifecycle_hook_name.clone(),
            instance_id: bag.ec2_instance_id.clone(),
            lifecycle_action_token: Some(bag.lifecycle_action_token.clone()).filter(|t| !t.is_empty()),
        }
    }
}

/// Outcome reported when a lifecycle action completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleActionResult {
    /// Let the transition proceed.
    Continue,
    /// Abort a launch, or terminate without further hooks.
    Abandon,
}

impl LifecycleActionResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Continue => "CONTINUE",
            Self::Abandon => "ABANDON",
        }
    }
}

impl fmt::Display for LifecycleActionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleActionResult {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONTINUE" => Ok(Self::Continue),
            "ABANDON" => Ok(Self::Abandon),
            other => Err(CoreError::Config(format!(
                "invalid lifecycle action result {other:?}, expected CONTINUE or ABANDON"
            ))),
        }
    }
}

/// Compute-fleet API client.
#[async_trait]
pub trait FleetApi: Send + Sync {
    async fn describe_instances(&self, instance_ids: &[String]) -> ApiResult<Vec<Reservation>>;

    /// Extend the lifecycle hook's timeout.
    async fn record_lifecycle_action_heartbeat(&self, action: &LifecycleAction) -> ApiResult<()>;

    async fn complete_lifecycle_action(
        &self,
        action: &LifecycleAction,
        result: LifecycleActionResult,
    ) -> ApiResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_result_is_case_sensitive() {
        assert_eq!("CONTINUE".parse::<LifecycleActionResult>().unwrap(), LifecycleActionResult::Continue);
        assert_eq!("ABANDON".parse::<LifecycleActionResult>().unwrap(), LifecycleActionResult::Abandon);
        assert!("continue".parse::<LifecycleActionResult>().is_err());
    }

    #[test]
    fn empty_token_is_omitted() {
        let bag = ParameterBag {
            ec2_instance_id: "i-1".to_string(),
            ..ParameterBag::default()
        };
        let action = LifecycleAction::from_bag(&bag);
        assert_eq!(action.instance_id, "i-1");
        assert_eq!(action.lifecycle_action_token, None);
    }
}
