//! Steps that talk back to the fleet manager about the pending
//! lifecycle action.

use drainhook_core::{CoreError, LIFECYCLE_ACTION_RESULT, ParameterBag};
use tracing::info;

use crate::context::StepContext;
use crate::error::{StepError, StepResult};
use crate::fleet::{LifecycleAction, LifecycleActionResult};

/// Extend the lifecycle hook's timeout for the bag's node.
pub async fn record_heartbeat(ctx: &StepContext, bag: &ParameterBag) -> StepResult<()> {
    let action = LifecycleAction::from_bag(bag);
    ctx.fleet
        .record_lifecycle_action_heartbeat(&action)
        .await
        .map_err(StepError::api("RecordLifecycleActionHeartbeat"))?;
    info!(
        group = %action.auto_scaling_group_name,
        hook = %action.lifecycle_hook_name,
        instance = %action.instance_id,
        "recorded lifecycle heartbeat"
    );
    Ok(())
}

/// Complete the lifecycle action with the result the workflow stored in
/// `Params["LifecycleActionResult"]`.
pub async fn complete_lifecycle_action(
    ctx: &StepContext,
    bag: &ParameterBag,
) -> StepResult<LifecycleActionResult> {
    let result: LifecycleActionResult = bag
        .params
        .get(LIFECYCLE_ACTION_RESULT)
        .ok_or(CoreError::MissingParameter(LIFECYCLE_ACTION_RESULT))?
        .parse()?;

    let action = LifecycleAction::from_bag(bag);
    ctx.fleet
        .complete_lifecycle_action(&action, result)
        .await
        .map_err(StepError::api("CompleteLifecycleAction"))?;
    info!(
        group = %action.auto_scaling_group_name,
        hook = %action.lifecycle_hook_name,
        instance = %action.instance_id,
        %result,
        "completed lifecycle action"
    );
    Ok(result)
}
