//! Counting steps used by the drain workflow to decide when a node is
//! empty and when it is the last drain in flight.

use drainhook_cluster::count_running_tasks;
use drainhook_core::{CoreError, ParameterBag};
use tracing::info;

use crate::context::StepContext;
use crate::error::{StepError, StepResult};
use crate::workflow::ExecutionStatus;

/// Set `ECSTaskCount` to the number of tasks still running on the node.
pub async fn count_tasks(ctx: &StepContext, bag: &mut ParameterBag) -> StepResult<u64> {
    let cluster = bag.require_cluster()?;
    let instance = bag
        .ecs_instance_id
        .as_deref()
        .ok_or(CoreError::MissingParameter("ECSInstanceID"))?;

    let count = count_running_tasks(ctx.cluster.as_ref(), cluster, instance, None)
        .await
        .map_err(StepError::api("ListTasks"))?;
    info!(%cluster, %instance, count, "running tasks on container instance");
    bag.ecs_task_count = Some(count);
    Ok(count)
}

/// Set `RunningExecutionCount` to the number of running executions of
/// the bag's workflow, this one included.
pub async fn count_running_executions(ctx: &StepContext, bag: &mut ParameterBag) -> StepResult<u64> {
    let state_machine_arn = bag.require_state_machine_arn()?;

    let mut count = 0u64;
    let mut next_token: Option<String> = None;
    loop {
        let page = ctx
            .workflow
            .list_executions(state_machine_arn, ExecutionStatus::Running, next_token.as_deref())
            .await
            .map_err(StepError::api("ListExecutions"))?;
        count += page.items.len() as u64;
        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    info!(%state_machine_arn, count, "running workflow executions");
    bag.running_execution_count = Some(count);
    Ok(count)
}
