//! Steps that open an episode: seed the bag, prepare the node, and start
//! the workflow that polls it.

use chrono::{DateTime, Utc};
use drainhook_cluster::{GroupAllowList, NotService, set_draining};
use drainhook_core::{LifecycleEvent, ParameterBag};
use tracing::info;

use crate::context::StepContext;
use crate::error::{StepError, StepResult};
use crate::seed::{SeedKind, seed_parameters};
use crate::workflow::execution_name;

/// A workflow execution started with a seeded bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedExecution {
    pub name: String,
    pub execution_arn: String,
    /// The bag handed to the workflow as input.
    pub parameters: ParameterBag,
}

/// Put a terminating node into DRAINING, evict the configured tasks, and
/// start the drain workflow.
///
/// A node that is not a member of the cluster is fatal here: there is
/// nothing to drain and nothing will ever be.
pub async fn start_drainer(
    ctx: &StepContext,
    event: &LifecycleEvent,
    now: DateTime<Utc>,
) -> StepResult<StartedExecution> {
    let mut bag = seed_parameters(SeedKind::Drain, event, &ctx.config, now)?;
    let cluster = bag.require_cluster()?.to_string();

    let instance = ctx
        .resolver()
        .resolve(&cluster, &bag.ec2_instance_id)
        .await?
        .ok_or_else(|| StepError::NotInCluster {
            cluster: cluster.clone(),
            ec2_instance_id: bag.ec2_instance_id.clone(),
        })?;
    bag.ecs_instance_id = Some(instance.clone());

    set_draining(ctx.cluster.as_ref(), &cluster, &instance).await?;

    let evictor = ctx.evictor();
    if ctx.config.stop_all_non_service_tasks {
        info!(%cluster, %instance, "stopping all non-service tasks");
        evictor.evict(&cluster, &instance, &NotService).await?;
    }
    let groups = GroupAllowList::new(ctx.config.stop_task_groups.iter().cloned());
    if !groups.is_empty() {
        info!(%cluster, %instance, groups = ?ctx.config.stop_task_groups, "stopping tasks in groups");
        evictor.evict(&cluster, &instance, &groups).await?;
    }

    start_execution(ctx, bag, now).await
}

/// Start the workflow that waits for a launching node to run its
/// required families.
pub async fn start_cluster_ready_poller(
    ctx: &StepContext,
    event: &LifecycleEvent,
    now: DateTime<Utc>,
) -> StepResult<StartedExecution> {
    let bag = seed_parameters(SeedKind::ClusterReady, event, &ctx.config, now)?;
    start_execution(ctx, bag, now).await
}

/// Look up a launching broker node's private address and start the
/// workflow that waits for its partitions to catch up.
pub async fn start_broker_ready_poller(
    ctx: &StepContext,
    event: &LifecycleEvent,
    now: DateTime<Utc>,
) -> StepResult<StartedExecution> {
    let mut bag = seed_parameters(SeedKind::BrokerReady, event, &ctx.config, now)?;
    bag.internal_ip_addr = Some(private_address(ctx, &bag.ec2_instance_id).await?);
    start_execution(ctx, bag, now).await
}

async fn private_address(ctx: &StepContext, ec2_instance_id: &str) -> StepResult<String> {
    let reservations = ctx
        .fleet
        .describe_instances(&[ec2_instance_id.to_string()])
        .await
        .map_err(StepError::api("DescribeInstances"))?;

    let [reservation] = reservations.as_slice() else {
        return Err(StepError::Assertion(format!(
            "reservation count != 1 (got {})",
            reservations.len()
        )));
    };
    let [instance] = reservation.instances.as_slice() else {
        return Err(StepError::Assertion(format!(
            "instance count != 1 (got {})",
            reservation.instances.len()
        )));
    };
    instance
        .private_ip_address
        .clone()
        .filter(|ip| !ip.is_empty())
        .ok_or_else(|| StepError::Assertion(format!("{ec2_instance_id} has no private address")))
}

async fn start_execution(
    ctx: &StepContext,
    bag: ParameterBag,
    now: DateTime<Utc>,
) -> StepResult<StartedExecution> {
    let state_machine_arn = bag.require_state_machine_arn()?;
    let name = execution_name(now);
    let input = bag.to_json()?;

    let execution_arn = ctx
        .workflow
        .start_execution(state_machine_arn, &name, &input)
        .await
        .map_err(StepError::api("StartExecution"))?;
    info!(%state_machine_arn, execution = %name, %input, "started workflow execution");

    Ok(StartedExecution {
        name,
        execution_arn,
        parameters: bag,
    })
}
