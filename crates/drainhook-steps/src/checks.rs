//! Polling steps. Each records its answer in the bag and returns it; the
//! workflow decides whether to poll again.

use chrono::{DateTime, Utc};
use drainhook_core::{CoreError, DeadlineGuard, ParameterBag, Readiness};
use tracing::info;

use crate::context::StepContext;
use crate::error::StepResult;

/// Check whether the bag's node is ready in its container cluster.
///
/// Sets `Ready`, and `ECSInstanceID` once the node has joined. Transient
/// API failures come back as [`Readiness::Unavailable`].
pub async fn check_cluster_ready(ctx: &StepContext, bag: &mut ParameterBag) -> StepResult<Readiness> {
    let cluster = bag.require_cluster()?.to_string();
    let result = ctx
        .cluster_readiness()
        .evaluate(
            &cluster,
            &bag.ec2_instance_id,
            bag.ecs_instance_id.as_deref(),
            &bag.required_task_families,
        )
        .await?;

    if bag.ecs_instance_id.is_none() {
        bag.ecs_instance_id = result.instance_arn;
    }
    bag.ready = Some(result.readiness.is_ready());
    info!(%cluster, ec2_instance_id = %bag.ec2_instance_id, readiness = %result.readiness, "cluster readiness checked");
    Ok(result.readiness)
}

/// Check whether the bag's broker node has every partition in sync.
pub async fn check_broker_ready(ctx: &StepContext, bag: &mut ParameterBag) -> StepResult<Readiness> {
    let host = bag
        .internal_ip_addr
        .as_deref()
        .ok_or(CoreError::MissingParameter("InternalIPAddr"))?;
    let port = bag.kafka_port.ok_or(CoreError::MissingParameter("KafkaPort"))?;

    let readiness = ctx.broker_readiness().evaluate(host, port).await;
    bag.ready = Some(readiness.is_ready());
    Ok(readiness)
}

/// Set `PastDeadline`. A missing or malformed deadline is fatal.
pub fn check_deadline(bag: &mut ParameterBag, now: DateTime<Utc>) -> StepResult<bool> {
    Ok(DeadlineGuard.check(bag, now)?)
}
