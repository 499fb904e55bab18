//! Marking a cluster node as draining.

use tracing::info;

use crate::api::{ClusterApi, STATUS_DRAINING};
use crate::error::{ClusterError, ClusterResult};

/// Set `instance` to DRAINING so it accepts no new work. Service tasks on
/// it are rescheduled elsewhere by the cluster itself.
pub async fn set_draining(api: &dyn ClusterApi, cluster: &str, instance: &str) -> ClusterResult<()> {
    info!(%cluster, %instance, "setting container instance to DRAINING");
    api.update_container_instances_state(cluster, &[instance.to_string()], STATUS_DRAINING)
        .await
        .map_err(ClusterError::api("UpdateContainerInstancesState"))
}
