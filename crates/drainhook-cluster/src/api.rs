//! The container-cluster API as consumed by drainhook.

use async_trait::async_trait;
use drainhook_core::{ApiResult, Page};

/// Status of a cluster node that accepts work.
pub const STATUS_ACTIVE: &str = "ACTIVE";
/// Status of a cluster node that accepts no new work.
pub const STATUS_DRAINING: &str = "DRAINING";

/// A fleet node's membership record in the container cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInstance {
    /// Cluster membership id.
    pub arn: String,
    /// Fleet node behind this membership.
    pub ec2_instance_id: String,
    /// Whether the node agent is connected to the control plane.
    pub agent_connected: bool,
    /// `ACTIVE`, `DRAINING`, `REGISTERING`, …
    pub status: String,
    pub running_tasks_count: u32,
}

/// A workload running on a cluster node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub arn: String,
    /// Task group label. Service-owned tasks carry `service:<name>`.
    pub group: Option<String>,
}

impl Task {
    pub fn group(&self) -> &str {
        self.group.as_deref().unwrap_or_default()
    }
}

/// Desired status filter for task listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredStatus {
    Running,
    Stopped,
}

/// Filter for [`ClusterApi::list_tasks`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub container_instance: Option<String>,
    pub family: Option<String>,
    /// `None` leaves the choice to the API, which lists running tasks.
    pub desired_status: Option<DesiredStatus>,
}

impl TaskFilter {
    /// Tasks on one cluster node.
    pub fn on_instance(instance: &str) -> Self {
        Self {
            container_instance: Some(instance.to_string()),
            ..Self::default()
        }
    }

    pub fn family(mut self, family: &str) -> Self {
        self.family = Some(family.to_string());
        self
    }

    pub fn running(mut self) -> Self {
        self.desired_status = Some(DesiredStatus::Running);
        self
    }
}

/// Container-cluster API client.
///
/// Listing calls are paginated: pass `None` for the first page and the
/// previous page's `next_token` after that.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn list_container_instances(
        &self,
        cluster: &str,
        next_token: Option<&str>,
    ) -> ApiResult<Page<String>>;

    async fn describe_container_instances(
        &self,
        cluster: &str,
        instances: &[String],
    ) -> ApiResult<Vec<ContainerInstance>>;

    async fn update_container_instances_state(
        &self,
        cluster: &str,
        instances: &[String],
        status: &str,
    ) -> ApiResult<()>;

    async fn list_tasks(
        &self,
        cluster: &str,
        filter: &TaskFilter,
        next_token: Option<&str>,
    ) -> ApiResult<Page<String>>;

    async fn describe_tasks(&self, cluster: &str, tasks: &[String]) -> ApiResult<Vec<Task>>;

    async fn stop_task(&self, cluster: &str, task: &str, reason: &str) -> ApiResult<()>;
}
