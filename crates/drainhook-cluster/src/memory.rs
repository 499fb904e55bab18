//! In-memory [`ClusterApi`] for tests and dry runs.
//!
//! Nodes and tasks belong to a named cluster and every call only sees
//! its own cluster. Listings paginate with a configurable page size,
//! every call is counted by operation name, and any operation can be
//! made to fail after a number of successful calls.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use drainhook_core::{ApiError, ApiResult, Page};

use crate::api::{ClusterApi, ContainerInstance, DesiredStatus, STATUS_ACTIVE, Task, TaskFilter};

/// Cluster that [`InMemoryCluster::add_instance`] registers nodes in.
pub const DEFAULT_CLUSTER: &str = "prod";

#[derive(Debug, Clone)]
struct StoredInstance {
    cluster: String,
    instance: ContainerInstance,
}

#[derive(Debug, Clone)]
struct StoredTask {
    cluster: String,
    task: Task,
    instance_arn: String,
    family: String,
    running: bool,
}

#[derive(Default)]
struct Inner {
    instances: Vec<StoredInstance>,
    tasks: Vec<StoredTask>,
    calls: HashMap<&'static str, usize>,
    /// op → number of calls that succeed before every later call fails.
    fail_after: HashMap<&'static str, usize>,
    stop_calls: Vec<String>,
}

/// A container cluster held in memory.
pub struct InMemoryCluster {
    inner: Mutex<Inner>,
    page_size: usize,
}

impl Default for InMemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self {
            inner: Mutex::default(),
            page_size: 100,
        }
    }

    /// Set the maximum number of ids per listing page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Register a connected, ACTIVE node for `ec2_instance_id` in
    /// [`DEFAULT_CLUSTER`]. Returns its membership id.
    pub fn add_instance(&self, ec2_instance_id: &str) -> String {
        self.add_instance_in(DEFAULT_CLUSTER, ec2_instance_id)
    }

    /// Register a connected, ACTIVE node in `cluster`.
    pub fn add_instance_in(&self, cluster: &str, ec2_instance_id: &str) -> String {
        let arn = format!("arn:container-instance/{cluster}/{ec2_instance_id}");
        self.lock().instances.push(StoredInstance {
            cluster: cluster.to_string(),
            instance: ContainerInstance {
                arn: arn.clone(),
                ec2_instance_id: ec2_instance_id.to_string(),
                agent_connected: true,
                status: STATUS_ACTIVE.to_string(),
                running_tasks_count: 0,
            },
        });
        arn
    }

    /// Override a node's agent connectivity and status.
    pub fn set_instance_state(&self, instance_arn: &str, agent_connected: bool, status: &str) {
        let mut inner = self.lock();
        if let Some(ci) = inner
            .instances
            .iter_mut()
            .map(|s| &mut s.instance)
            .find(|ci| ci.arn == instance_arn)
        {
            ci.agent_connected = agent_connected;
            ci.status = status.to_string();
        }
    }

    /// Current record for a node.
    pub fn instance(&self, instance_arn: &str) -> Option<ContainerInstance> {
        let inner = self.lock();
        inner
            .instances
            .iter()
            .find(|s| s.instance.arn == instance_arn)
            .map(|s| with_task_count(&s.instance, &inner.tasks))
    }

    /// Start a task of `family` on a node, in the node's cluster. Returns
    /// the task id.
    pub fn add_task(&self, instance_arn: &str, family: &str, group: Option<&str>) -> String {
        let mut inner = self.lock();
        let cluster = inner
            .instances
            .iter()
            .find(|s| s.instance.arn == instance_arn)
            .map_or(DEFAULT_CLUSTER, |s| s.cluster.as_str())
            .to_string();
        let arn = format!("arn:task/{}/{}", family, inner.tasks.len());
        inner.tasks.push(StoredTask {
            cluster,
            task: Task {
                arn: arn.clone(),
                group: group.map(str::to_string),
            },
            instance_arn: instance_arn.to_string(),
            family: family.to_string(),
            running: true,
        });
        arn
    }

    /// Ids of tasks still running on a node.
    pub fn running_tasks(&self, instance_arn: &str) -> Vec<String> {
        self.lock()
            .tasks
            .iter()
            .filter(|t| t.running && t.instance_arn == instance_arn)
            .map(|t| t.task.arn.clone())
            .collect()
    }

    /// Every task id passed to `stop_task`, in call order.
    pub fn stop_calls(&self) -> Vec<String> {
        self.lock().stop_calls.clone()
    }

    /// Number of calls made to `op` (e.g. `"ListTasks"`).
    pub fn calls(&self, op: &str) -> usize {
        self.lock().calls.get(op).copied().unwrap_or(0)
    }

    /// Let `op` succeed `successes` more times, then fail every later call.
    pub fn fail_after(&self, op: &'static str, successes: usize) {
        let mut inner = self.lock();
        let made = inner.calls.get(op).copied().unwrap_or(0);
        inner.fail_after.insert(op, made + successes);
    }

    pub fn clear_failures(&self) {
        self.lock().fail_after.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count a call to `op` and decide whether it fails.
    fn enter(&self, op: &'static str) -> Result<MutexGuard<'_, Inner>, ApiError> {
        let mut inner = self.lock();
        let made = {
            let n = inner.calls.entry(op).or_insert(0);
            *n += 1;
            *n
        };
        let failing = inner.fail_after.get(op).is_some_and(|&allowed| made > allowed);
        if failing {
            return Err(ApiError::new(format!("{op} failed (injected)")));
        }
        Ok(inner)
    }

    fn paginate<T: Clone>(&self, matching: &[(usize, T)], next_token: Option<&str>) -> ApiResult<Page<T>> {
        let start = match next_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| ApiError::new(format!("invalid next token {token:?}")))?,
            None => 0,
        };
        let mut rest = matching.iter().filter(|(pos, _)| *pos >= start);
        let items: Vec<(usize, T)> = rest.by_ref().take(self.page_size).cloned().collect();
        let next_token = rest.next().map(|(pos, _)| pos.to_string());
        Ok(Page {
            items: items.into_iter().map(|(_, item)| item).collect(),
            next_token,
        })
    }
}

fn with_task_count(ci: &ContainerInstance, tasks: &[StoredTask]) -> ContainerInstance {
    let running = tasks
        .iter()
        .filter(|t| t.running && t.instance_arn == ci.arn)
        .count();
    ContainerInstance {
        running_tasks_count: u32::try_from(running).unwrap_or(u32::MAX),
        ..ci.clone()
    }
}

fn task_matches(t: &StoredTask, filter: &TaskFilter) -> bool {
    let wants_running = !matches!(filter.desired_status, Some(DesiredStatus::Stopped));
    t.running == wants_running
        && filter
            .container_instance
            .as_deref()
            .is_none_or(|ci| ci == t.instance_arn)
        && filter.family.as_deref().is_none_or(|f| f == t.family)
}

#[async_trait]
impl ClusterApi for InMemoryCluster {
    async fn list_container_instances(
        &self,
        cluster: &str,
        next_token: Option<&str>,
    ) -> ApiResult<Page<String>> {
        let inner = self.enter("ListContainerInstances")?;
        // Positions are stable, so tokens stay valid while the set changes.
        let matching: Vec<(usize, String)> = inner
            .instances
            .iter()
            .enumerate()
            .filter(|(_, s)| s.cluster == cluster)
            .map(|(pos, s)| (pos, s.instance.arn.clone()))
            .collect();
        drop(inner);
        self.paginate(&matching, next_token)
    }

    async fn describe_container_instances(
        &self,
        cluster: &str,
        instances: &[String],
    ) -> ApiResult<Vec<ContainerInstance>> {
        let inner = self.enter("DescribeContainerInstances")?;
        Ok(instances
            .iter()
            .filter_map(|arn| {
                inner
                    .instances
                    .iter()
                    .find(|s| s.cluster == cluster && &s.instance.arn == arn)
            })
            .map(|s| with_task_count(&s.instance, &inner.tasks))
            .collect())
    }

    async fn update_container_instances_state(
        &self,
        cluster: &str,
        instances: &[String],
        status: &str,
    ) -> ApiResult<()> {
        let mut inner = self.enter("UpdateContainerInstancesState")?;
        for arn in instances {
            match inner
                .instances
                .iter_mut()
                .find(|s| s.cluster == cluster && &s.instance.arn == arn)
            {
                Some(s) => s.instance.status = status.to_string(),
                None => {
                    return Err(ApiError::new(format!(
                        "container instance {arn} not found in {cluster}"
                    )));
                }
            }
        }
        Ok(())
    }

    async fn list_tasks(
        &self,
        cluster: &str,
        filter: &TaskFilter,
        next_token: Option<&str>,
    ) -> ApiResult<Page<String>> {
        let inner = self.enter("ListTasks")?;
        let matching: Vec<(usize, String)> = inner
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.cluster == cluster && task_matches(t, filter))
            .map(|(pos, t)| (pos, t.task.arn.clone()))
            .collect();
        drop(inner);
        self.paginate(&matching, next_token)
    }

    async fn describe_tasks(&self, cluster: &str, tasks: &[String]) -> ApiResult<Vec<Task>> {
        let inner = self.enter("DescribeTasks")?;
        Ok(tasks
            .iter()
            .filter_map(|arn| {
                inner
                    .tasks
                    .iter()
                    .find(|t| t.cluster == cluster && &t.task.arn == arn)
            })
            .map(|t| t.task.clone())
            .collect())
    }

    async fn stop_task(&self, cluster: &str, task: &str, _reason: &str) -> ApiResult<()> {
        let mut inner = self.enter("StopTask")?;
        inner.stop_calls.push(task.to_string());
        match inner
            .tasks
            .iter_mut()
            .find(|t| t.cluster == cluster && t.task.arn == task)
        {
            Some(t) => {
                t.running = false;
                Ok(())
            }
            None => Err(ApiError::new(format!("task {task} not found in {cluster}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pages_follow_tokens_even_when_tasks_stop() {
        let cluster = InMemoryCluster::new().with_page_size(2);
        let node = cluster.add_instance("i-1");
        let ids: Vec<String> = (0..5).map(|_| cluster.add_task(&node, "web", None)).collect();

        let filter = TaskFilter::on_instance(&node);
        let first = cluster.list_tasks("prod", &filter, None).await.unwrap();
        assert_eq!(first.items, ids[0..2]);

        cluster.stop_task("prod", &ids[0], "test").await.unwrap();
        let second = cluster
            .list_tasks("prod", &filter, first.next_token.as_deref())
            .await
            .unwrap();
        assert_eq!(second.items, ids[2..4]);

        let third = cluster
            .list_tasks("prod", &filter, second.next_token.as_deref())
            .await
            .unwrap();
        assert_eq!(third.items, ids[4..5]);
        assert!(third.is_last());
    }

    #[tokio::test]
    async fn injected_failures_start_after_allowed_calls() {
        let cluster = InMemoryCluster::new();
        cluster.fail_after("ListContainerInstances", 1);
        assert!(cluster.list_container_instances("prod", None).await.is_ok());
        assert!(cluster.list_container_instances("prod", None).await.is_err());
        assert_eq!(cluster.calls("ListContainerInstances"), 2);

        cluster.clear_failures();
        assert!(cluster.list_container_instances("prod", None).await.is_ok());
    }

    #[tokio::test]
    async fn describe_reports_running_task_count() {
        let cluster = InMemoryCluster::new();
        let node = cluster.add_instance("i-1");
        cluster.add_task(&node, "web", Some("service:web"));
        let stopped = cluster.add_task(&node, "batch", None);
        cluster.stop_task("prod", &stopped, "test").await.unwrap();

        let described = cluster
            .describe_container_instances("prod", &[node.clone()])
            .await
            .unwrap();
        assert_eq!(described[0].running_tasks_count, 1);
        assert_eq!(cluster.running_tasks(&node).len(), 1);
    }

    #[tokio::test]
    async fn calls_only_see_their_own_cluster() {
        let cluster = InMemoryCluster::new();
        let prod = cluster.add_instance("i-1");
        let staging = cluster.add_instance_in("staging", "i-1");
        assert_ne!(prod, staging);
        let task = cluster.add_task(&staging, "web", None);

        let listed = cluster.list_container_instances("staging", None).await.unwrap();
        assert_eq!(listed.items, vec![staging.clone()]);
        let described = cluster
            .describe_container_instances("prod", &[staging.clone()])
            .await
            .unwrap();
        assert!(described.is_empty());

        let filter = TaskFilter::on_instance(&staging);
        assert!(cluster.list_tasks("prod", &filter, None).await.unwrap().items.is_empty());
        assert!(cluster.stop_task("prod", &task, "test").await.is_err());
        assert!(cluster.stop_task("staging", &task, "test").await.is_ok());
        assert!(
            cluster
                .update_container_instances_state("prod", &[staging], "DRAINING")
                .await
                .is_err()
        );
    }
}
