//! Workload eviction.
//!
//! Walks the task listing of one cluster node page by page, describes
//! each page, and stops every task the predicate selects. The first
//! describe or stop failure ends the sweep: later pages are left alone
//! and the error reports how much work remained.

use std::sync::Arc;

use drainhook_core::ApiError;
use tracing::{debug, info, warn};

use crate::api::{ClusterApi, Task, TaskFilter};
use crate::error::{ClusterError, ClusterResult};

/// Reason attached to every stop call.
pub const STOP_REASON: &str = "ECS instance drainer requested stop";

/// Group prefix carried by tasks that belong to a long-running service.
pub const SERVICE_GROUP_PREFIX: &str = "service:";

/// Decides whether a task must be stopped.
pub trait EvictionPredicate: Send + Sync {
    fn should_evict(&self, task: &Task) -> bool;
}

impl<F> EvictionPredicate for F
where
    F: Fn(&Task) -> bool + Send + Sync,
{
    fn should_evict(&self, task: &Task) -> bool {
        self(task)
    }
}

/// Selects every task that is not part of a long-running service.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotService;

impl EvictionPredicate for NotService {
    fn should_evict(&self, task: &Task) -> bool {
        !task.group().starts_with(SERVICE_GROUP_PREFIX)
    }
}

/// Selects tasks whose group is exactly one of the listed groups.
#[derive(Debug, Clone, Default)]
pub struct GroupAllowList {
    groups: Vec<String>,
}

impl GroupAllowList {
    pub fn new(groups: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            groups: groups.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl EvictionPredicate for GroupAllowList {
    fn should_evict(&self, task: &Task) -> bool {
        self.groups.iter().any(|g| g == task.group())
    }
}

/// Summary of a completed sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    pub pages: usize,
    /// Tasks described and tested against the predicate.
    pub examined: usize,
    /// Ids of stopped tasks, in listing order.
    pub stopped: Vec<String>,
}

/// Stops tasks on a cluster node.
#[derive(Clone)]
pub struct WorkloadEvictor {
    api: Arc<dyn ClusterApi>,
}

impl WorkloadEvictor {
    pub fn new(api: Arc<dyn ClusterApi>) -> Self {
        Self { api }
    }

    /// Stop every task on `instance` for which `predicate` holds.
    ///
    /// Fails with [`ClusterError::EvictionAborted`] on the first failed
    /// call; tasks on pages after the failing one are not touched.
    pub async fn evict(
        &self,
        cluster: &str,
        instance: &str,
        predicate: &dyn EvictionPredicate,
    ) -> ClusterResult<EvictionReport> {
        let filter = TaskFilter::on_instance(instance);
        let mut report = EvictionReport::default();
        let mut next_token: Option<String> = None;

        loop {
            let page = match self
                .api
                .list_tasks(cluster, &filter, next_token.as_deref())
                .await
            {
                Ok(page) => page,
                Err(source) => return Err(self.aborted("ListTasks", source, &report, None)),
            };

            if !page.items.is_empty() {
                let tasks = match self.api.describe_tasks(cluster, &page.items).await {
                    Ok(tasks) => tasks,
                    Err(source) => {
                        let remaining = self
                            .count_remaining_pages(cluster, &filter, page.next_token.as_deref())
                            .await;
                        return Err(self.aborted("DescribeTasks", source, &report, remaining));
                    }
                };

                for task in &tasks {
                    report.examined += 1;
                    if !predicate.should_evict(task) {
                        continue;
                    }
                    debug!(%cluster, %instance, task = %task.arn, group = task.group(), "stopping task");
                    if let Err(source) = self.api.stop_task(cluster, &task.arn, STOP_REASON).await {
                        let remaining = self
                            .count_remaining_pages(cluster, &filter, page.next_token.as_deref())
                            .await;
                        return Err(self.aborted("StopTask", source, &report, remaining));
                    }
                    report.stopped.push(task.arn.clone());
                }
            }
            report.pages += 1;

            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        info!(
            %cluster,
            %instance,
            pages = report.pages,
            examined = report.examined,
            stopped = report.stopped.len(),
            "eviction complete"
        );
        Ok(report)
    }

    /// Count the listing pages after the current one without processing
    /// them. `None` if the listing fails.
    async fn count_remaining_pages(
        &self,
        cluster: &str,
        filter: &TaskFilter,
        next_token: Option<&str>,
    ) -> Option<usize> {
        let mut next_token = next_token.map(str::to_string);
        let mut pages = 0usize;
        while let Some(token) = next_token.take() {
            match self.api.list_tasks(cluster, filter, Some(&token)).await {
                Ok(page) => {
                    pages += 1;
                    next_token = page.next_token;
                }
                Err(e) => {
                    warn!(%cluster, error = %e, "could not count unprocessed task pages");
                    return None;
                }
            }
        }
        Some(pages)
    }

    /// Build the abort error. `later_pages` counts pages after the failing
    /// one; the failing page itself is always unprocessed.
    fn aborted(
        &self,
        op: &'static str,
        source: ApiError,
        report: &EvictionReport,
        later_pages: Option<usize>,
    ) -> ClusterError {
        let unprocessed_pages = later_pages.map(|n| n + 1);
        warn!(
            op,
            error = %source,
            stopped = report.stopped.len(),
            pages_processed = report.pages,
            ?unprocessed_pages,
            "eviction aborted"
        );
        ClusterError::EvictionAborted {
            op,
            source,
            stopped: report.stopped.len(),
            pages_processed: report.pages,
            unprocessed_pages,
        }
    }
}
