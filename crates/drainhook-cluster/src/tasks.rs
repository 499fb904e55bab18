//! Running-task counts.

use drainhook_core::ApiResult;

use crate::api::{ClusterApi, TaskFilter};

/// Count tasks desired RUNNING on `instance`, optionally limited to one
/// family, across every page of the listing.
pub async fn count_running_tasks(
    api: &dyn ClusterApi,
    cluster: &str,
    instance: &str,
    family: Option<&str>,
) -> ApiResult<u64> {
    let mut filter = TaskFilter::on_instance(instance).running();
    filter.family = family.map(str::to_string);

    let mut count = 0u64;
    let mut next_token: Option<String> = None;
    loop {
        let page = api.list_tasks(cluster, &filter, next_token.as_deref()).await?;
        count += page.items.len() as u64;
        match page.next_token {
            Some(token) => next_token = Some(token),
            None => return Ok(count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCluster;

    #[tokio::test]
    async fn counts_across_pages() {
        let cluster = InMemoryCluster::new().with_page_size(2);
        let node = cluster.add_instance("i-1");
        for _ in 0..5 {
            cluster.add_task(&node, "web", Some("service:web"));
        }
        cluster.add_task(&node, "worker", Some("service:worker"));

        assert_eq!(count_running_tasks(&cluster, "prod", &node, None).await.unwrap(), 6);
        assert_eq!(
            count_running_tasks(&cluster, "prod", &node, Some("web")).await.unwrap(),
            5
        );
        assert_eq!(
            count_running_tasks(&cluster, "prod", &node, Some("cron")).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn stopped_tasks_are_not_counted() {
        let cluster = InMemoryCluster::new();
        let node = cluster.add_instance("i-1");
        let task = cluster.add_task(&node, "batch", None);
        cluster.stop_task("prod", &task, "test").await.unwrap();

        assert_eq!(count_running_tasks(&cluster, "prod", &node, None).await.unwrap(), 0);
    }
}
