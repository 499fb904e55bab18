//! Fleet node → cluster membership resolution.
//!
//! The cluster API cannot be queried by fleet node id, so a cold lookup
//! pages through every membership in the cluster, describing each page
//! until the node turns up. Hits are cached in the shared
//! [`IdentityCache`].

use std::sync::Arc;

use tracing::{debug, info};

use crate::api::ClusterApi;
use crate::cache::IdentityCache;
use crate::error::{ClusterError, ClusterResult};

/// Resolves fleet node ids to cluster membership ids.
#[derive(Clone)]
pub struct NodeIdentityResolver {
    api: Arc<dyn ClusterApi>,
    cache: Arc<IdentityCache>,
}

impl NodeIdentityResolver {
    pub fn new(api: Arc<dyn ClusterApi>, cache: Arc<IdentityCache>) -> Self {
        Self { api, cache }
    }

    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    /// Membership id of `ec2_instance_id` in `cluster`.
    ///
    /// Returns `Ok(None)` when the node has not joined the cluster yet;
    /// that answer is not cached. Any listing or describe failure aborts
    /// the scan and leaves the cache untouched.
    pub async fn resolve(
        &self,
        cluster: &str,
        ec2_instance_id: &str,
    ) -> ClusterResult<Option<String>> {
        if let Some(arn) = self.cache.get(cluster, ec2_instance_id) {
            return Ok(Some(arn));
        }

        let mut next_token: Option<String> = None;
        let mut pages = 0usize;
        loop {
            let page = self
                .api
                .list_container_instances(cluster, next_token.as_deref())
                .await
                .map_err(ClusterError::api("ListContainerInstances"))?;
            pages += 1;

            if page.items.is_empty() {
                break;
            }

            let instances = self
                .api
                .describe_container_instances(cluster, &page.items)
                .await
                .map_err(ClusterError::api("DescribeContainerInstances"))?;

            if let Some(found) = instances
                .iter()
                .find(|ci| ci.ec2_instance_id == ec2_instance_id)
            {
                self.cache.insert(cluster, ec2_instance_id, &found.arn);
                info!(
                    %cluster,
                    %ec2_instance_id,
                    instance_arn = %found.arn,
                    pages,
                    "resolved cluster membership"
                );
                return Ok(Some(found.arn.clone()));
            }

            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        debug!(%cluster, %ec2_instance_id, pages, "node not found in cluster");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCluster;

    fn setup(page_size: usize, nodes: usize) -> (Arc<InMemoryCluster>, NodeIdentityResolver) {
        let cluster = Arc::new(InMemoryCluster::new().with_page_size(page_size));
        for i in 0..nodes {
            cluster.add_instance(&format!("i-{i}"));
        }
        let resolver = NodeIdentityResolver::new(cluster.clone(), Arc::new(IdentityCache::new()));
        (cluster, resolver)
    }

    #[tokio::test]
    async fn resolves_node_on_a_later_page() {
        let (cluster, resolver) = setup(2, 5);
        let arn = resolver.resolve("prod", "i-3").await.unwrap();
        assert_eq!(arn.as_deref(), Some("arn:container-instance/prod/i-3"));
        // Pages [0,1] and [2,3]; the scan stops on the second.
        assert_eq!(cluster.calls("ListContainerInstances"), 2);
        assert_eq!(cluster.calls("DescribeContainerInstances"), 2);
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let (cluster, resolver) = setup(2, 5);
        resolver.resolve("prod", "i-4").await.unwrap();
        let listed = cluster.calls("ListContainerInstances");

        let arn = resolver.resolve("prod", "i-4").await.unwrap();
        assert_eq!(arn.as_deref(), Some("arn:container-instance/prod/i-4"));
        assert_eq!(cluster.calls("ListContainerInstances"), listed);
    }

    #[tokio::test]
    async fn absent_node_is_not_cached() {
        let (cluster, resolver) = setup(2, 3);
        assert_eq!(resolver.resolve("prod", "i-missing").await.unwrap(), None);
        assert!(resolver.cache().is_empty());

        assert_eq!(resolver.resolve("prod", "i-missing").await.unwrap(), None);
        // Both calls scanned all pages: [0,1] and [2].
        assert_eq!(cluster.calls("ListContainerInstances"), 4);
    }

    #[tokio::test]
    async fn same_node_id_resolves_per_cluster() {
        let cluster = Arc::new(InMemoryCluster::new());
        let prod = cluster.add_instance("i-1");
        let staging = cluster.add_instance_in("staging", "i-1");
        cluster.add_instance_in("staging", "i-2");
        let resolver = NodeIdentityResolver::new(cluster.clone(), Arc::new(IdentityCache::new()));

        let arn = resolver.resolve("staging", "i-1").await.unwrap();
        assert_eq!(arn.as_deref(), Some(staging.as_str()));
        let arn = resolver.resolve("prod", "i-1").await.unwrap();
        assert_eq!(arn.as_deref(), Some(prod.as_str()));
        assert_eq!(resolver.resolve("prod", "i-2").await.unwrap(), None);

        assert_eq!(resolver.cache().len(), 2);
        assert_eq!(resolver.cache().get("staging", "i-1"), Some(staging));
    }

    #[tokio::test]
    async fn empty_cluster_resolves_to_none() {
        let (cluster, resolver) = setup(10, 0);
        assert_eq!(resolver.resolve("prod", "i-0").await.unwrap(), None);
        assert_eq!(cluster.calls("DescribeContainerInstances"), 0);
    }

    #[tokio::test]
    async fn describe_failure_aborts_without_caching() {
        let (cluster, resolver) = setup(2, 5);
        cluster.fail_after("DescribeContainerInstances", 1);

        let err = resolver.resolve("prod", "i-4").await.unwrap_err();
        assert!(matches!(
            err,
            ClusterError::Api {
                op: "DescribeContainerInstances",
                ..
            }
        ));
        assert!(resolver.cache().is_empty());
    }

    #[tokio::test]
    async fn listing_failure_is_wrapped() {
        let (cluster, resolver) = setup(2, 5);
        cluster.fail_after("ListContainerInstances", 0);

        let err = resolver.resolve("prod", "i-0").await.unwrap_err();
        assert!(err.to_string().starts_with("ListContainerInstances: "));
    }
}
