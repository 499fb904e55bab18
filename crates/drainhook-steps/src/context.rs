//! Collaborators and configuration shared by every step in a process.

use std::sync::Arc;

use drainhook_broker::{BrokerConnector, BrokerReadinessEvaluator};
use drainhook_cluster::{
    ClusterApi, ClusterReadinessEvaluator, IdentityCache, NodeIdentityResolver, WorkloadEvictor,
};
use drainhook_core::StaticConfig;

use crate::fleet::FleetApi;
use crate::workflow::WorkflowApi;

/// Everything a step handler needs besides the parameter bag.
///
/// Built once per process. The identity cache lives here so that every
/// invocation served by the process shares it.
#[derive(Clone)]
pub struct StepContext {
    pub config: StaticConfig,
    pub cluster: Arc<dyn ClusterApi>,
    pub broker: Arc<dyn BrokerConnector>,
    pub fleet: Arc<dyn FleetApi>,
    pub workflow: Arc<dyn WorkflowApi>,
    identity_cache: Arc<IdentityCache>,
}

impl StepContext {
    pub fn new(
        config: StaticConfig,
        cluster: Arc<dyn ClusterApi>,
        broker: Arc<dyn BrokerConnector>,
        fleet: Arc<dyn FleetApi>,
        workflow: Arc<dyn WorkflowApi>,
    ) -> Self {
        let identity_cache = Arc::new(IdentityCache::with_optional_ttl(config.identity_cache_ttl));
        Self {
            config,
            cluster,
            broker,
            fleet,
            workflow,
            identity_cache,
        }
    }

    /// Share an existing identity cache instead of the one built from config.
    pub fn with_identity_cache(mut self, cache: Arc<IdentityCache>) -> Self {
        self.identity_cache = cache;
        self
    }

    pub fn identity_cache(&self) -> &Arc<IdentityCache> {
        &self.identity_cache
    }

    pub fn resolver(&self) -> NodeIdentityResolver {
        NodeIdentityResolver::new(Arc::clone(&self.cluster), Arc::clone(&self.identity_cache))
    }

    pub fn evictor(&self) -> WorkloadEvictor {
        WorkloadEvictor::new(Arc::clone(&self.cluster))
    }

    pub fn cluster_readiness(&self) -> ClusterReadinessEvaluator {
        ClusterReadinessEvaluator::new(Arc::clone(&self.cluster), self.resolver())
    }

    pub fn broker_readiness(&self) -> BrokerReadinessEvaluator {
        BrokerReadinessEvaluator::new(Arc::clone(&self.broker))
    }
}
