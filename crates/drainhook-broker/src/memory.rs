//! In-memory [`BrokerConnector`] for tests and dry runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use drainhook_core::{ApiError, ApiResult};

use crate::api::{BrokerConnector, BrokerMetadata};
use crate::topology::{BrokerTopology, PartitionReplicas};

#[derive(Default)]
struct Inner {
    topology: BrokerTopology,
    calls: HashMap<&'static str, usize>,
    fail_after: HashMap<&'static str, usize>,
    connections: Vec<String>,
    closed: usize,
}

/// A broker cluster held in memory. Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryBroker {
    pub fn new(topology: BrokerTopology) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                topology,
                ..Inner::default()
            })),
        }
    }

    /// Mutate the topology in place, e.g. to let a replica catch up.
    pub fn update(&self, f: impl FnOnce(&mut BrokerTopology)) {
        f(&mut lock(&self.inner).topology);
    }

    /// Addresses passed to `connect`, in call order.
    pub fn connections(&self) -> Vec<String> {
        lock(&self.inner).connections.clone()
    }

    /// Number of connections closed.
    pub fn closed(&self) -> usize {
        lock(&self.inner).closed
    }

    /// Number of calls made to `op` (`"Connect"`, `"Partitions"`, …).
    pub fn calls(&self, op: &str) -> usize {
        lock(&self.inner).calls.get(op).copied().unwrap_or(0)
    }

    /// Let `op` succeed `successes` more times, then fail every later call.
    pub fn fail_after(&self, op: &'static str, successes: usize) {
        let mut inner = lock(&self.inner);
        let made = inner.calls.get(op).copied().unwrap_or(0);
        inner.fail_after.insert(op, made + successes);
    }

    pub fn clear_failures(&self) {
        lock(&self.inner).fail_after.clear();
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

fn enter<'a>(inner: &'a Mutex<Inner>, op: &'static str) -> Result<MutexGuard<'a, Inner>, ApiError> {
    let mut guard = lock(inner);
    let made = {
        let n = guard.calls.entry(op).or_insert(0);
        *n += 1;
        *n
    };
    let failing = guard.fail_after.get(op).is_some_and(|&allowed| made > allowed);
    if failing {
        return Err(ApiError::new(format!("{op} failed (injected)")));
    }
    Ok(guard)
}

#[async_trait]
impl BrokerConnector for InMemoryBroker {
    async fn connect(&self, addr: &str) -> ApiResult<Box<dyn BrokerMetadata>> {
        let mut inner = enter(&self.inner, "Connect")?;
        inner.connections.push(addr.to_string());
        Ok(Box::new(Connection {
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct Connection {
    inner: Arc<Mutex<Inner>>,
}

impl Connection {
    fn partition(&self, op: &'static str, topic: &str, partition: i32) -> ApiResult<PartitionReplicas> {
        let inner = enter(&self.inner, op)?;
        inner
            .topology
            .partition(topic, partition)
            .cloned()
            .ok_or_else(|| ApiError::new(format!("unknown partition {topic}[{partition}]")))
    }
}

#[async_trait]
impl BrokerMetadata for Connection {
    async fn topics(&self) -> ApiResult<Vec<String>> {
        let inner = enter(&self.inner, "Topics")?;
        Ok(inner.topology.topics().map(str::to_string).collect())
    }

    async fn partitions(&self, topic: &str) -> ApiResult<Vec<i32>> {
        let inner = enter(&self.inner, "Partitions")?;
        inner
            .topology
            .partitions(topic)
            .ok_or_else(|| ApiError::new(format!("unknown topic {topic}")))
    }

    async fn replicas(&self, topic: &str, partition: i32) -> ApiResult<Vec<i32>> {
        Ok(self.partition("Replicas", topic, partition)?.replicas)
    }

    async fn in_sync_replicas(&self, topic: &str, partition: i32) -> ApiResult<Vec<i32>> {
        Ok(self.partition("InSyncReplicas", topic, partition)?.in_sync)
    }

    async fn close(&self) -> ApiResult<()> {
        let mut inner = enter(&self.inner, "Close")?;
        inner.closed += 1;
        Ok(())
    }
}
