//! Broker partition readiness.
//!
//! Walks every partition of every topic, one metadata call at a time, and
//! stops at the first partition whose in-sync set is smaller than its
//! replica set.

use std::sync::Arc;
use std::time::Duration;

use drainhook_core::Readiness;
use tracing::{debug, info, warn};

use crate::api::{BrokerConnector, BrokerMetadata, broker_address};
use crate::error::{BrokerError, BrokerResult};
use crate::topology::PartitionReplicas;

/// Upper bound on establishing the metadata connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Evaluates whether a broker node's partitions are fully in sync.
#[derive(Clone)]
pub struct BrokerReadinessEvaluator {
    connector: Arc<dyn BrokerConnector>,
    connect_timeout: Duration,
}

impl BrokerReadinessEvaluator {
    pub fn new(connector: Arc<dyn BrokerConnector>) -> Self {
        Self {
            connector,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Readiness of the broker at `host:port`.
    ///
    /// Never fails: every connection or metadata error is logged and
    /// reported as [`Readiness::Unavailable`] so the caller polls again.
    pub async fn evaluate(&self, host: &str, port: u16) -> Readiness {
        match self.check(host, port).await {
            Ok(readiness) => readiness,
            Err(e) => {
                warn!(%host, port, error = %e, "broker readiness check failed, will retry");
                Readiness::Unavailable(e.to_string())
            }
        }
    }

    /// Like [`evaluate`](Self::evaluate), but surfaces failures as `Err`.
    pub async fn check(&self, host: &str, port: u16) -> BrokerResult<Readiness> {
        let addr = broker_address(host, port)?;
        let conn = tokio::time::timeout(self.connect_timeout, self.connector.connect(&addr))
            .await
            .map_err(|_| BrokerError::ConnectTimeout {
                addr: addr.clone(),
                timeout: self.connect_timeout,
            })?
            .map_err(BrokerError::api("Connect"))?;

        let result = walk_partitions(conn.as_ref(), &addr).await;
        if let Err(e) = conn.close().await {
            debug!(%addr, error = %e, "closing broker connection failed");
        }
        result
    }
}

async fn walk_partitions(meta: &dyn BrokerMetadata, addr: &str) -> BrokerResult<Readiness> {
    let topics = meta.topics().await.map_err(BrokerError::api("Topics"))?;
    let mut checked = 0usize;

    for topic in &topics {
        let partitions = meta
            .partitions(topic)
            .await
            .map_err(BrokerError::api("Partitions"))?;
        for partition in partitions {
            let replicas = meta
                .replicas(topic, partition)
                .await
                .map_err(BrokerError::api("Replicas"))?;
            let in_sync = meta
                .in_sync_replicas(topic, partition)
                .await
                .map_err(BrokerError::api("InSyncReplicas"))?;
            debug!(
                %topic,
                partition,
                replicas = replicas.len(),
                in_sync = in_sync.len(),
                "partition replicas"
            );
            checked += 1;

            if let Some(reason) = PartitionReplicas::new(replicas, in_sync).lag(topic, partition) {
                info!(%addr, %reason, "broker not ready");
                return Ok(Readiness::NotReady(reason));
            }
        }
    }

    info!(%addr, topics = topics.len(), partitions = checked, "broker ready");
    Ok(Readiness::Ready)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBroker;
    use crate::topology::BrokerTopology;
    use async_trait::async_trait;
    use drainhook_core::{ApiResult, NotReadyReason};

    fn orders(in_sync_p1: &[i32]) -> BrokerTopology {
        BrokerTopology::new()
            .with_partition("orders", 0, &[1, 2, 3], &[1, 2, 3])
            .with_partition("orders", 1, &[1, 2, 3], in_sync_p1)
            .with_partition("payments", 0, &[1, 2], &[1, 2])
    }

    #[tokio::test]
    async fn under_replicated_partition_is_not_ready() {
        let broker = InMemoryBroker::new(orders(&[1, 3]));
        let eval = BrokerReadinessEvaluator::new(Arc::new(broker.clone()));

        let readiness = eval.evaluate("10.0.1.17", 9092).await;
        assert_eq!(
            readiness,
            Readiness::NotReady(NotReadyReason::UnderReplicated {
                topic: "orders".to_string(),
                partition: 1,
                replicas: 3,
                in_sync: 2,
            })
        );
        // Short-circuits before the second topic.
        assert_eq!(broker.calls("Partitions"), 1);
        assert_eq!(broker.connections(), vec!["10.0.1.17:9092".to_string()]);
        assert_eq!(broker.closed(), 1);
    }

    #[tokio::test]
    async fn ready_once_replicas_catch_up() {
        let broker = InMemoryBroker::new(orders(&[1, 3]));
        let eval = BrokerReadinessEvaluator::new(Arc::new(broker.clone()));
        assert!(!eval.evaluate("10.0.1.17", 9092).await.is_ready());

        broker.update(|t| t.set_partition("orders", 1, &[1, 2, 3], &[1, 2, 3]));
        assert_eq!(eval.evaluate("10.0.1.17", 9092).await, Readiness::Ready);
    }

    #[tokio::test]
    async fn broker_without_topics_is_ready() {
        let broker = InMemoryBroker::new(BrokerTopology::new());
        let eval = BrokerReadinessEvaluator::new(Arc::new(broker));
        assert!(eval.evaluate("10.0.1.17", 9092).await.is_ready());
    }

    #[tokio::test]
    async fn metadata_failures_are_retriable() {
        let broker = InMemoryBroker::new(orders(&[1, 2, 3]));
        let eval = BrokerReadinessEvaluator::new(Arc::new(broker.clone()));

        broker.fail_after("InSyncReplicas", 1);
        let r = eval.evaluate("10.0.1.17", 9092).await;
        assert!(matches!(r, Readiness::Unavailable(ref e) if e.starts_with("InSyncReplicas")));
        assert_eq!(broker.closed(), 1);

        broker.clear_failures();
        broker.fail_after("Connect", 0);
        let err = eval.check("10.0.1.17", 9092).await.unwrap_err();
        assert!(matches!(err, BrokerError::Api { op: "Connect", .. }));
    }

    #[tokio::test]
    async fn ipv6_address_is_bracketed() {
        let broker = InMemoryBroker::new(BrokerTopology::new());
        let eval = BrokerReadinessEvaluator::new(Arc::new(broker.clone()));
        eval.evaluate("fd00::17", 9093).await;
        assert_eq!(broker.connections(), vec!["[fd00::17]:9093".to_string()]);
    }

    struct Hanging;

    #[async_trait]
    impl BrokerConnector for Hanging {
        async fn connect(&self, _addr: &str) -> ApiResult<Box<dyn BrokerMetadata>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(drainhook_core::ApiError::new("unreachable"))
        }
    }

    #[tokio::test]
    async fn slow_connect_times_out() {
        let eval = BrokerReadinessEvaluator::new(Arc::new(Hanging))
            .with_connect_timeout(Duration::from_millis(20));
        let err = eval.check("10.0.1.17", 9092).await.unwrap_err();
        assert!(matches!(err, BrokerError::ConnectTimeout { .. }));
        assert!(matches!(eval.evaluate("10.0.1.17", 9092).await, Readiness::Unavailable(_)));
    }
}
