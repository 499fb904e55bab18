//! Replica layout of a broker cluster.

use std::collections::BTreeMap;

use drainhook_core::NotReadyReason;

/// Replica and in-sync sets of one partition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionReplicas {
    pub replicas: Vec<i32>,
    pub in_sync: Vec<i32>,
}

impl PartitionReplicas {
    pub fn new(replicas: Vec<i32>, in_sync: Vec<i32>) -> Self {
        Self { replicas, in_sync }
    }

    /// Sizes are compared, not members.
    pub fn is_in_sync(&self) -> bool {
        self.replicas.len() == self.in_sync.len()
    }

    /// The not-ready reason for this partition, if it lags.
    pub fn lag(&self, topic: &str, partition: i32) -> Option<NotReadyReason> {
        (!self.is_in_sync()).then(|| NotReadyReason::UnderReplicated {
            topic: topic.to_string(),
            partition,
            replicas: self.replicas.len(),
            in_sync: self.in_sync.len(),
        })
    }
}

/// topic → partition → replicas, ordered for deterministic walks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrokerTopology {
    topics: BTreeMap<String, BTreeMap<i32, PartitionReplicas>>,
}

impl BrokerTopology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set_partition`](Self::set_partition).
    pub fn with_partition(mut self, topic: &str, partition: i32, replicas: &[i32], in_sync: &[i32]) -> Self {
        self.set_partition(topic, partition, replicas, in_sync);
        self
    }

    pub fn set_partition(&mut self, topic: &str, partition: i32, replicas: &[i32], in_sync: &[i32]) {
        self.topics
            .entry(topic.to_string())
            .or_default()
            .insert(partition, PartitionReplicas::new(replicas.to_vec(), in_sync.to_vec()));
    }

    /// A topic with no partitions yet.
    pub fn add_topic(&mut self, topic: &str) {
        self.topics.entry(topic.to_string()).or_default();
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.topics.keys().map(String::as_str)
    }

    pub fn partitions(&self, topic: &str) -> Option<Vec<i32>> {
        self.topics.get(topic).map(|p| p.keys().copied().collect())
    }

    pub fn partition(&self, topic: &str, partition: i32) -> Option<&PartitionReplicas> {
        self.topics.get(topic)?.get(&partition)
    }

    /// First lagging partition in (topic, partition) order.
    pub fn first_under_replicated(&self) -> Option<NotReadyReason> {
        self.topics.iter().find_map(|(topic, partitions)| {
            partitions
                .iter()
                .find_map(|(&partition, replicas)| replicas.lag(topic, partition))
        })
    }

    pub fn is_fully_replicated(&self) -> bool {
        self.first_under_replicated().is_none()
    }
}
