//! drainhook-broker: streaming-broker side of node readiness.
//!
//! A broker node is ready once every partition of every topic it can see
//! has as many in-sync replicas as replicas. The metadata client is
//! reached through [`BrokerConnector`]; connection and metadata failures
//! are retriable and reported as [`drainhook_core::Readiness::Unavailable`].

pub mod api;
pub mod error;
pub mod memory;
pub mod readiness;
pub mod topology;

pub use api::{BrokerConnector, BrokerMetadata, broker_address};
pub use error::{BrokerError, BrokerResult};
pub use memory::InMemoryBroker;
pub use readiness::BrokerReadinessEvaluator;
pub use topology::{BrokerTopology, PartitionReplicas};
