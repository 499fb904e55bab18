//! The broker metadata API as consumed by drainhook.

use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use drainhook_core::ApiResult;

use crate::error::{BrokerError, BrokerResult};

/// Opens metadata connections to a broker.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    /// Connect to the broker at `addr` (`host:port`).
    async fn connect(&self, addr: &str) -> ApiResult<Box<dyn BrokerMetadata>>;
}

/// An open metadata connection.
#[async_trait]
pub trait BrokerMetadata: Send + Sync {
    async fn topics(&self) -> ApiResult<Vec<String>>;

    async fn partitions(&self, topic: &str) -> ApiResult<Vec<i32>>;

    /// Broker ids holding a replica of the partition.
    async fn replicas(&self, topic: &str, partition: i32) -> ApiResult<Vec<i32>>;

    /// Broker ids whose replica is caught up with the leader.
    async fn in_sync_replicas(&self, topic: &str, partition: i32) -> ApiResult<Vec<i32>>;

    async fn close(&self) -> ApiResult<()> {
        Ok(())
    }
}

/// Join `host` and `port`, bracketing IPv6 literals.
pub fn broker_address(host: &str, port: u16) -> BrokerResult<String> {
    let host = host.trim();
    if host.is_empty() {
        return Err(BrokerError::EmptyHost);
    }
    let unbracketed = host.trim_start_matches('[').trim_end_matches(']');
    Ok(match unbracketed.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port).to_string(),
        Err(_) => format!("{host}:{port}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_host_and_port() {
        assert_eq!(broker_address("10.0.1.17", 9092).unwrap(), "10.0.1.17:9092");
        assert_eq!(
            broker_address("ip-10-0-1-17.ec2.internal", 9093).unwrap(),
            "ip-10-0-1-17.ec2.internal:9093"
        );
    }

    #[test]
    fn brackets_ipv6() {
        assert_eq!(broker_address("fd00::17", 9092).unwrap(), "[fd00::17]:9092");
        assert_eq!(broker_address("[fd00::17]", 9092).unwrap(), "[fd00::17]:9092");
    }

    #[test]
    fn empty_host_is_rejected() {
        assert!(matches!(broker_address("  ", 9092), Err(BrokerError::EmptyHost)));
    }
}
