//! Three-way readiness result shared by the cluster and broker evaluators.

use std::fmt;

/// Outcome of one readiness evaluation.
///
/// `NotReady` and `Unavailable` both mean "poll again later"; they differ
/// in whether the target answered. Fatal conditions are not represented
/// here and travel as `Err` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Every requirement holds.
    Ready,
    /// The target answered and is not ready yet.
    NotReady(NotReadyReason),
    /// A transient API or connection failure prevented the check.
    Unavailable(String),
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Whether the caller should keep polling.
    pub fn should_retry(&self) -> bool {
        !self.is_ready()
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.write_str("ready"),
            Self::NotReady(reason) => write!(f, "not ready: {reason}"),
            Self::Unavailable(error) => write!(f, "unavailable: {error}"),
        }
    }
}

/// Why a target answered but was not ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotReadyReason {
    /// The fleet node has not registered with the container cluster.
    NotJoined,
    /// The cluster node is registered but disconnected or not ACTIVE.
    Inactive { connected: bool, status: String },
    /// A required workload family has no running instance on the node.
    MissingFamily { family: String },
    /// A broker partition has fewer in-sync replicas than replicas.
    UnderReplicated {
        topic: String,
        partition: i32,
        replicas: usize,
        in_sync: usize,
    },
}

impl fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotJoined => f.write_str("node has not joined the cluster"),
            Self::Inactive { connected, status } => {
                write!(f, "node agent connected={connected}, status={status}")
            }
            Self::MissingFamily { family } => {
                write!(f, "no running tasks for family {family}")
            }
            Self::UnderReplicated {
                topic,
                partition,
                replicas,
                in_sync,
            } => write!(
                f,
                "{topic}[{partition}] has {replicas} replicas but {in_sync} in sync"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_ready_stops_polling() {
        assert!(!Readiness::Ready.should_retry());
        assert!(Readiness::NotReady(NotReadyReason::NotJoined).should_retry());
        assert!(Readiness::Unavailable("throttled".into()).should_retry());
    }

    #[test]
    fn display_names_the_partition() {
        let r = Readiness::NotReady(NotReadyReason::UnderReplicated {
            topic: "orders".into(),
            partition: 1,
            replicas: 3,
            in_sync: 2,
        });
        assert_eq!(r.to_string(), "not ready: orders[1] has 3 replicas but 2 in sync");
    }
}
