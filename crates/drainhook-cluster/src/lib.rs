//! drainhook-cluster: container-cluster side of node retirement.
//!
//! Everything here talks to the cluster through the [`ClusterApi`] trait;
//! the real client lives with the invocation host.
//!
//! # Architecture
//!
//! ```text
//! ClusterReadinessEvaluator
//!   ├── NodeIdentityResolver ── IdentityCache (fleet node → cluster node)
//!   └── count_running_tasks() per required family
//!
//! WorkloadEvictor
//!   ├── list tasks on node, page by page
//!   ├── describe page, test EvictionPredicate
//!   └── stop matches (aborts on first failure)
//! ```
//!
//! Calls are issued strictly one at a time; nothing here fans out.

pub mod api;
pub mod cache;
pub mod drain;
pub mod error;
pub mod evictor;
pub mod memory;
pub mod readiness;
pub mod resolver;
pub mod tasks;

pub use api::{ClusterApi, ContainerInstance, DesiredStatus, Task, TaskFilter};
pub use cache::IdentityCache;
pub use drain::set_draining;
pub use error::{ClusterError, ClusterResult};
pub use evictor::{EvictionPredicate, EvictionReport, GroupAllowList, NotService, WorkloadEvictor};
pub use memory::InMemoryCluster;
pub use readiness::{ClusterReadiness, ClusterReadinessEvaluator};
pub use resolver::NodeIdentityResolver;
pub use tasks::count_running_tasks;
