//! drainhook-steps: one handler per step of a lifecycle workflow.
//!
//! Starter steps turn a fleet lifecycle event into a seeded
//! [`ParameterBag`](drainhook_core::ParameterBag) and start a workflow
//! execution with it. Every later step takes the bag the workflow hands
//! back, does one thing, and records its answer in the bag.
//!
//! | Step | Handler |
//! |---|---|
//! | start drainer | [`start_drainer`] |
//! | start cluster-ready poller | [`start_cluster_ready_poller`] |
//! | start broker-ready poller | [`start_broker_ready_poller`] |
//! | check cluster ready | [`check_cluster_ready`] |
//! | check broker ready | [`check_broker_ready`] |
//! | check deadline | [`check_deadline`] |
//! | count tasks | [`count_tasks`] |
//! | count running executions | [`count_running_executions`] |
//! | record heartbeat | [`record_heartbeat`] |
//! | complete lifecycle action | [`complete_lifecycle_action`] |

pub mod checks;
pub mod context;
pub mod counts;
pub mod error;
pub mod fleet;
pub mod lifecycle;
pub mod memory;
pub mod seed;
pub mod starters;
pub mod workflow;

pub use checks::{check_broker_ready, check_cluster_ready, check_deadline};
pub use context::StepContext;
pub use counts::{count_running_executions, count_tasks};
pub use error::{StepError, StepResult};
pub use fleet::{FleetApi, FleetInstance, LifecycleAction, LifecycleActionResult, Reservation};
pub use lifecycle::{complete_lifecycle_action, record_heartbeat};
pub use memory::{Execution, InMemoryFleet, InMemoryWorkflow};
pub use seed::{SeedKind, seed_parameters};
pub use starters::{StartedExecution, start_broker_ready_poller, start_cluster_ready_poller, start_drainer};
pub use workflow::{ExecutionStatus, WorkflowApi, execution_name};
