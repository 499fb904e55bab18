//! drainhook-core: shared types for the node lifecycle helpers.
//!
//! Every step of a lifecycle episode reads and writes a single
//! [`ParameterBag`]. The bag is seeded from a [`LifecycleEvent`] plus the
//! [`StaticConfig`] read from the environment, then handed back and forth
//! between the external workflow engine and the step handlers, gaining
//! fields as it goes.
//!
//! # Layout
//!
//! ```text
//! LifecycleEvent ──seed──▶ ParameterBag ──▶ step ──▶ ParameterBag ──▶ …
//!                               ▲
//!                        StaticConfig (env / toml)
//! ```
//!
//! Readiness checks report a three-way [`Readiness`]; the only fatal
//! condition on the polling path is a malformed deadline, surfaced by
//! [`DeadlineGuard`].

pub mod api;
pub mod config;
pub mod deadline;
pub mod duration;
pub mod error;
pub mod readiness;
pub mod types;

pub use api::{ApiError, ApiResult, Page};
pub use config::StaticConfig;
pub use deadline::DeadlineGuard;
pub use error::{CoreError, CoreResult};
pub use readiness::{NotReadyReason, Readiness};
pub use types::*;
