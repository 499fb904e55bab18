//! Step error types.

use drainhook_cluster::ClusterError;
use drainhook_core::{ApiError, CoreError};
use thiserror::Error;

pub type StepResult<T> = Result<T, StepError>;

/// Fatal step failures. Each one ends the episode.
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error("{op}: {source}")]
    Api {
        op: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("assertion failure: {0}")]
    Assertion(String),

    #[error("no container instance matching fleet node {ec2_instance_id} found in cluster {cluster}")]
    NotInCluster {
        cluster: String,
        ec2_instance_id: String,
    },
}

impl StepError {
    pub(crate) fn api(op: &'static str) -> impl FnOnce(ApiError) -> Self {
        move |source| Self::Api { op, source }
    }
}
