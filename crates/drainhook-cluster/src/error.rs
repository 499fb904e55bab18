//! Cluster error types.

use drainhook_core::ApiError;
use thiserror::Error;

/// Errors raised by cluster operations.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// A cluster API call failed.
    #[error("{op}: {source}")]
    Api {
        op: &'static str,
        #[source]
        source: ApiError,
    },

    /// The cluster answered with something that cannot be right.
    #[error("assertion failure: {0}")]
    Assertion(String),

    /// Eviction stopped at the first failure; later pages were not touched.
    #[error(
        "eviction aborted after stopping {stopped} task(s) on {pages_processed} page(s), \
         {} page(s) left unprocessed: {op}: {source}",
        pages_label(.unprocessed_pages)
    )]
    EvictionAborted {
        op: &'static str,
        #[source]
        source: ApiError,
        /// Tasks stopped before the failure.
        stopped: usize,
        /// Pages fully processed before the failure.
        pages_processed: usize,
        /// Pages not processed, counting the one that failed. `None` if the
        /// listing itself failed and the rest could not be counted.
        unprocessed_pages: Option<usize>,
    },
}

impl ClusterError {
    pub(crate) fn api(op: &'static str) -> impl FnOnce(ApiError) -> Self {
        move |source| Self::Api { op, source }
    }
}

fn pages_label(pages: &Option<usize>) -> String {
    pages.map_or_else(|| "unknown".to_string(), |n| n.to_string())
}

pub type ClusterResult<T> = Result<T, ClusterError>;
