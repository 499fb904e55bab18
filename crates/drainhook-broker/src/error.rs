//! Broker error types.

use std::time::Duration;

use drainhook_core::ApiError;
use thiserror::Error;

pub type BrokerResult<T> = Result<T, BrokerError>;

/// Errors raised while inspecting a broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("{op}: {source}")]
    Api {
        op: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("connecting to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    #[error("broker host is empty")]
    EmptyHost,
}

impl BrokerError {
    pub(crate) fn api(op: &'static str) -> impl FnOnce(ApiError) -> Self {
        move |source| Self::Api { op, source }
    }
}
