//! Shapes shared by the collaborator traits (cluster, broker, fleet, workflow).

use thiserror::Error;

/// Result of a single call against an external API.
pub type ApiResult<T> = Result<T, ApiError>;

/// Failure reported by an external API client.
///
/// The clients themselves are outside this workspace; all the core needs
/// is a message to log or wrap.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Token for the next page, `None` on the last page.
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    /// A final page holding `items`.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }

    pub fn is_last(&self) -> bool {
        self.next_token.is_none()
    }
}
