//! The workflow engine API as consumed by drainhook.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use drainhook_core::{ApiResult, Page};

/// Execution status filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionStatus {
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Aborted,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::TimedOut => "TIMED_OUT",
            Self::Aborted => "ABORTED",
        }
    }
}

/// Workflow engine client.
#[async_trait]
pub trait WorkflowApi: Send + Sync {
    /// Start an execution. Returns the execution id.
    async fn start_execution(&self, state_machine_arn: &str, name: &str, input: &str) -> ApiResult<String>;

    /// Execution ids of `state_machine_arn` in `status`, one page at a time.
    async fn list_executions(
        &self,
        state_machine_arn: &str,
        status: ExecutionStatus,
        next_token: Option<&str>,
    ) -> ApiResult<Page<String>>;
}

/// Execution name for a workflow started at `now`: `YYYYMMDDTHHMMSSZ`.
pub fn execution_name(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}
