//! In-memory fleet and workflow collaborators for tests and dry runs.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use drainhook_core::{ApiError, ApiResult, Page};

use crate::fleet::{FleetApi, FleetInstance, LifecycleAction, LifecycleActionResult, Reservation};
use crate::workflow::{ExecutionStatus, WorkflowApi};

/// Per-operation call counts and injected failures.
#[derive(Default)]
struct Faults {
    calls: HashMap<&'static str, usize>,
    fail_after: HashMap<&'static str, usize>,
}

impl Faults {
    fn enter(&mut self, op: &'static str) -> ApiResult<()> {
        let n = self.calls.entry(op).or_insert(0);
        *n += 1;
        match self.fail_after.get(op) {
            Some(&allowed) if *n > allowed => Err(ApiError::new(format!("{op} failed (injected)"))),
            _ => Ok(()),
        }
    }

    fn calls(&self, op: &str) -> usize {
        self.calls.get(op).copied().unwrap_or(0)
    }

    fn fail_after(&mut self, op: &'static str, successes: usize) {
        let made = self.calls(op);
        self.fail_after.insert(op, made + successes);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Fleet ─────────────────────────────────────────────────────────

#[derive(Default)]
struct FleetInner {
    reservations: Vec<Reservation>,
    heartbeats: Vec<LifecycleAction>,
    completions: Vec<(LifecycleAction, LifecycleActionResult)>,
    faults: Faults,
}

/// A compute fleet held in memory.
#[derive(Default)]
pub struct InMemoryFleet {
    inner: Mutex<FleetInner>,
}

impl InMemoryFleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Launch one node in its own reservation.
    pub fn add_instance(&self, instance_id: &str, private_ip_address: Option<&str>) {
        self.add_reservation(vec![FleetInstance {
            instance_id: instance_id.to_string(),
            private_ip_address: private_ip_address.map(str::to_string),
        }]);
    }

    pub fn add_reservation(&self, instances: Vec<FleetInstance>) {
        lock(&self.inner).reservations.push(Reservation { instances });
    }

    pub fn heartbeats(&self) -> Vec<LifecycleAction> {
        lock(&self.inner).heartbeats.clone()
    }

    pub fn completions(&self) -> Vec<(LifecycleAction, LifecycleActionResult)> {
        lock(&self.inner).completions.clone()
    }

    pub fn calls(&self, op: &str) -> usize {
        lock(&self.inner).faults.calls(op)
    }

    pub fn fail_after(&self, op: &'static str, successes: usize) {
        lock(&self.inner).faults.fail_after(op, successes);
    }
}

#[async_trait]
impl FleetApi for InMemoryFleet {
    async fn describe_instances(&self, instance_ids: &[String]) -> ApiResult<Vec<Reservation>> {
        let mut inner = lock(&self.inner);
        inner.faults.enter("DescribeInstances")?;
        Ok(inner
            .reservations
            .iter()
            .filter_map(|r| {
                let instances: Vec<FleetInstance> = r
                    .instances
                    .iter()
                    .filter(|i| instance_ids.contains(&i.instance_id))
                    .cloned()
                    .collect();
                (!instances.is_empty()).then_some(Reservation { instances })
            })
            .collect())
    }

    async fn record_lifecycle_action_heartbeat(&self, action: &LifecycleAction) -> ApiResult<()> {
        let mut inner = lock(&self.inner);
        inner.faults.enter("RecordLifecycleActionHeartbeat")?;
        inner.heartbeats.push(action.clone());
        Ok(())
    }

    async fn complete_lifecycle_action(
        &self,
        action: &LifecycleAction,
        result: LifecycleActionResult,
    ) -> ApiResult<()> {
        let mut inner = lock(&self.inner);
        inner.faults.enter("CompleteLifecycleAction")?;
        inner.completions.push((action.clone(), result));
        Ok(())
    }
}

// ── Workflow ──────────────────────────────────────────────────────

/// One execution known to [`InMemoryWorkflow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub execution_arn: String,
    pub state_machine_arn: String,
    pub name: String,
    pub input: String,
    pub status: ExecutionStatus,
}

#[derive(Default)]
struct WorkflowInner {
    executions: Vec<Execution>,
    faults: Faults,
}

/// A workflow engine held in memory. Started executions stay RUNNING
/// until [`set_status`](Self::set_status) moves them on.
pub struct InMemoryWorkflow {
    inner: Mutex<WorkflowInner>,
    page_size: usize,
}

impl Default for InMemoryWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryWorkflow {
    pub fn new() -> Self {
        Self {
            inner: Mutex::default(),
            page_size: 100,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn executions(&self) -> Vec<Execution> {
        lock(&self.inner).executions.clone()
    }

    /// Move the named execution to `status`.
    pub fn set_status(&self, name: &str, status: ExecutionStatus) {
        let mut inner = lock(&self.inner);
        if let Some(e) = inner.executions.iter_mut().find(|e| e.name == name) {
            e.status = status;
        }
    }

    pub fn calls(&self, op: &str) -> usize {
        lock(&self.inner).faults.calls(op)
    }

    pub fn fail_after(&self, op: &'static str, successes: usize) {
        lock(&self.inner).faults.fail_after(op, successes);
    }
}

#[async_trait]
impl WorkflowApi for InMemoryWorkflow {
    async fn start_execution(&self, state_machine_arn: &str, name: &str, input: &str) -> ApiResult<String> {
        let mut inner = lock(&self.inner);
        inner.faults.enter("StartExecution")?;
        if inner
            .executions
            .iter()
            .any(|e| e.state_machine_arn == state_machine_arn && e.name == name)
        {
            return Err(ApiError::new(format!("execution {name} already exists")));
        }
        let execution_arn = format!("{state_machine_arn}:{name}");
        inner.executions.push(Execution {
            execution_arn: execution_arn.clone(),
            state_machine_arn: state_machine_arn.to_string(),
            name: name.to_string(),
            input: input.to_string(),
            status: ExecutionStatus::Running,
        });
        Ok(execution_arn)
    }

    async fn list_executions(
        &self,
        state_machine_arn: &str,
        status: ExecutionStatus,
        next_token: Option<&str>,
    ) -> ApiResult<Page<String>> {
        let mut inner = lock(&self.inner);
        inner.faults.enter("ListExecutions")?;
        let start = match next_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| ApiError::new(format!("invalid next token {token:?}")))?,
            None => 0,
        };
        let matching: Vec<String> = inner
            .executions
            .iter()
            .filter(|e| e.state_machine_arn == state_machine_arn && e.status == status)
            .map(|e| e.execution_arn.clone())
            .collect();
        let end = (start + self.page_size).min(matching.len());
        let items = matching.get(start..end).map(<[String]>::to_vec).unwrap_or_default();
        Ok(Page {
            items,
            next_token: (end < matching.len()).then(|| end.to_string()),
        })
    }
}
