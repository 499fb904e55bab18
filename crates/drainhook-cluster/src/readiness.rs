//! Container-cluster node readiness.
//!
//! A node is ready once it has joined the cluster, its agent is
//! connected, it is ACTIVE, and every required task family has at least
//! one running task on it. Transient API failures are logged and reported
//! as [`Readiness::Unavailable`] so the caller simply polls again.

use std::sync::Arc;

use drainhook_core::{NotReadyReason, Readiness};
use tracing::{debug, info, warn};

use crate::api::{ClusterApi, STATUS_ACTIVE};
use crate::error::{ClusterError, ClusterResult};
use crate::resolver::NodeIdentityResolver;
use crate::tasks::count_running_tasks;

/// Result of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterReadiness {
    pub readiness: Readiness,
    /// Membership id, if known by the end of the evaluation.
    pub instance_arn: Option<String>,
}

impl ClusterReadiness {
    fn new(readiness: Readiness, instance_arn: Option<String>) -> Self {
        Self {
            readiness,
            instance_arn,
        }
    }
}

/// Evaluates whether a fleet node is ready to serve in the cluster.
#[derive(Clone)]
pub struct ClusterReadinessEvaluator {
    api: Arc<dyn ClusterApi>,
    resolver: NodeIdentityResolver,
}

impl ClusterReadinessEvaluator {
    pub fn new(api: Arc<dyn ClusterApi>, resolver: NodeIdentityResolver) -> Self {
        Self { api, resolver }
    }

    /// Evaluate readiness of `ec2_instance_id`.
    ///
    /// `instance_arn` is the membership id if an earlier step already
    /// resolved it. The only `Err` is a describe call returning other than
    /// exactly one record; everything else resolves to a [`Readiness`].
    pub async fn evaluate(
        &self,
        cluster: &str,
        ec2_instance_id: &str,
        instance_arn: Option<&str>,
        required_families: &[String],
    ) -> ClusterResult<ClusterReadiness> {
        let arn = match instance_arn {
            Some(arn) => arn.to_string(),
            None => match self.resolver.resolve(cluster, ec2_instance_id).await {
                Ok(Some(arn)) => arn,
                Ok(None) => {
                    info!(%cluster, %ec2_instance_id, "no container instance for node yet");
                    return Ok(ClusterReadiness::new(
                        Readiness::NotReady(NotReadyReason::NotJoined),
                        None,
                    ));
                }
                Err(e) => {
                    warn!(%cluster, %ec2_instance_id, error = %e, "identity resolution failed, will retry");
                    return Ok(ClusterReadiness::new(Readiness::Unavailable(e.to_string()), None));
                }
            },
        };

        let readiness = self.evaluate_instance(cluster, &arn, required_families).await?;
        Ok(ClusterReadiness::new(readiness, Some(arn)))
    }

    async fn evaluate_instance(
        &self,
        cluster: &str,
        arn: &str,
        required_families: &[String],
    ) -> ClusterResult<Readiness> {
        let described = match self
            .api
            .describe_container_instances(cluster, &[arn.to_string()])
            .await
        {
            Ok(described) => described,
            Err(e) => return Ok(unavailable("DescribeContainerInstances", arn, e)),
        };
        let [instance] = described.as_slice() else {
            return Err(ClusterError::Assertion(format!(
                "expected exactly one container instance for {arn}, got {}",
                described.len()
            )));
        };

        if !instance.agent_connected || instance.status != STATUS_ACTIVE {
            info!(
                instance = %arn,
                connected = instance.agent_connected,
                status = %instance.status,
                "container instance not connected or not ACTIVE"
            );
            return Ok(Readiness::NotReady(NotReadyReason::Inactive {
                connected: instance.agent_connected,
                status: instance.status.clone(),
            }));
        }

        for family in required_families {
            let running =
                match count_running_tasks(self.api.as_ref(), cluster, arn, Some(family)).await {
                    Ok(n) => n,
                    Err(e) => return Ok(unavailable("ListTasks", arn, e)),
                };
            debug!(instance = %arn, %family, running, "running tasks for family");
            if running == 0 {
                info!(instance = %arn, %family, "container instance not ready");
                return Ok(Readiness::NotReady(NotReadyReason::MissingFamily {
                    family: family.clone(),
                }));
            }
        }

        info!(instance = %arn, families = required_families.len(), "container instance ready");
        Ok(Readiness::Ready)
    }
}

fn unavailable(op: &'static str, arn: &str, error: drainhook_core::ApiError) -> Readiness {
    warn!(instance = %arn, op, %error, "readiness check failed, will retry");
    Readiness::Unavailable(format!("{op}: {error}"))
}
