//! Seeding a parameter bag at the start of an episode.

use chrono::{DateTime, Utc};
use drainhook_core::deadline::deadline_after;
use drainhook_core::{CoreResult, LifecycleEvent, ParameterBag, StaticConfig};
use tracing::debug;

/// Which workflow the seeded bag is for. Decides which configuration
/// values are required and copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedKind {
    /// Drain a terminating node.
    Drain,
    /// Wait for a launching node to run its required families.
    ClusterReady,
    /// Wait for a launching broker node to catch up.
    BrokerReady,
}

/// Build the first bag of an episode from `event` and `config`.
///
/// Every kind needs the workflow identifier; the cluster kinds also need
/// the cluster name. The deadline is `now` plus the configured timeout.
pub fn seed_parameters(
    kind: SeedKind,
    event: &LifecycleEvent,
    config: &StaticConfig,
    now: DateTime<Utc>,
) -> CoreResult<ParameterBag> {
    let mut bag = ParameterBag::from_event(event);
    bag.state_machine_arn = Some(config.require_state_machine_arn()?.to_string());

    match kind {
        SeedKind::Drain => {
            bag.ecs_cluster = Some(config.require_cluster()?.to_string());
        }
        SeedKind::ClusterReady => {
            bag.ecs_cluster = Some(config.require_cluster()?.to_string());
            bag.required_task_families = config.required_task_families.clone();
        }
        SeedKind::BrokerReady => {
            bag.kafka_port = Some(config.broker_port);
        }
    }

    let deadline = deadline_after(now, config.timeout)?;
    debug!(?kind, ec2_instance_id = %bag.ec2_instance_id, %deadline, "seeded parameters");
    bag.deadline = Some(deadline);
    Ok(bag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use drainhook_core::{CoreError, Transition};
    use std::time::Duration;

    fn event() -> LifecycleEvent {
        LifecycleEvent {
            lifecycle_action_token: "tok".to_string(),
            auto_scaling_group_name: "asg".to_string(),
            lifecycle_hook_name: "hook".to_string(),
            ec2_instance_id: "i-1".to_string(),
            lifecycle_transition: Transition::Terminating,
        }
    }

    fn config() -> StaticConfig {
        StaticConfig {
            state_machine_arn: Some("arn:sm:drain".to_string()),
            cluster: Some("prod".to_string()),
            timeout: Duration::from_secs(90 * 60),
            required_task_families: vec!["web".to_string()],
            ..StaticConfig::default()
        }
    }

    fn now() -> DateTime<Utc> {
        drainhook_core::deadline::parse_deadline("2024-01-01T00:00:00Z").unwrap()
    }

    #[test]
    fn drain_bag_carries_cluster_and_deadline() {
        let bag = seed_parameters(SeedKind::Drain, &event(), &config(), now()).unwrap();
        assert_eq!(bag.ecs_cluster.as_deref(), Some("prod"));
        assert_eq!(bag.state_machine_arn.as_deref(), Some("arn:sm:drain"));
        assert_eq!(bag.deadline.as_deref(), Some("2024-01-01T01:30:00Z"));
        assert!(bag.required_task_families.is_empty());
        assert_eq!(bag.kafka_port, None);
    }

    #[test]
    fn cluster_ready_bag_copies_families() {
        let bag = seed_parameters(SeedKind::ClusterReady, &event(), &config(), now()).unwrap();
        assert_eq!(bag.required_task_families, vec!["web".to_string()]);
    }

    #[test]
    fn broker_bag_needs_no_cluster() {
        let config = StaticConfig {
            cluster: None,
            ..config()
        };
        let bag = seed_parameters(SeedKind::BrokerReady, &event(), &config, now()).unwrap();
        assert_eq!(bag.kafka_port, Some(9092));
        assert_eq!(bag.ecs_cluster, None);
    }

    #[test]
    fn missing_settings_name_the_variable() {
        let no_arn = StaticConfig {
            state_machine_arn: None,
            ..config()
        };
        let err = seed_parameters(SeedKind::BrokerReady, &event(), &no_arn, now()).unwrap_err();
        assert!(matches!(err, CoreError::MissingEnv("STATE_MACHINE_ARN")));

        let no_cluster = StaticConfig {
            cluster: None,
            ..config()
        };
        let err = seed_parameters(SeedKind::Drain, &event(), &no_cluster, now()).unwrap_err();
        assert_eq!(err.to_string(), "ECS_CLUSTER environment variable not defined");
    }

    #[test]
    fn zero_timeout_means_deadline_is_now() {
        let config = StaticConfig {
            timeout: Duration::ZERO,
            ..config()
        };
        let bag = seed_parameters(SeedKind::Drain, &event(), &config, now()).unwrap();
        assert_eq!(bag.deadline.as_deref(), Some("2024-01-01T00:00:00Z"));
    }
}
