//! Static configuration, read once per invocation.
//!
//! Values come from the environment (the invocation host injects them)
//! or, for local runs, from a TOML file with the same keys in
//! snake_case.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duration::{format_duration, parse_duration};
use crate::error::{CoreError, CoreResult};

pub const ENV_STATE_MACHINE_ARN: &str = "STATE_MACHINE_ARN";
pub const ENV_CLUSTER: &str = "ECS_CLUSTER";
pub const ENV_TIMEOUT: &str = "TIMEOUT";
pub const ENV_STOP_ALL_NON_SERVICE_TASKS: &str = "STOP_ALL_NON_SERVICE_TASKS";
pub const ENV_STOP_TASK_GROUPS: &str = "STOP_TASK_GROUPS";
pub const ENV_REQUIRED_TASK_FAMILIES: &str = "REQUIRED_TASK_FAMILIES";
pub const ENV_BROKER_PORT: &str = "KAFKA_PORT";
pub const ENV_IDENTITY_CACHE_TTL: &str = "IDENTITY_CACHE_TTL";

/// Broker port used when none is configured.
pub const DEFAULT_BROKER_PORT: u16 = 9092;

/// Validated static configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticConfig {
    /// Workflow started by the starter steps.
    pub state_machine_arn: Option<String>,
    /// Container cluster the fleet nodes join.
    pub cluster: Option<String>,
    /// How long an episode may keep polling. Zero when unset.
    pub timeout: Duration,
    /// Evict every task that is not part of a long-running service.
    pub stop_all_non_service_tasks: bool,
    /// Evict every task whose group is listed here.
    pub stop_task_groups: Vec<String>,
    /// Families that must each have a running task before a node is ready.
    pub required_task_families: Vec<String>,
    /// Port the broker listens on.
    pub broker_port: u16,
    /// Expiry for identity cache entries. `None` keeps them forever.
    pub identity_cache_ttl: Option<Duration>,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            state_machine_arn: None,
            cluster: None,
            timeout: Duration::ZERO,
            stop_all_non_service_tasks: false,
            stop_task_groups: Vec::new(),
            required_task_families: Vec::new(),
            broker_port: DEFAULT_BROKER_PORT,
            identity_cache_ttl: None,
        }
    }
}

/// Unvalidated configuration as written in a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfig {
    pub state_machine_arn: Option<String>,
    pub cluster: Option<String>,
    pub timeout: Option<String>,
    pub stop_all_non_service_tasks: Option<bool>,
    pub stop_task_groups: Vec<String>,
    pub required_task_families: Vec<String>,
    pub broker_port: Option<i64>,
    pub identity_cache_ttl: Option<String>,
}

impl StaticConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> CoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let broker_port = match get(ENV_BROKER_PORT) {
            Some(v) => Some(v.trim().parse::<i64>().map_err(|e| {
                CoreError::Config(format!("failed to parse {ENV_BROKER_PORT} {v:?}: {e}"))
            })?),
            None => None,
        };

        RawConfig {
            state_machine_arn: get(ENV_STATE_MACHINE_ARN),
            cluster: get(ENV_CLUSTER),
            timeout: get(ENV_TIMEOUT),
            stop_all_non_service_tasks: get(ENV_STOP_ALL_NON_SERVICE_TASKS).map(|v| is_truthy(&v)),
            stop_task_groups: get(ENV_STOP_TASK_GROUPS)
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            required_task_families: get(ENV_REQUIRED_TASK_FAMILIES)
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            broker_port,
            identity_cache_ttl: get(ENV_IDENTITY_CACHE_TTL),
        }
        .validate()
    }

    /// Read configuration from a TOML file.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        let raw: RawConfig = toml::from_str(content)?;
        raw.validate()
    }

    /// The file form of this configuration, with durations rendered back
    /// to strings.
    pub fn to_raw(&self) -> RawConfig {
        RawConfig {
            state_machine_arn: self.state_machine_arn.clone(),
            cluster: self.cluster.clone(),
            timeout: Some(format_duration(self.timeout)),
            stop_all_non_service_tasks: Some(self.stop_all_non_service_tasks),
            stop_task_groups: self.stop_task_groups.clone(),
            required_task_families: self.required_task_families.clone(),
            broker_port: Some(i64::from(self.broker_port)),
            identity_cache_ttl: self.identity_cache_ttl.map(format_duration),
        }
    }

    pub fn to_toml_string(&self) -> CoreResult<String> {
        Ok(toml::to_string_pretty(&self.to_raw())?)
    }

    /// The workflow identifier, or a fatal error naming the missing variable.
    pub fn require_state_machine_arn(&self) -> CoreResult<&str> {
        self.state_machine_arn
            .as_deref()
            .ok_or(CoreError::MissingEnv(ENV_STATE_MACHINE_ARN))
    }

    /// The cluster name, or a fatal error naming the missing variable.
    pub fn require_cluster(&self) -> CoreResult<&str> {
        self.cluster.as_deref().ok_or(CoreError::MissingEnv(ENV_CLUSTER))
    }
}

impl RawConfig {
    /// Check value formats and ranges, producing a [`StaticConfig`].
    pub fn validate(self) -> CoreResult<StaticConfig> {
        let timeout = match self.timeout.as_deref() {
            Some(v) => parse_duration(v)
                .ok_or_else(|| CoreError::Config(format!("invalid {ENV_TIMEOUT} {v:?}")))?,
            None => Duration::ZERO,
        };

        let broker_port = match self.broker_port {
            Some(p) => u16::try_from(p).map_err(|_| {
                CoreError::Config(format!("{ENV_BROKER_PORT} must be between 0 and 65535, got {p}"))
            })?,
            None => DEFAULT_BROKER_PORT,
        };

        let identity_cache_ttl = match self.identity_cache_ttl.as_deref() {
            Some(v) => Some(parse_duration(v).ok_or_else(|| {
                CoreError::Config(format!("invalid {ENV_IDENTITY_CACHE_TTL} {v:?}"))
            })?),
            None => None,
        };

        Ok(StaticConfig {
            state_machine_arn: self.state_machine_arn.filter(|s| !s.is_empty()),
            cluster: self.cluster.filter(|s| !s.is_empty()),
            timeout,
            stop_all_non_service_tasks: self.stop_all_non_service_tasks.unwrap_or(false),
            stop_task_groups: clean_list(self.stop_task_groups),
            required_task_families: clean_list(self.required_task_families),
            broker_port,
            identity_cache_ttl,
        })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "t" | "yes" | "y"
    )
}

fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(str::to_string).collect()
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = StaticConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StaticConfig::default());
        assert_eq!(config.broker_port, 9092);
    }

    #[test]
    fn full_environment() {
        let config = StaticConfig::from_lookup(lookup(&[
            ("STATE_MACHINE_ARN", "arn:aws:states:us-east-1:1:stateMachine:drain"),
            ("ECS_CLUSTER", "prod"),
            ("TIMEOUT", "1h"),
            ("STOP_ALL_NON_SERVICE_TASKS", "Yes"),
            ("STOP_TASK_GROUPS", "batch, cron,,"),
            ("REQUIRED_TASK_FAMILIES", "web,worker"),
            ("KAFKA_PORT", "9094"),
            ("IDENTITY_CACHE_TTL", "10m"),
        ]))
        .unwrap();

        assert_eq!(config.require_cluster().unwrap(), "prod");
        assert_eq!(config.timeout, Duration::from_secs(3600));
        assert!(config.stop_all_non_service_tasks);
        assert_eq!(config.stop_task_groups, vec!["batch", "cron"]);
        assert_eq!(config.required_task_families, vec!["web", "worker"]);
        assert_eq!(config.broker_port, 9094);
        assert_eq!(config.identity_cache_ttl, Some(Duration::from_secs(600)));
    }

    #[test]
    fn falsy_flag_values() {
        for value in ["0", "false", "no", "off", "nope"] {
            let config =
                StaticConfig::from_lookup(lookup(&[("STOP_ALL_NON_SERVICE_TASKS", value)])).unwrap();
            assert!(!config.stop_all_non_service_tasks, "{value} should be false");
        }
    }

    #[test]
    fn blank_group_list_means_no_groups() {
        let config = StaticConfig::from_lookup(lookup(&[("STOP_TASK_GROUPS", " ")])).unwrap();
        assert!(config.stop_task_groups.is_empty());
    }

    #[test]
    fn missing_required_values_name_the_variable() {
        let config = StaticConfig::from_lookup(lookup(&[])).unwrap();
        let err = config.require_state_machine_arn().unwrap_err();
        assert_eq!(err.to_string(), "STATE_MACHINE_ARN environment variable not defined");
        let err = config.require_cluster().unwrap_err();
        assert_eq!(err.to_string(), "ECS_CLUSTER environment variable not defined");
    }

    #[test]
    fn malformed_timeout_is_rejected() {
        let err = StaticConfig::from_lookup(lookup(&[("TIMEOUT", "soon")])).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn overflowing_durations_are_config_errors() {
        let huge = "10000000000000000000s10000000000000000000s";
        let err = StaticConfig::from_lookup(lookup(&[("TIMEOUT", huge)])).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
        let err =
            StaticConfig::from_lookup(lookup(&[("IDENTITY_CACHE_TTL", huge)])).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn broker_port_must_be_numeric_and_in_range() {
        assert!(StaticConfig::from_lookup(lookup(&[("KAFKA_PORT", "kafka")])).is_err());
        assert!(StaticConfig::from_lookup(lookup(&[("KAFKA_PORT", "70000")])).is_err());
        assert!(StaticConfig::from_lookup(lookup(&[("KAFKA_PORT", "-1")])).is_err());
        let config = StaticConfig::from_lookup(lookup(&[("KAFKA_PORT", "65535")])).unwrap();
        assert_eq!(config.broker_port, 65535);
    }

    #[test]
    fn toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
state_machine_arn = "arn:sm"
cluster = "staging"
timeout = "15m"
required_task_families = ["web"]
broker_port = 9093
"#
        )
        .unwrap();

        let config = StaticConfig::from_file(file.path()).unwrap();
        assert_eq!(config.cluster.as_deref(), Some("staging"));
        assert_eq!(config.timeout, Duration::from_secs(900));
        assert_eq!(config.required_task_families, vec!["web"]);
        assert_eq!(config.broker_port, 9093);
        assert!(!config.stop_all_non_service_tasks);
    }

    #[test]
    fn rendered_config_reads_back() {
        let config = StaticConfig::from_lookup(lookup(&[
            ("ECS_CLUSTER", "prod"),
            ("TIMEOUT", "90m"),
            ("STOP_TASK_GROUPS", "batch"),
        ]))
        .unwrap();
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("timeout = \"1h30m\""));
        assert!(!rendered.contains("state_machine_arn"));
        assert_eq!(StaticConfig::from_toml_str(&rendered).unwrap(), config);
    }

    #[test]
    fn toml_rejects_unknown_keys() {
        let err = StaticConfig::from_toml_str("clusterr = \"typo\"").unwrap_err();
        assert!(matches!(err, CoreError::Toml(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = StaticConfig::from_file(Path::new("/nonexistent/drainhook.toml")).unwrap_err();
        assert!(matches!(err, CoreError::Io { .. }));
    }
}
