// ABOUTME: The resolved, immutable deployment specification.
// ABOUTME: Shared read-only by every region worker once configuration is resolved.

use crate::types::{Region, ResourceName};
use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Everything the reconciler needs to roll a service out across regions.
///
/// Produced by [`crate::config::Config::resolve`]. Fields are plain data; the
/// cross-field business rules (memory relationship, port presence, routing
/// predicates) are checked when the task definition and routing plan are built.
#[derive(Debug, Clone)]
pub struct DeploymentSpec {
    pub name: String,
    pub tag: String,
    pub regions: NonEmpty<Region>,
    pub cluster: ResourceName,
    pub service: ServiceSpec,
    pub task: TaskSpec,
    pub container: ContainerSpec,
    pub load_balancer: Option<LoadBalancerSpec>,
    pub rollout: RolloutSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSpec {
    pub name: ResourceName,

    #[serde(default = "default_desired_count")]
    pub desired_count: u32,

    #[serde(default = "default_minimum_percent")]
    pub minimum_healthy_percent: u32,

    #[serde(default = "default_maximum_percent")]
    pub maximum_percent: u32,

    /// IAM role the service uses to register targets with the load balancer.
    #[serde(default = "default_service_role")]
    pub role: Option<String>,
}

fn default_desired_count() -> u32 {
    2
}

fn default_minimum_percent() -> u32 {
    50
}

fn default_maximum_percent() -> u32 {
    200
}

fn default_service_role() -> Option<String> {
    Some("ecsServiceRole".to_string())
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskSpec {
    pub family: ResourceName,

    #[serde(default)]
    pub network_mode: NetworkMode,

    /// Role assumed by the containers of the task.
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    #[default]
    Bridge,
    Host,
    Awsvpc,
    None,
}

impl NetworkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkMode::Bridge => "bridge",
            NetworkMode::Host => "host",
            NetworkMode::Awsvpc => "awsvpc",
            NetworkMode::None => "none",
        }
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NetworkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bridge" => Ok(NetworkMode::Bridge),
            "host" => Ok(NetworkMode::Host),
            "awsvpc" => Ok(NetworkMode::Awsvpc),
            "none" => Ok(NetworkMode::None),
            other => Err(format!(
                "unknown network mode '{other}' (expected bridge, host, awsvpc or none)"
            )),
        }
    }
}

/// The single container run by the task.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub name: ResourceName,
    pub cpu: Option<u32>,
    pub memory: Option<u32>,
    pub memory_reservation: Option<u32>,
    pub ports: Vec<PortSpec>,
    pub environment: BTreeMap<String, String>,
    pub logs: Option<LogSpec>,
}

/// A port mapping as written by the operator.
///
/// `8080`, `"8080"` and `{ container: 8080 }` all describe the same mapping.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PortSpec {
    Number(u64),
    Text(String),
    Mapping {
        #[serde(default)]
        container: Option<u64>,
        #[serde(default)]
        host: Option<u64>,
        #[serde(default)]
        protocol: Option<Protocol>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogSpec {
    pub driver: String,

    #[serde(default)]
    pub options: BTreeMap<String, String>,

    /// Retention applied when a log group has to be created.
    #[serde(default)]
    pub retention_days: Option<u32>,
}

pub const AWSLOGS_DRIVER: &str = "awslogs";
pub const AWSLOGS_GROUP: &str = "awslogs-group";
pub const AWSLOGS_REGION: &str = "awslogs-region";

impl LogSpec {
    pub fn is_awslogs(&self) -> bool {
        self.driver == AWSLOGS_DRIVER
    }

    pub fn log_group(&self) -> Option<&str> {
        self.options.get(AWSLOGS_GROUP).map(String::as_str)
    }
}

/// Existing load balancer the service is exposed through.
#[derive(Debug, Clone, Deserialize)]
pub struct LoadBalancerSpec {
    pub name: String,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub host: Option<String>,

    pub target_group: TargetGroupSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetGroupSpec {
    pub name: String,

    #[serde(default)]
    pub health_check: HealthCheckSpec,

    #[serde(default = "default_deregistration_delay", with = "humantime_serde")]
    pub deregistration_delay: Duration,
}

fn default_deregistration_delay() -> Duration {
    Duration::from_secs(30)
}

/// Target group health check, passed through to the load balancer as-is.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthCheckSpec {
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    #[serde(default = "default_path")]
    pub path: String,

    /// Probe port; `traffic-port` probes the port traffic is routed to.
    #[serde(default = "default_port")]
    pub port: String,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_healthy_threshold", alias = "healthy_count")]
    pub healthy_threshold: u32,

    #[serde(default = "default_unhealthy_threshold", alias = "unhealthy_count")]
    pub unhealthy_threshold: u32,
}

impl Default for HealthCheckSpec {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            path: default_path(),
            port: default_port(),
            timeout: default_timeout(),
            healthy_threshold: default_healthy_threshold(),
            unhealthy_threshold: default_unhealthy_threshold(),
        }
    }
}

fn default_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_path() -> String {
    "/".to_string()
}

fn default_port() -> String {
    "traffic-port".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_healthy_threshold() -> u32 {
    5
}

fn default_unhealthy_threshold() -> u32 {
    2
}

/// How long and how often the rollout barrier polls for stability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RolloutSpec {
    #[serde(default = "default_rollout_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
}

/// Longest rollout a deployment may wait for.
pub const MAX_ROLLOUT_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

impl RolloutSpec {
    /// Both durations must be non-zero, the timeout at most
    /// [`MAX_ROLLOUT_TIMEOUT`] and the poll interval at most the timeout.
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout.is_zero() {
            return Err("rollout.timeout must be greater than zero".to_string());
        }
        if self.timeout > MAX_ROLLOUT_TIMEOUT {
            return Err(format!(
                "rollout.timeout must be at most {}h",
                MAX_ROLLOUT_TIMEOUT.as_secs() / 3600
            ));
        }
        if self.poll_interval.is_zero() {
            return Err("rollout.poll_interval must be greater than zero".to_string());
        }
        if self.poll_interval > self.timeout {
            return Err("rollout.poll_interval must not exceed rollout.timeout".to_string());
        }
        Ok(())
    }
}

impl Default for RolloutSpec {
    fn default() -> Self {
        Self {
            timeout: default_rollout_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_rollout_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(15)
}
