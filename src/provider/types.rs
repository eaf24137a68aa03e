// ABOUTME: Request and response types shared by every control-plane implementation.
// ABOUTME: Provider-neutral views of clusters, services, target groups, listeners and rules.

use crate::spec::HealthCheckSpec;
use crate::types::{
    ClusterArn, ListenerArn, LoadBalancerArn, ResourceName, RuleArn, ServiceArn, TargetGroupArn,
    TaskDefinitionArn,
};
use serde::Serialize;
use std::fmt;

// =============================================================================
// Clusters
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterDescription {
    pub name: String,
    pub arn: Option<ClusterArn>,
    pub status: String,
}

impl ClusterDescription {
    pub fn is_active(&self) -> bool {
        self.status == "ACTIVE"
    }
}

// =============================================================================
// Task definitions
// =============================================================================

/// Result of registering a task definition revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredTaskDefinition {
    pub arn: TaskDefinitionArn,
    pub family: String,
    pub revision: u32,
}

// =============================================================================
// Services
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum ServiceStatus {
    Active,
    Draining,
    Inactive,
    Other(String),
}

impl ServiceStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "ACTIVE" => ServiceStatus::Active,
            "DRAINING" => ServiceStatus::Draining,
            "INACTIVE" => ServiceStatus::Inactive,
            other => ServiceStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceStatus::Active => f.write_str("ACTIVE"),
            ServiceStatus::Draining => f.write_str("DRAINING"),
            ServiceStatus::Inactive => f.write_str("INACTIVE"),
            ServiceStatus::Other(s) => f.write_str(s),
        }
    }
}

impl From<ServiceStatus> for String {
    fn from(status: ServiceStatus) -> Self {
        status.to_string()
    }
}

/// Observed state of a service in one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDescription {
    pub name: String,
    pub arn: Option<ServiceArn>,
    pub status: ServiceStatus,
    pub desired_count: u32,
    pub running_count: u32,
    pub pending_count: u32,
    /// Number of deployments (primary plus any still draining).
    pub deployment_count: u32,
    pub task_definition: Option<TaskDefinitionArn>,
}

impl ServiceDescription {
    pub fn is_active(&self) -> bool {
        self.status == ServiceStatus::Active
    }

    /// Running tasks match the desired count and no older deployment remains.
    ///
    /// The provider only drops a deployment once its replacement passed the
    /// configured health checks, so a single deployment implies healthy tasks.
    pub fn is_stable(&self) -> bool {
        self.is_active() && self.deployment_count == 1 && self.running_count == self.desired_count
    }
}

/// Load balancer binding attached when a service is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLoadBalancer {
    pub target_group: TargetGroupArn,
    pub container_name: String,
    pub container_port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateServiceRequest {
    pub cluster: ResourceName,
    pub service_name: ResourceName,
    pub task_definition: TaskDefinitionArn,
    pub desired_count: u32,
    pub minimum_healthy_percent: u32,
    pub maximum_percent: u32,
    pub load_balancer: Option<ServiceLoadBalancer>,
    pub role: Option<String>,
}

// =============================================================================
// Load balancing
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancerDescription {
    pub name: String,
    pub arn: LoadBalancerArn,
    pub vpc_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetGroupDescription {
    pub name: String,
    pub arn: TargetGroupArn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTargetGroupRequest {
    pub name: String,
    pub vpc_id: Option<String>,
    pub port: u16,
    pub health_check: HealthCheckSpec,
    /// HTTP codes counted as healthy, e.g. `200-299`.
    pub matcher: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerDescription {
    pub arn: ListenerArn,
}

pub const PATH_PATTERN: &str = "path-pattern";
pub const HOST_HEADER: &str = "host-header";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleCondition {
    pub field: String,
    pub values: Vec<String>,
}

impl RuleCondition {
    pub fn path_pattern(path: &str) -> Self {
        Self {
            field: PATH_PATTERN.to_string(),
            values: vec![path.to_string()],
        }
    }

    pub fn host_header(host: &str) -> Self {
        Self {
            field: HOST_HEADER.to_string(),
            values: vec![host.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDescription {
    pub arn: RuleArn,
    /// A number, or `default` for the listener's catch-all rule.
    pub priority: String,
    pub conditions: Vec<RuleCondition>,
    /// Target groups the rule forwards to.
    pub target_groups: Vec<TargetGroupArn>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRuleRequest {
    pub listener: ListenerArn,
    pub priority: u32,
    pub conditions: Vec<RuleCondition>,
    pub target_group: TargetGroupArn,
}
