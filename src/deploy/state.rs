// ABOUTME: Region deployment state types for the type state pattern.
// ABOUTME: Each state carries what the completed steps produced, so later steps cannot run early.

use crate::provider::{RegisteredTaskDefinition, ServiceDescription};
use crate::types::TaskDefinitionArn;

use super::routing::Routing;
use super::service::ServiceChange;

/// Connected to the region's control plane.
/// Available actions: `register()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Connected;

/// Revision registered in the region.
/// Available actions: `ensure_cluster()`
#[derive(Debug, Clone)]
pub struct Registered {
    pub(crate) task_definition: RegisteredTaskDefinition,
}

/// Cluster known to be active.
/// Available actions: `ensure_routing()`
#[derive(Debug, Clone)]
pub struct ClusterReady {
    pub(crate) task_definition: RegisteredTaskDefinition,
}

/// Routing ensured, or skipped when no load balancer is configured.
/// Available actions: `reconcile_service()`
#[derive(Debug, Clone)]
pub struct Routed {
    pub(crate) task_definition: RegisteredTaskDefinition,
    pub(crate) routing: Option<Routing>,
}

/// Service created or pointed at the new revision.
/// Available actions: `wait_for_stable()`
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub(crate) task_definition: RegisteredTaskDefinition,
    pub(crate) change: ServiceChange,
}

/// Service stable on the new revision.
/// Available actions: `retire()`, `into_result()`
#[derive(Debug, Clone)]
pub struct Stable {
    pub(crate) task_definition: RegisteredTaskDefinition,
    pub(crate) service: ServiceDescription,
    pub(crate) service_created: bool,
    pub(crate) previous: Option<TaskDefinitionArn>,
}

impl Stable {
    /// Previous revision, unless it is the one just registered.
    pub fn retirable(&self) -> Option<&TaskDefinitionArn> {
        self.previous
            .as_ref()
            .filter(|previous| **previous != self.task_definition.arn)
    }
}
