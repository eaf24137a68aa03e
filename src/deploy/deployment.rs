// ABOUTME: Generic region deployment struct parameterized by state.
// ABOUTME: Owns the region's client handle and borrows the shared spec and progress sink.

use crate::spec::DeploymentSpec;
use crate::types::{Region, TaskDefinitionArn};

use super::progress::Progress;
use super::service::ServiceChange;
use super::state::{ClusterReady, Connected, Reconciled, Registered, Routed, Stable};

/// One region's deployment in progress, parameterized by its current state.
///
/// The client is built once when the region's task starts and threaded
/// through every transition; nothing is shared with other regions except the
/// read-only spec and the progress sender.
#[derive(Debug)]
pub struct RegionDeployment<'a, C, S> {
    pub(crate) client: C,
    pub(crate) region: Region,
    pub(crate) spec: &'a DeploymentSpec,
    pub(crate) progress: &'a Progress,
    pub(crate) state: S,
}

impl<'a, C> RegionDeployment<'a, C, Connected> {
    pub fn new(client: C, region: Region, spec: &'a DeploymentSpec, progress: &'a Progress) -> Self {
        RegionDeployment {
            client,
            region,
            spec,
            progress,
            state: Connected,
        }
    }
}

impl<C, S> RegionDeployment<'_, C, S> {
    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn spec(&self) -> &DeploymentSpec {
        self.spec
    }
}

impl<C> RegionDeployment<'_, C, Registered> {
    pub fn task_definition(&self) -> &TaskDefinitionArn {
        &self.state.task_definition.arn
    }
}

impl<C> RegionDeployment<'_, C, ClusterReady> {
    pub fn task_definition(&self) -> &TaskDefinitionArn {
        &self.state.task_definition.arn
    }
}

impl<C> RegionDeployment<'_, C, Routed> {
    pub fn task_definition(&self) -> &TaskDefinitionArn {
        &self.state.task_definition.arn
    }
}

impl<C> RegionDeployment<'_, C, Reconciled> {
    pub fn task_definition(&self) -> &TaskDefinitionArn {
        &self.state.task_definition.arn
    }

    pub fn change(&self) -> &ServiceChange {
        &self.state.change
    }
}

impl<C> RegionDeployment<'_, C, Stable> {
    pub fn task_definition(&self) -> &TaskDefinitionArn {
        &self.state.task_definition.arn
    }

    pub fn previous_task_definition(&self) -> Option<&TaskDefinitionArn> {
        self.state.previous.as_ref()
    }
}
