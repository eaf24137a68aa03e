// ABOUTME: Composable capability traits for the regional control plane.
// ABOUTME: Defines ClusterOps, TaskDefinitionOps, ServiceOps, LoadBalancerOps, LogGroupOps.

mod cluster;
mod load_balancer;
mod log_group;
mod service;
mod task_definition;

pub use cluster::ClusterOps;
pub use load_balancer::LoadBalancerOps;
pub use log_group::LogGroupOps;
pub use service::ServiceOps;
pub use task_definition::TaskDefinitionOps;

use async_trait::async_trait;

use crate::provider::ProviderError;
use crate::types::Region;

/// Every capability a region worker needs.
///
/// Automatically implemented for any type implementing all capability traits.
pub trait ControlPlane:
    ClusterOps + TaskDefinitionOps + ServiceOps + LoadBalancerOps + LogGroupOps
{
}

impl<T> ControlPlane for T where
    T: ClusterOps + TaskDefinitionOps + ServiceOps + LoadBalancerOps + LogGroupOps
{
}

/// Builds the client handle a region worker threads through its steps.
///
/// Each region task connects once at its start; no client is shared between
/// regions.
#[async_trait]
pub trait Connector: Send + Sync {
    type Client: ControlPlane;

    async fn connect(&self, region: &Region) -> Result<Self::Client, ProviderError>;
}
