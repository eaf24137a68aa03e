// ABOUTME: Service reconciler: update the running service in place or create it.
// ABOUTME: Updates only swap the revision; creates carry counts, percentages and routing.

use crate::provider::{
    CreateServiceRequest, NotFoundExt, ServiceDescription, ServiceLoadBalancer, ServiceOps,
};
use crate::spec::DeploymentSpec;
use crate::types::{Region, TaskDefinitionArn};

use super::error::DeployError;

/// What the reconciler did to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceChange {
    /// An active service now points at the new revision.
    Updated {
        service: ServiceDescription,
        previous: Option<TaskDefinitionArn>,
    },
    /// No active service existed; one was created.
    Created { service: ServiceDescription },
}

impl ServiceChange {
    pub fn service(&self) -> &ServiceDescription {
        match self {
            ServiceChange::Updated { service, .. } | ServiceChange::Created { service } => service,
        }
    }

    /// Revision to retire once every region is stable.
    pub fn previous_task_definition(&self) -> Option<&TaskDefinitionArn> {
        match self {
            ServiceChange::Updated { previous, .. } => previous.as_ref(),
            ServiceChange::Created { .. } => None,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, ServiceChange::Created { .. })
    }
}

/// Point the service at `task_definition`, creating it when needed.
///
/// `binding` is attached only on create; an existing service keeps whatever
/// load balancer wiring it was created with.
///
/// # Errors
///
/// Returns `DeployError::Infrastructure` if the lookup, update or create call fails.
#[tracing::instrument(
    skip(client, spec, binding),
    fields(region = %region, cluster = %spec.cluster, service = %spec.service.name)
)]
pub async fn reconcile_service<C>(
    client: &C,
    region: &Region,
    spec: &DeploymentSpec,
    task_definition: &TaskDefinitionArn,
    binding: Option<ServiceLoadBalancer>,
) -> Result<ServiceChange, DeployError>
where
    C: ServiceOps + ?Sized,
{
    let cluster = spec.cluster.as_str();
    let name = spec.service.name.as_str();

    let existing = client
        .describe_service(cluster, name)
        .await
        .or_absent()
        .map_err(DeployError::infrastructure(region, "DescribeServices"))?;

    if let Some(current) = existing.filter(ServiceDescription::is_active) {
        let service = client
            .update_service(cluster, name, task_definition)
            .await
            .map_err(DeployError::infrastructure(region, "UpdateService"))?;

        tracing::info!(revision = %task_definition.resource(), "updated service");
        return Ok(ServiceChange::Updated {
            service,
            previous: current.task_definition,
        });
    }

    let role = binding.as_ref().and(spec.service.role.clone());
    let request = CreateServiceRequest {
        cluster: spec.cluster.clone(),
        service_name: spec.service.name.clone(),
        task_definition: task_definition.clone(),
        desired_count: spec.service.desired_count,
        minimum_healthy_percent: spec.service.minimum_healthy_percent,
        maximum_percent: spec.service.maximum_percent,
        load_balancer: binding,
        role,
    };

    let service = client
        .create_service(&request)
        .await
        .map_err(DeployError::infrastructure(region, "CreateService"))?;

    tracing::info!(revision = %task_definition.resource(), "created service");
    Ok(ServiceChange::Created { service })
}
