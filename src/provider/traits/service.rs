// ABOUTME: Service operations trait for the regional control plane.
// ABOUTME: Describe, create and update long-running services.

use async_trait::async_trait;

use crate::provider::{CreateServiceRequest, ProviderError, ServiceDescription};
use crate::types::TaskDefinitionArn;

/// Service lifecycle operations.
#[async_trait]
pub trait ServiceOps: Send + Sync {
    /// Look up a service in a cluster. `None` when it was never created.
    async fn describe_service(
        &self,
        cluster: &str,
        service: &str,
    ) -> Result<Option<ServiceDescription>, ProviderError>;

    async fn create_service(
        &self,
        request: &CreateServiceRequest,
    ) -> Result<ServiceDescription, ProviderError>;

    /// Point an existing service at a new task definition revision.
    async fn update_service(
        &self,
        cluster: &str,
        service: &str,
        task_definition: &TaskDefinitionArn,
    ) -> Result<ServiceDescription, ProviderError>;
}
