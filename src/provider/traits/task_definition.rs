// ABOUTME: Task definition registry trait for the regional control plane.
// ABOUTME: Register new immutable revisions and retire superseded ones.

use async_trait::async_trait;

use crate::provider::{ProviderError, RegisteredTaskDefinition};
use crate::task::TaskDefinition;
use crate::types::TaskDefinitionArn;

/// Task definition revision management.
#[async_trait]
pub trait TaskDefinitionOps: Send + Sync {
    /// Register a new revision of the task definition's family.
    async fn register_task_definition(
        &self,
        definition: &TaskDefinition,
    ) -> Result<RegisteredTaskDefinition, ProviderError>;

    /// Deregister a revision. Running tasks keep running; new ones can't use it.
    async fn deregister_task_definition(
        &self,
        arn: &TaskDefinitionArn,
    ) -> Result<(), ProviderError>;
}
