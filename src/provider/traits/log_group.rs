// ABOUTME: Log group operations trait for the regional control plane.
// ABOUTME: Check for and create the log group the awslogs driver writes to.

use async_trait::async_trait;

use crate::provider::ProviderError;

#[async_trait]
pub trait LogGroupOps: Send + Sync {
    async fn log_group_exists(&self, name: &str) -> Result<bool, ProviderError>;

    /// Create a log group, applying a retention policy when one is given.
    async fn create_log_group(
        &self,
        name: &str,
        retention_days: Option<u32>,
    ) -> Result<(), ProviderError>;
}
