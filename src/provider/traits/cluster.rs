// ABOUTME: Cluster operations trait for the regional control plane.
// ABOUTME: Describe and create compute clusters by name.

use async_trait::async_trait;

use crate::provider::{ClusterDescription, ProviderError};

/// Cluster lookup and creation.
#[async_trait]
pub trait ClusterOps: Send + Sync {
    /// Look up a cluster by name. `None` when the provider has no such cluster.
    async fn describe_cluster(&self, name: &str)
    -> Result<Option<ClusterDescription>, ProviderError>;

    /// Create a cluster with the given name.
    async fn create_cluster(&self, name: &str) -> Result<ClusterDescription, ProviderError>;
}
