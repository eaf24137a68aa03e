// ABOUTME: Cluster reconciler: make sure the named cluster exists in a region.
// ABOUTME: Discovers by name, creates when absent or inactive, never modifies or deletes.

use crate::provider::{ClusterDescription, ClusterOps, NotFoundExt};
use crate::types::{Region, ResourceName};

use super::ensured::Ensured;
use super::error::DeployError;

/// Ensure `name` is an active cluster in `region`.
///
/// # Errors
///
/// Returns `DeployError::Infrastructure` if the lookup or the create call fails.
#[tracing::instrument(skip(client), fields(region = %region, cluster = %name))]
pub async fn ensure_cluster<C>(
    client: &C,
    region: &Region,
    name: &ResourceName,
) -> Result<Ensured<ClusterDescription>, DeployError>
where
    C: ClusterOps + ?Sized,
{
    let existing = client
        .describe_cluster(name.as_str())
        .await
        .or_absent()
        .map_err(DeployError::infrastructure(region, "DescribeClusters"))?;

    if let Some(cluster) = existing {
        if cluster.is_active() {
            tracing::debug!("cluster already active");
            return Ok(Ensured::Existing(cluster));
        }
        tracing::debug!(status = %cluster.status, "cluster exists but is not active");
    }

    let cluster = client
        .create_cluster(name.as_str())
        .await
        .map_err(DeployError::infrastructure(region, "CreateCluster"))?;

    tracing::info!("created cluster");
    Ok(Ensured::Created(cluster))
}
