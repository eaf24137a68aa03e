// ABOUTME: Rollout barrier: poll a service until it is stable or the deadline passes.
// ABOUTME: Emits one progress tick per poll and sleeps between polls without blocking.

use tokio::time::{Instant, sleep};

use crate::provider::{NotFoundExt, ProviderError, ServiceDescription, ServiceOps};
use crate::spec::{MAX_ROLLOUT_TIMEOUT, RolloutSpec};
use crate::types::{Region, ResourceName};

use super::error::DeployError;
use super::progress::{DeployEvent, Progress};

/// Wait until `service` runs its desired count on a single deployment.
///
/// # Errors
///
/// * `DeployError::Timeout` if the service is not stable when `rollout.timeout` elapses.
/// * `DeployError::Infrastructure` if polling fails, or the service disappears
///   or stops being active while waiting.
#[tracing::instrument(skip(client, rollout, progress), fields(region = %region, cluster = %cluster, service = %service))]
pub async fn wait_for_stable<C>(
    client: &C,
    region: &Region,
    cluster: &ResourceName,
    service: &ResourceName,
    rollout: &RolloutSpec,
    progress: &Progress,
) -> Result<ServiceDescription, DeployError>
where
    C: ServiceOps + ?Sized,
{
    let started = Instant::now();
    let deadline = started
        .checked_add(rollout.timeout)
        .unwrap_or(started + MAX_ROLLOUT_TIMEOUT);

    loop {
        let current = client
            .describe_service(cluster.as_str(), service.as_str())
            .await
            .or_absent()
            .map_err(DeployError::infrastructure(region, "DescribeServices"))?;

        let current = match current {
            Some(current) if current.is_active() => current,
            Some(current) => {
                return Err(DeployError::Infrastructure {
                    region: region.clone(),
                    operation: "DescribeServices",
                    source: ProviderError::request(format!(
                        "service {service} became {} during rollout",
                        current.status
                    )),
                });
            }
            None => {
                return Err(DeployError::Infrastructure {
                    region: region.clone(),
                    operation: "DescribeServices",
                    source: ProviderError::not_found(format!("service {service}")),
                });
            }
        };

        progress.emit(DeployEvent::RolloutPoll {
            region: region.clone(),
            running: current.running_count,
            desired: current.desired_count,
            pending: current.pending_count,
        });

        if current.is_stable() {
            tracing::debug!("service stable");
            return Ok(current);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(DeployError::Timeout {
                region: region.clone(),
                service: service.clone(),
                timeout: rollout.timeout,
            });
        }

        tracing::debug!(
            running = current.running_count,
            desired = current.desired_count,
            deployments = current.deployment_count,
            "service not yet stable"
        );
        sleep(rollout.poll_interval.min(deadline - now)).await;
    }
}
