// ABOUTME: Log group reconciler for containers using the awslogs driver.
// ABOUTME: Creates the configured group (with retention) in a region before registration.

use crate::provider::LogGroupOps;
use crate::spec::LogSpec;
use crate::types::Region;

use super::ensured::Ensured;
use super::error::{DeployError, ValidationError};

/// Ensure the awslogs group exists in `region`.
///
/// Returns `None` for any other log driver: there is nothing to provision.
pub async fn ensure_log_group<C>(
    client: &C,
    region: &Region,
    logs: &LogSpec,
) -> Result<Option<Ensured<String>>, DeployError>
where
    C: LogGroupOps + ?Sized,
{
    if !logs.is_awslogs() {
        return Ok(None);
    }
    let group = logs.log_group().ok_or(ValidationError::MissingLogGroup)?;

    let exists = client
        .log_group_exists(group)
        .await
        .map_err(DeployError::infrastructure(region, "DescribeLogGroups"))?;
    if exists {
        return Ok(Some(Ensured::Existing(group.to_string())));
    }

    client
        .create_log_group(group, logs.retention_days)
        .await
        .map_err(DeployError::infrastructure(region, "CreateLogGroup"))?;

    tracing::info!(region = %region, log_group = group, "created log group");
    Ok(Some(Ensured::Created(group.to_string())))
}
