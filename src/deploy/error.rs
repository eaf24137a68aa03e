// ABOUTME: Error taxonomy for regional deployments.
// ABOUTME: Validation, missing resources, provider failures, rollout timeouts and partial failure.

use std::time::Duration;

use crate::provider::ProviderError;
use crate::types::{Region, ResourceName};

use super::report::DeploymentReport;

/// A structurally invalid deployment, detected before any provider call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("image URI cannot be empty")]
    MissingImage,

    #[error("container {0} must specify memory and/or memory_reservation")]
    MissingMemory(String),

    #[error(
        "container memory ({memory} MiB) must be greater than or equal to memory_reservation ({reservation} MiB)"
    )]
    MemoryBelowReservation { memory: u32, reservation: u32 },

    #[error("port definition must specify a container port")]
    MissingContainerPort,

    #[error("invalid port '{0}': expected a number between 1 and 65535")]
    InvalidPort(String),

    #[error("load balancer {0} needs a path or host to route on")]
    MissingRoutingPredicate(String),

    #[error("load balancer routing requires the container to expose at least one port")]
    MissingRoutedPort,

    #[error("the awslogs log driver requires an 'awslogs-group' option")]
    MissingLogGroup,
}

/// Errors that end a deployment, or one region's part of it.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A pre-existing resource this system only discovers is missing.
    #[error("{resource} {name} does not exist in {region}")]
    NotFound {
        region: Region,
        resource: &'static str,
        name: String,
    },

    /// A provider call failed for a reason other than "does not exist yet".
    #[error("{operation} failed in {region}")]
    Infrastructure {
        region: Region,
        operation: &'static str,
        #[source]
        source: ProviderError,
    },

    /// The rollout barrier gave up waiting.
    #[error("service {service} did not become stable in {region} within {}s", .timeout.as_secs())]
    Timeout {
        region: Region,
        service: ResourceName,
        timeout: Duration,
    },

    /// One or more regions failed; the report holds every region's outcome.
    #[error("deployment failed in {} of {} region(s)", .0.failed().count(), .0.outcomes.len())]
    Regions(Box<DeploymentReport>),
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    Validation,
    NotFound,
    Infrastructure,
    Timeout,
    PartialFailure,
}

impl DeployError {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Validation(_) => DeployErrorKind::Validation,
            DeployError::NotFound { .. } => DeployErrorKind::NotFound,
            DeployError::Infrastructure { .. } => DeployErrorKind::Infrastructure,
            DeployError::Timeout { .. } => DeployErrorKind::Timeout,
            DeployError::Regions(_) => DeployErrorKind::PartialFailure,
        }
    }

    /// Adapter for `map_err` on provider calls.
    pub(crate) fn infrastructure(
        region: &Region,
        operation: &'static str,
    ) -> impl FnOnce(ProviderError) -> DeployError {
        let region = region.clone();
        move |source| DeployError::Infrastructure {
            region,
            operation,
            source,
        }
    }

    /// The aggregated report, if this is a partial failure.
    pub fn report(&self) -> Option<&DeploymentReport> {
        match self {
            DeployError::Regions(report) => Some(report),
            _ => None,
        }
    }
}

/// The error message followed by every `source()`, joined with `": "`.
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
