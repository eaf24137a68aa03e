// ABOUTME: Per-region outcomes aggregated into the final deployment report.
// ABOUTME: Serializable for JSON output; failed regions keep their full error.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::provider::ServiceDescription;
use crate::types::{Region, TaskDefinitionArn};

use super::error::{DeployError, error_chain};

/// What one region ended up running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionalResult {
    pub region: Region,
    pub service: ServiceDescription,
    pub service_created: bool,
    pub task_definition: TaskDefinitionArn,
    /// Revision the service ran before this deployment, if it already existed.
    pub previous_task_definition: Option<TaskDefinitionArn>,
    /// Whether the previous revision was deregistered.
    pub retired: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegionOutcome {
    Deployed(RegionalResult),
    Failed {
        region: Region,
        #[serde(serialize_with = "serialize_error")]
        error: DeployError,
    },
}

impl RegionOutcome {
    pub fn region(&self) -> &Region {
        match self {
            RegionOutcome::Deployed(result) => &result.region,
            RegionOutcome::Failed { region, .. } => region,
        }
    }

    pub fn is_deployed(&self) -> bool {
        matches!(self, RegionOutcome::Deployed(_))
    }
}

fn serialize_error<S: Serializer>(error: &DeployError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&error_chain(error))
}

/// Outcome of a whole deployment, one entry per configured region in order.
#[derive(Debug, Serialize)]
pub struct DeploymentReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<RegionOutcome>,
}

impl DeploymentReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(RegionOutcome::is_deployed)
    }

    pub fn deployed(&self) -> impl Iterator<Item = &RegionalResult> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            RegionOutcome::Deployed(result) => Some(result),
            RegionOutcome::Failed { .. } => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = (&Region, &DeployError)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            RegionOutcome::Failed { region, error } => Some((region, error)),
            RegionOutcome::Deployed(_) => None,
        })
    }

    pub fn outcome(&self, region: &Region) -> Option<&RegionOutcome> {
        self.outcomes.iter().find(|outcome| outcome.region() == region)
    }
}
