// ABOUTME: Regional deployment reconciler: runs every region's chain concurrently.
// ABOUTME: Retires previous revisions only after all regions are stable; aggregates every outcome.

use chrono::Utc;
use futures::future::join_all;

use crate::provider::Connector;
use crate::spec::DeploymentSpec;
use crate::task::{self, TaskDefinition};
use crate::types::Region;

use super::deployment::RegionDeployment;
use super::error::{DeployError, ValidationError, error_chain};
use super::progress::{DeployEvent, Progress};
use super::report::{DeploymentReport, RegionOutcome};
use super::routing::rule_conditions;
use super::state::Stable;

type RegionRun<'a, C> = Result<RegionDeployment<'a, C, Stable>, (Region, DeployError)>;

/// Rolls a deployment spec out across all of its regions.
#[derive(Debug)]
pub struct Reconciler<K> {
    connector: K,
    progress: Progress,
}

impl<K: Connector> Reconciler<K> {
    pub fn new(connector: K) -> Self {
        Self {
            connector,
            progress: Progress::disabled(),
        }
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Deploy `image_uri` to every region in `spec`.
    ///
    /// Regions run concurrently and independently. Every region is awaited
    /// even when another fails; previous revisions are deregistered only when
    /// all regions reached a stable service.
    ///
    /// # Errors
    ///
    /// * `DeployError::Validation` before any provider call if the spec is invalid.
    /// * `DeployError::Regions` carrying the full report if any region failed.
    #[tracing::instrument(skip_all, fields(name = %spec.name, tag = %spec.tag))]
    pub async fn deploy(
        &self,
        spec: &DeploymentSpec,
        image_uri: &str,
    ) -> Result<DeploymentReport, DeployError> {
        let started_at = Utc::now();

        let definition = task::build(spec, image_uri)?;
        if let Some(load_balancer) = &spec.load_balancer {
            rule_conditions(load_balancer)?;
            if definition.first_container_port().is_none() {
                return Err(ValidationError::MissingRoutedPort.into());
            }
        }

        tracing::info!(regions = spec.regions.len(), image = image_uri, "starting deployment");

        let runs: Vec<RegionRun<'_, K::Client>> = join_all(
            spec.regions
                .iter()
                .map(|region| self.run_region(region, spec, &definition)),
        )
        .await;

        let outcomes = if runs.iter().all(Result::is_ok) {
            join_all(runs.into_iter().flatten().map(|stable| self.retire(stable))).await
        } else {
            // Regions that did finish keep their previous revision registered.
            runs.into_iter()
                .map(|run| match run {
                    Ok(stable) => RegionOutcome::Deployed(stable.into_result()),
                    Err((region, error)) => RegionOutcome::Failed { region, error },
                })
                .collect()
        };

        let report = DeploymentReport {
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };

        if report.is_success() {
            tracing::info!("deployment succeeded in every region");
            Ok(report)
        } else {
            Err(DeployError::Regions(Box::new(report)))
        }
    }

    async fn run_region<'a>(
        &'a self,
        region: &Region,
        spec: &'a DeploymentSpec,
        definition: &TaskDefinition,
    ) -> RegionRun<'a, K::Client> {
        let result = async {
            let client = self
                .connector
                .connect(region)
                .await
                .map_err(DeployError::infrastructure(region, "Connect"))?;

            RegionDeployment::new(client, region.clone(), spec, &self.progress)
                .register(definition)
                .await?
                .ensure_cluster()
                .await?
                .ensure_routing()
                .await?
                .reconcile_service()
                .await?
                .wait_for_stable()
                .await
        }
        .await;

        result.map_err(|error| self.region_failed(region, error))
    }

    async fn retire(&self, stable: RegionDeployment<'_, K::Client, Stable>) -> RegionOutcome {
        let region = stable.region().clone();
        match stable.retire().await {
            Ok(result) => RegionOutcome::Deployed(result),
            Err(error) => {
                let (region, error) = self.region_failed(&region, error);
                RegionOutcome::Failed { region, error }
            }
        }
    }

    fn region_failed(&self, region: &Region, error: DeployError) -> (Region, DeployError) {
        let message = error_chain(&error);
        tracing::warn!(region = %region, error = %message, "region failed");
        self.progress.emit(DeployEvent::RegionFailed {
            region: region.clone(),
            error: message,
        });
        (region.clone(), error)
    }
}
