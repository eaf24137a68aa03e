// ABOUTME: State transition methods for a region's deployment chain.
// ABOUTME: Each method consumes self, runs one step against the region's client, returns the next state.

use crate::provider::{ControlPlane, ServiceLoadBalancer};
use crate::task::{TaskDefinition, normalize_port};

use super::barrier::wait_for_stable;
use super::cluster::ensure_cluster;
use super::deployment::RegionDeployment;
use super::error::{DeployError, ValidationError};
use super::log_group::ensure_log_group;
use super::progress::{DeployEvent, Step};
use super::report::RegionalResult;
use super::routing::ensure_routing;
use super::service::reconcile_service;
use super::state::{ClusterReady, Connected, Reconciled, Registered, Routed, Stable};

// =============================================================================
// Internal Helpers
// =============================================================================

impl<'a, C, S> RegionDeployment<'a, C, S> {
    fn transition<T>(self, state: T) -> RegionDeployment<'a, C, T> {
        RegionDeployment {
            client: self.client,
            region: self.region,
            spec: self.spec,
            progress: self.progress,
            state,
        }
    }

    fn started(&self, step: Step) {
        tracing::debug!(region = %self.region, %step, "step started");
        self.progress.started(&self.region, step);
    }

    fn completed(&self, step: Step, detail: impl Into<Option<String>>) {
        self.progress.completed(&self.region, step, detail);
    }
}

// =============================================================================
// Connected -> Registered
// =============================================================================

impl<'a, C: ControlPlane> RegionDeployment<'a, C, Connected> {
    /// Register this region's variant of the task definition.
    ///
    /// The awslogs group is ensured first so tasks can ship logs as soon as
    /// they start.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Infrastructure` if the log group or registration call fails.
    #[must_use = "deployment state must be used"]
    pub async fn register(
        self,
        definition: &TaskDefinition,
    ) -> Result<RegionDeployment<'a, C, Registered>, DeployError> {
        if let Some(logs) = &self.spec.container.logs
            && logs.is_awslogs()
        {
            self.started(Step::LogGroup);
            let group = ensure_log_group(&self.client, &self.region, logs).await?;
            if let Some(group) = group {
                self.completed(
                    Step::LogGroup,
                    format!("{} ({})", group.value(), group.verb()),
                );
            }
        }

        self.started(Step::RegisterRevision);
        let regional = definition.for_region(&self.region);
        let registered = self
            .client
            .register_task_definition(&regional)
            .await
            .map_err(DeployError::infrastructure(
                &self.region,
                "RegisterTaskDefinition",
            ))?;

        tracing::info!(
            region = %self.region,
            family = %registered.family,
            revision = registered.revision,
            "registered task definition"
        );
        self.completed(
            Step::RegisterRevision,
            format!("{}:{}", registered.family, registered.revision),
        );

        Ok(self.transition(Registered {
            task_definition: registered,
        }))
    }
}

// =============================================================================
// Registered -> ClusterReady
// =============================================================================

impl<'a, C: ControlPlane> RegionDeployment<'a, C, Registered> {
    /// # Errors
    ///
    /// Returns `DeployError::Infrastructure` if the cluster cannot be found or created.
    #[must_use = "deployment state must be used"]
    pub async fn ensure_cluster(self) -> Result<RegionDeployment<'a, C, ClusterReady>, DeployError> {
        self.started(Step::EnsureCluster);
        let cluster = ensure_cluster(&self.client, &self.region, &self.spec.cluster).await?;
        self.completed(
            Step::EnsureCluster,
            format!("{} ({})", self.spec.cluster, cluster.verb()),
        );

        let task_definition = self.state.task_definition.clone();
        Ok(self.transition(ClusterReady { task_definition }))
    }
}

// =============================================================================
// ClusterReady -> Routed
// =============================================================================

impl<'a, C: ControlPlane> RegionDeployment<'a, C, ClusterReady> {
    /// Ensure load balancer routing. A no-op without a configured load balancer.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::NotFound` if the load balancer does not exist, or
    /// `DeployError::Infrastructure` if a routing call fails.
    #[must_use = "deployment state must be used"]
    pub async fn ensure_routing(self) -> Result<RegionDeployment<'a, C, Routed>, DeployError> {
        let routing = match &self.spec.load_balancer {
            Some(load_balancer) => {
                self.started(Step::EnsureRouting);
                let routing = ensure_routing(&self.client, &self.region, load_balancer).await?;
                self.completed(
                    Step::EnsureRouting,
                    format!(
                        "target group {} ({}), {} of {} listener rule(s) created",
                        routing.target_group.value().name,
                        routing.target_group.verb(),
                        routing.created_rules(),
                        routing.rules.len()
                    ),
                );
                Some(routing)
            }
            None => None,
        };

        let task_definition = self.state.task_definition.clone();
        Ok(self.transition(Routed {
            task_definition,
            routing,
        }))
    }
}

// =============================================================================
// Routed -> Reconciled
// =============================================================================

impl<'a, C: ControlPlane> RegionDeployment<'a, C, Routed> {
    /// Update the service to the new revision, or create it.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingRoutedPort` when routing is configured
    /// but the container exposes no port, or `DeployError::Infrastructure` if
    /// a service call fails.
    #[must_use = "deployment state must be used"]
    pub async fn reconcile_service(self) -> Result<RegionDeployment<'a, C, Reconciled>, DeployError> {
        self.started(Step::ReconcileService);

        let binding = match &self.state.routing {
            Some(routing) => {
                let port = self
                    .spec
                    .container
                    .ports
                    .first()
                    .ok_or(ValidationError::MissingRoutedPort)?;
                Some(ServiceLoadBalancer {
                    target_group: routing.target_group_arn().clone(),
                    container_name: self.spec.container.name.to_string(),
                    container_port: normalize_port(port)?.container_port,
                })
            }
            None => None,
        };

        let change = reconcile_service(
            &self.client,
            &self.region,
            self.spec,
            &self.state.task_definition.arn,
            binding,
        )
        .await?;

        let verb = if change.was_created() { "created" } else { "updated" };
        self.completed(
            Step::ReconcileService,
            format!("{} ({verb})", self.spec.service.name),
        );

        let task_definition = self.state.task_definition.clone();
        Ok(self.transition(Reconciled {
            task_definition,
            change,
        }))
    }
}

// =============================================================================
// Reconciled -> Stable
// =============================================================================

impl<'a, C: ControlPlane> RegionDeployment<'a, C, Reconciled> {
    /// # Errors
    ///
    /// Returns `DeployError::Timeout` if the rollout does not settle in time.
    #[must_use = "deployment state must be used"]
    pub async fn wait_for_stable(self) -> Result<RegionDeployment<'a, C, Stable>, DeployError> {
        self.started(Step::WaitStable);
        let service = wait_for_stable(
            &self.client,
            &self.region,
            &self.spec.cluster,
            &self.spec.service.name,
            &self.spec.rollout,
            self.progress,
        )
        .await?;
        self.completed(
            Step::WaitStable,
            format!("{}/{} running", service.running_count, service.desired_count),
        );

        let state = Stable {
            task_definition: self.state.task_definition.clone(),
            service,
            service_created: self.state.change.was_created(),
            previous: self.state.change.previous_task_definition().cloned(),
        };
        Ok(self.transition(state))
    }
}

// =============================================================================
// Stable -> done
// =============================================================================

impl<C: ControlPlane> RegionDeployment<'_, C, Stable> {
    /// Deregister the revision the service ran before this deployment.
    ///
    /// Only call once every region is stable.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Infrastructure` if deregistration fails.
    pub async fn retire(self) -> Result<RegionalResult, DeployError> {
        let Some(previous) = self.state.retirable().cloned() else {
            return Ok(self.into_result());
        };

        self.started(Step::DeregisterPrevious);
        self.client
            .deregister_task_definition(&previous)
            .await
            .map_err(DeployError::infrastructure(
                &self.region,
                "DeregisterTaskDefinition",
            ))?;

        tracing::info!(region = %self.region, task_definition = %previous, "deregistered previous revision");
        self.completed(Step::DeregisterPrevious, previous.resource().to_string());
        self.progress.emit(DeployEvent::Retired {
            region: self.region.clone(),
            task_definition: previous,
        });

        let mut result = self.into_result();
        result.retired = true;
        Ok(result)
    }
}

impl<C> RegionDeployment<'_, C, Stable> {
    /// Finish without retiring anything.
    pub fn into_result(self) -> RegionalResult {
        RegionalResult {
            region: self.region,
            service: self.state.service,
            service_created: self.state.service_created,
            task_definition: self.state.task_definition.arn,
            previous_task_definition: self.state.previous,
            retired: false,
        }
    }
}
