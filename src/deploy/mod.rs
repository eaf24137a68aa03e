// ABOUTME: Regional deployment reconciliation using the type state pattern.
// ABOUTME: Component reconcilers, per-region state chain, orchestrator, progress and reports.

mod barrier;
mod cluster;
mod deployment;
mod ensured;
mod error;
mod log_group;
mod orchestrator;
mod progress;
mod report;
mod routing;
mod service;
mod state;
mod transitions;

pub use barrier::wait_for_stable;
pub use cluster::ensure_cluster;
pub use deployment::RegionDeployment;
pub use ensured::Ensured;
pub use error::{DeployError, DeployErrorKind, ValidationError, error_chain};
pub use log_group::ensure_log_group;
pub use orchestrator::Reconciler;
pub use progress::{DeployEvent, Progress, Step};
pub use report::{DeploymentReport, RegionOutcome, RegionalResult};
pub use routing::{
    HEALTHY_HTTP_CODES, Routing, TARGET_GROUP_PORT, ensure_routing, next_priority, rule_conditions,
};
pub use service::{ServiceChange, reconcile_service};
pub use state::{ClusterReady, Connected, Reconciled, Registered, Routed, Stable};
