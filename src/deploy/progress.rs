// ABOUTME: Progress events emitted by region workers while a deployment runs.
// ABOUTME: Sent over an unbounded channel so reporting never blocks a poll loop.

use serde::Serialize;
use std::fmt;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::types::{Region, TaskDefinitionArn};

/// One step of a region's deployment chain, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    LogGroup,
    RegisterRevision,
    EnsureCluster,
    EnsureRouting,
    ReconcileService,
    WaitStable,
    DeregisterPrevious,
}

impl Step {
    pub fn description(&self) -> &'static str {
        match self {
            Step::LogGroup => "ensuring log group",
            Step::RegisterRevision => "registering task definition",
            Step::EnsureCluster => "ensuring cluster",
            Step::EnsureRouting => "ensuring load balancer routing",
            Step::ReconcileService => "reconciling service",
            Step::WaitStable => "waiting for service to become stable",
            Step::DeregisterPrevious => "deregistering previous task definition",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DeployEvent {
    StepStarted {
        region: Region,
        step: Step,
    },
    StepCompleted {
        region: Region,
        step: Step,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    /// One tick of the rollout barrier.
    RolloutPoll {
        region: Region,
        running: u32,
        desired: u32,
        pending: u32,
    },
    RegionFailed {
        region: Region,
        error: String,
    },
    Retired {
        region: Region,
        task_definition: TaskDefinitionArn,
    },
}

impl DeployEvent {
    pub fn region(&self) -> &Region {
        match self {
            DeployEvent::StepStarted { region, .. }
            | DeployEvent::StepCompleted { region, .. }
            | DeployEvent::RolloutPoll { region, .. }
            | DeployEvent::RegionFailed { region, .. }
            | DeployEvent::Retired { region, .. } => region,
        }
    }
}

/// Sending half of the progress channel, cloned into every region worker.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    tx: Option<UnboundedSender<DeployEvent>>,
}

impl Progress {
    pub fn channel() -> (Self, UnboundedReceiver<DeployEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    /// Emit an event. Dropped silently when disabled or nobody is listening.
    pub fn emit(&self, event: DeployEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub(crate) fn started(&self, region: &Region, step: Step) {
        self.emit(DeployEvent::StepStarted {
            region: region.clone(),
            step,
        });
    }

    pub(crate) fn completed(&self, region: &Region, step: Step, detail: impl Into<Option<String>>) {
        self.emit(DeployEvent::StepCompleted {
            region: region.clone(),
            step,
            detail: detail.into(),
        });
    }
}
