// ABOUTME: Generic deployment struct parameterized by state marker.
// ABOUTME: Holds the plan, the instances it replaces and collected diagnostics.

use crate::diagnostics::{Diagnostics, Warning};
use crate::events::DeploymentSummary;
use crate::project::Plan;
use crate::runtime::{ContainerInfo, ContainerSummary};

use super::state::{Classified, Done, Started};

/// A deployment in progress, parameterized by its current state.
///
/// Transitions consume the deployment, so a container can only be started
/// after every image is built, and old instances can only be removed after
/// every new one is running.
#[derive(Debug)]
pub struct Deployment<S> {
    pub(crate) plan: Plan,
    pub(crate) previous: Vec<ContainerSummary>,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) state: S,
}

impl Deployment<Classified> {
    /// Start from a plan; `previous` is empty for a first deploy.
    pub fn new(plan: Plan, previous: Vec<ContainerSummary>) -> Self {
        let mut diagnostics = Diagnostics::default();
        for note in &plan.warnings {
            diagnostics.warn(Warning::reserved_label(note.clone()));
        }
        Deployment {
            plan,
            previous,
            diagnostics,
            state: Classified,
        }
    }
}

impl<S> Deployment<S> {
    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Instances this deployment will replace.
    pub fn previous(&self) -> &[ContainerSummary] {
        &self.previous
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

impl Deployment<Started> {
    pub fn containers(&self) -> &[ContainerInfo] {
        &self.state.containers
    }
}

impl Deployment<Done> {
    pub fn containers(&self) -> &[ContainerInfo] {
        &self.state.containers
    }

    /// One entry per new instance, in declaration order.
    pub fn summaries(&self) -> Vec<DeploymentSummary> {
        self.state
            .containers
            .iter()
            .map(DeploymentSummary::from)
            .collect()
    }
}
