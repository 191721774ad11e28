// ABOUTME: Finds the running instances an update will replace.
// ABOUTME: Matches on user and project labels, then narrows by service label.

use crate::labels;
use crate::project::{Project, Recipe};
use crate::runtime::{ContainerError, ContainerFilters, ContainerOps, ContainerSummary};
use std::collections::BTreeSet;

/// Which of a project's instances belong to this kind of deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryScope {
    /// Single-service projects: instances without a service label.
    Single,
    /// Compose projects: instances whose service label is one of these.
    Services(BTreeSet<String>),
}

impl DiscoveryScope {
    pub fn for_project(project: &Project) -> Self {
        match project.recipe() {
            Recipe::Compose(manifest) => DiscoveryScope::Services(
                manifest
                    .services
                    .iter()
                    .map(|s| s.name.to_string())
                    .collect(),
            ),
            _ => DiscoveryScope::Single,
        }
    }

    fn matches(&self, container: &ContainerSummary) -> bool {
        let service = container.labels.get(labels::SERVICE);
        match self {
            DiscoveryScope::Single => service.is_none(),
            DiscoveryScope::Services(names) => service.is_some_and(|s| names.contains(s)),
        }
    }
}

/// Instances of `project_label` owned by `user` that fall within `scope`.
pub async fn discover<R>(
    runtime: &R,
    user: &str,
    project_label: &str,
    scope: &DiscoveryScope,
) -> Result<Vec<ContainerSummary>, ContainerError>
where
    R: ContainerOps + ?Sized,
{
    let filters = ContainerFilters::default()
        .label(labels::USER, user)
        .label(labels::PROJECT, project_label)
        .include_stopped();

    let found: Vec<_> = runtime
        .list_containers(&filters)
        .await?
        .into_iter()
        .filter(|c| scope.matches(c))
        .collect();

    tracing::debug!(user, project = project_label, count = found.len(), "discovered previous instances");
    Ok(found)
}
