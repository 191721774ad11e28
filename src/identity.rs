// ABOUTME: Immutable identity of one deployed service within one request.
// ABOUTME: Derives base names, deployment (container) names and image tags.

use crate::types::{DeploymentId, ImageRef, ParseImageRefError, Slug};
use std::fmt;

/// (user, project, service, id) plus the configured name prefix.
///
/// Built once per service per request and threaded through planning,
/// labelling and the orchestrator; nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentIdentity {
    prefix: Slug,
    user: Slug,
    project: Slug,
    service: Option<Slug>,
    id: DeploymentId,
}

impl DeploymentIdentity {
    pub fn new(
        prefix: Slug,
        user: Slug,
        project: Slug,
        service: Option<Slug>,
        id: DeploymentId,
    ) -> Self {
        Self {
            prefix,
            user,
            project,
            service,
            id,
        }
    }

    pub fn user(&self) -> &Slug {
        &self.user
    }

    pub fn project(&self) -> &Slug {
        &self.project
    }

    pub fn service(&self) -> Option<&Slug> {
        self.service.as_ref()
    }

    pub fn id(&self) -> &DeploymentId {
        &self.id
    }

    /// `<prefix>-<user>-<project>[-<service>]`, stable across updates.
    pub fn base_name(&self) -> String {
        match &self.service {
            Some(service) => format!(
                "{}-{}-{}-{}",
                self.prefix, self.user, self.project, service
            ),
            None => format!("{}-{}-{}", self.prefix, self.user, self.project),
        }
    }

    /// Base name plus the request id; the container name.
    pub fn deployment_name(&self) -> String {
        format!("{}-{}", self.base_name(), self.id)
    }

    /// Tag for an image built for this service in this request.
    pub fn image_tag(&self) -> Result<ImageRef, ParseImageRefError> {
        ImageRef::local(&self.base_name(), self.id.as_str())
    }
}

impl fmt::Display for DeploymentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.deployment_name())
    }
}
