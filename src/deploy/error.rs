// ABOUTME: Error types for deployment operations.
// ABOUTME: Covers discovery, pull, container and network failures plus failed builds.

use crate::build::BuildError;
use crate::runtime::{ContainerError, ImageError, NetworkError};

/// Errors that abort a deployment.
///
/// Old containers are never touched once one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("failed to list existing deployments: {0}")]
    DiscoveryFailed(#[source] ContainerError),

    #[error("failed to pull image {image}: {source}")]
    ImagePullFailed { image: String, source: ImageError },

    #[error("failed to create container {name}: {source}")]
    ContainerCreateFailed { name: String, source: ContainerError },

    #[error("failed to start container {name}: {source}")]
    ContainerStartFailed { name: String, source: ContainerError },

    #[error("failed to inspect container {name}: {source}")]
    ContainerInspectFailed { name: String, source: ContainerError },

    #[error("failed to prepare network {network}: {source}")]
    NetworkFailed { network: String, source: NetworkError },
}

impl DeployError {
    /// Build log to report with the failure; empty for non-build errors.
    pub fn log(&self) -> Vec<String> {
        match self {
            DeployError::Build(e) => e.log.clone(),
            _ => Vec::new(),
        }
    }
}
