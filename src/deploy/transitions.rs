// ABOUTME: State transition methods for deployment orchestration.
// ABOUTME: Each method consumes self and returns the next state on success.

use std::collections::HashMap;

use crate::build;
use crate::diagnostics::Warning;
use crate::events::EventSink;
use crate::runtime::{
    ContainerError, ContainerOps, ImageOps, NetworkConfig as RuntimeNetworkConfig, NetworkError,
    NetworkOps,
};
use crate::types::NetworkId;

use super::Deployment;
use super::error::DeployError;
use super::state::{Built, Classified, Done, Started};

// =============================================================================
// Internal Helpers
// =============================================================================

impl<S> Deployment<S> {
    fn transition<T>(self, state: T) -> Deployment<T> {
        Deployment {
            plan: self.plan,
            previous: self.previous,
            diagnostics: self.diagnostics,
            state,
        }
    }
}

/// Ensure the shared network exists, creating it if necessary.
///
/// Losing a creation race to another process counts as success.
pub async fn ensure_network<R>(runtime: &R, name: &str) -> Result<NetworkId, DeployError>
where
    R: NetworkOps + ?Sized,
{
    let failed = |source| DeployError::NetworkFailed {
        network: name.to_string(),
        source,
    };

    if runtime.network_exists(name).await.map_err(failed)? {
        tracing::debug!(network = name, "network already exists");
        return Ok(NetworkId::new(name));
    }

    let config = RuntimeNetworkConfig {
        name: name.to_string(),
        driver: Some("bridge".to_string()),
        labels: HashMap::new(),
    };

    match runtime.create_network(&config).await {
        Ok(id) => {
            tracing::info!(network = name, id = %id.short(), "created network");
            Ok(NetworkId::new(name))
        }
        Err(NetworkError::AlreadyExists(_)) => Ok(NetworkId::new(name)),
        Err(e) => Err(failed(e)),
    }
}

// =============================================================================
// Classified -> Built
// =============================================================================

impl Deployment<Classified> {
    /// Build every planned image in order, then make sure prebuilt images
    /// are available locally.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Build` for the first failed build; later builds
    /// do not run.
    #[must_use = "deployment state must be used"]
    pub async fn build<R>(
        self,
        runtime: &R,
        sink: &EventSink,
    ) -> Result<Deployment<Built>, DeployError>
    where
        R: ImageOps + ?Sized,
    {
        for entry in &self.plan.builds {
            build::build(runtime, entry, sink).await?;
        }

        for image in &self.plan.pulls {
            let pull_failed = |source| DeployError::ImagePullFailed {
                image: image.to_string(),
                source,
            };
            if runtime.image_exists(image).await.map_err(pull_failed)? {
                continue;
            }
            sink.info(format!("Pulling image {}..", image));
            tracing::info!(%image, "pulling image");
            runtime.pull_image(image).await.map_err(pull_failed)?;
        }

        Ok(self.transition(Built))
    }
}

// =============================================================================
// Built -> Started
// =============================================================================

impl Deployment<Built> {
    /// Create, start and inspect every service in declaration order.
    ///
    /// Containers created before a failure are left in place, as are all
    /// previous instances.
    #[must_use = "deployment state must be used"]
    pub async fn start<R>(
        self,
        runtime: &R,
        sink: &EventSink,
    ) -> Result<Deployment<Started>, DeployError>
    where
        R: ContainerOps + ?Sized,
    {
        let mut containers = Vec::with_capacity(self.plan.services.len());

        for service in self.plan.services.iter() {
            let config = service.container_config();
            let name = config.name.clone();

            sink.info(format!("Starting {}..", name));
            let id = runtime.create_container(&config).await.map_err(|source| {
                DeployError::ContainerCreateFailed {
                    name: name.clone(),
                    source,
                }
            })?;
            runtime
                .start_container(&id)
                .await
                .map_err(|source| DeployError::ContainerStartFailed {
                    name: name.clone(),
                    source,
                })?;
            let info = runtime.inspect_container(&id).await.map_err(|source| {
                DeployError::ContainerInspectFailed {
                    name: name.clone(),
                    source,
                }
            })?;

            tracing::info!(container = %name, id = %id.short(), image = %service.image, "started container");
            containers.push(info);
        }

        Ok(self.transition(Started { containers }))
    }
}

// =============================================================================
// Started -> Done
// =============================================================================

impl Deployment<Started> {
    /// Remove the instances this deployment replaces.
    ///
    /// Never fails: a container that cannot be removed becomes a warning.
    #[must_use = "deployment state must be used"]
    pub async fn swap<R>(mut self, runtime: &R, sink: &EventSink) -> Deployment<Done>
    where
        R: ContainerOps + ?Sized,
    {
        let previous = std::mem::take(&mut self.previous);

        for old in &previous {
            match runtime.remove_container(&old.id, true).await {
                Ok(()) => {
                    tracing::info!(container = %old.name, id = %old.id.short(), "removed previous instance");
                    sink.info(format!("Removed previous deployment {}", old.name));
                }
                Err(ContainerError::NotFound(_)) => {
                    tracing::debug!(container = %old.name, "previous instance already gone");
                }
                Err(e) => {
                    let message =
                        format!("failed to remove previous deployment {}: {}", old.name, e);
                    sink.info(message.clone());
                    self.diagnostics.warn(Warning::swap_remove(message));
                }
            }
        }

        self.previous = previous;
        let containers = std::mem::take(&mut self.state.containers);
        self.transition(Done { containers })
    }
}
