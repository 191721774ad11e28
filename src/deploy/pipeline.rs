// ABOUTME: The per-request pipeline: unpack, classify, lock, discover, plan, build,
// ABOUTME: start and swap, reporting everything through one EventSink.

use std::io;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;

use crate::archive;
use crate::config::ServerConfig;
use crate::events::EventSink;
use crate::project::{ClassificationError, PlanContext, classify};
use crate::runtime::FullRuntime;
use crate::types::{DeploymentId, Slug};

use super::discovery::{DiscoveryScope, discover};
use super::error::DeployError;
use super::lock::ProjectLocks;
use super::state::Done;
use super::Deployment;

/// Whether existing instances of the project are replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Start new instances next to whatever already runs.
    Deploy,
    /// Start new instances, then remove the ones they supersede.
    Update,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("cannot unpack upload: {0}")]
    Archive(#[source] io::Error),

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Deploy(#[from] DeployError),
}

impl PipelineError {
    pub fn log(&self) -> Vec<String> {
        match self {
            PipelineError::Deploy(e) => e.log(),
            _ => Vec::new(),
        }
    }
}

/// Runs deployments against one runtime with one server configuration.
#[derive(Clone)]
pub struct Engine {
    runtime: Arc<dyn FullRuntime>,
    config: Arc<ServerConfig>,
    locks: ProjectLocks,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("network", &self.config.network)
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn new(runtime: Arc<dyn FullRuntime>, config: Arc<ServerConfig>) -> Self {
        Self {
            runtime,
            config,
            locks: ProjectLocks::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Unpack an uploaded archive and deploy it. Always ends the stream with
    /// exactly one terminal event.
    pub async fn run_archive(
        &self,
        mode: Mode,
        archive: Bytes,
        upload_name: &str,
        user: Slug,
        sink: EventSink,
    ) {
        let upload = match archive::unpack(archive, upload_name).await {
            Ok(upload) => upload,
            Err(e) => {
                self.finish(Err(PipelineError::Archive(e)), sink);
                return;
            }
        };
        self.run(mode, upload.root(), user, sink).await;
    }

    /// Deploy the project rooted at `root`.
    pub async fn run(&self, mode: Mode, root: &Path, user: Slug, sink: EventSink) {
        let result = self.execute(mode, root, &user, &sink).await;
        self.finish(result, sink);
    }

    fn finish(&self, result: Result<Deployment<Done>, PipelineError>, sink: EventSink) {
        match result {
            Ok(done) => {
                let summaries = done.summaries();
                tracing::info!(
                    deployments = summaries.len(),
                    warnings = done.diagnostics().warnings().len(),
                    "deployment finished"
                );
                sink.succeed(summaries);
            }
            Err(e) => {
                tracing::error!(error = %e, "deployment failed");
                let log = e.log();
                sink.fail(e.to_string(), log);
            }
        }
    }

    async fn execute(
        &self,
        mode: Mode,
        root: &Path,
        user: &Slug,
        sink: &EventSink,
    ) -> Result<Deployment<Done>, PipelineError> {
        let project = classify(root, self.config.as_ref())?;
        sink.info(format!("Deploying {} project..", project.display_name()));

        let _guard = self
            .locks
            .acquire(user.as_str(), project.project_label())
            .await;

        let previous = match mode {
            Mode::Deploy => Vec::new(),
            Mode::Update => {
                let scope = DiscoveryScope::for_project(&project);
                discover(
                    self.runtime.as_ref(),
                    user.as_str(),
                    project.project_label(),
                    &scope,
                )
                .await
                .map_err(DeployError::DiscoveryFailed)?
            }
        };

        let ctx = PlanContext {
            prefix: self.config.name_prefix.clone(),
            user: user.clone(),
            network: self.config.network.clone(),
            default_restart: self.config.default_restart,
            id: DeploymentId::generate(),
        };
        let plan = project.plan(&ctx)?;

        tracing::info!(
            project = %project.name(),
            user = %user,
            recipe = %project.kind(),
            id = %ctx.id,
            services = plan.services.len(),
            replacing = previous.len(),
            "deploying"
        );

        let deployment = Deployment::new(plan, previous);
        for warning in deployment.diagnostics().warnings() {
            sink.info(warning.message.clone());
        }

        let runtime = self.runtime.as_ref();
        let done = deployment
            .build(runtime, sink)
            .await?
            .start(runtime, sink)
            .await?
            .swap(runtime, sink)
            .await;

        Ok(done)
    }
}
