// ABOUTME: In-memory container runtime implementing the runtime capability traits.
// ABOUTME: Simulates builds step by step and tracks containers, images and networks.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use exoframe::runtime::{
    BuildOutput, BuildRequest, BuildStream, ContainerConfig, ContainerError, ContainerFilters,
    ContainerInfo, ContainerOps, ContainerState, ContainerSummary, ImageError, ImageOps,
    NetworkConfig, NetworkError, NetworkInfo, NetworkOps, NetworkSettings, RestartPolicyConfig,
};
use exoframe::types::{ContainerId, ImageRef, NetworkId};
use parking_lot::Mutex;

/// A container as the fake runtime stores it.
#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub id: String,
    pub name: String,
    pub image: String,
    pub labels: HashMap<String, String>,
    pub env: BTreeMap<String, String>,
    pub network: Option<String>,
    pub aliases: Vec<String>,
    pub restart: RestartPolicyConfig,
    pub running: bool,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    containers: BTreeMap<String, FakeContainer>,
    images: HashSet<String>,
    networks: HashSet<String>,
    builds: Vec<String>,
    pulls: Vec<String>,
    removed: Vec<String>,
    failing_commands: Vec<String>,
    failing_starts: Vec<String>,
    failing_removals: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FakeRuntime {
    state: Mutex<State>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// `RUN <command>` steps containing this text fail with exit code 1.
    pub fn fail_command(&self, command: &str) {
        self.state.lock().failing_commands.push(command.to_string());
    }

    /// Starting a container whose name contains this text fails.
    pub fn fail_start(&self, name_part: &str) {
        self.state.lock().failing_starts.push(name_part.to_string());
    }

    /// Removing a container whose name contains this text fails.
    pub fn fail_removal(&self, name_part: &str) {
        self.state.lock().failing_removals.push(name_part.to_string());
    }

    pub fn add_image(&self, reference: &str) {
        self.state.lock().images.insert(reference.to_string());
    }

    pub fn containers(&self) -> Vec<FakeContainer> {
        self.state.lock().containers.values().cloned().collect()
    }

    pub fn container_named(&self, name: &str) -> Option<FakeContainer> {
        self.state
            .lock()
            .containers
            .values()
            .find(|c| c.name == name)
            .cloned()
    }

    /// Tags of every successful build, in order.
    pub fn builds(&self) -> Vec<String> {
        self.state.lock().builds.clone()
    }

    pub fn pulls(&self) -> Vec<String> {
        self.state.lock().pulls.clone()
    }

    /// Names of removed containers, in order.
    pub fn removed(&self) -> Vec<String> {
        self.state.lock().removed.clone()
    }

    pub fn has_network(&self, name: &str) -> bool {
        self.state.lock().networks.contains(name)
    }
}

/// Dockerfile instructions, one per non-blank, non-comment line.
fn instructions(dockerfile: &str) -> Vec<String> {
    dockerfile
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn exit_code(command: &str, failing: &[String]) -> Option<i32> {
    if let Some(code) = command.trim().strip_prefix("exit ") {
        return code.trim().parse().ok().filter(|c| *c != 0);
    }
    failing.iter().any(|f| command.contains(f.as_str())).then_some(1)
}

#[async_trait]
impl ImageOps for FakeRuntime {
    async fn build_image(&self, request: &BuildRequest) -> Result<BuildStream, ImageError> {
        if !request.context.is_dir() {
            return Err(ImageError::Context(format!(
                "{} is not a directory",
                request.context.display()
            )));
        }
        let dockerfile = request
            .dockerfile_contents()
            .map_err(|e| ImageError::Context(e.to_string()))?;

        let steps = instructions(&dockerfile);
        let total = steps.len();
        let mut state = self.state.lock();
        let mut items = Vec::new();
        let mut failed = false;

        for (i, step) in steps.iter().enumerate() {
            items.push(Ok(BuildOutput::Line(format!(
                "Step {}/{} : {}",
                i + 1,
                total,
                step
            ))));
            if let Some(command) = step.strip_prefix("RUN ")
                && let Some(code) = exit_code(command, &state.failing_commands)
            {
                items.push(Ok(BuildOutput::Failed(format!(
                    "The command '/bin/sh -c {}' returned a non-zero code: {}",
                    command, code
                ))));
                failed = true;
                break;
            }
            items.push(Ok(BuildOutput::Line(format!(" ---> {:012x}", i + 1))));
        }

        if !failed {
            items.push(Ok(BuildOutput::Line(format!(
                "Successfully tagged {}",
                request.tag
            ))));
            state.images.insert(request.tag.to_string());
            state.builds.push(request.tag.to_string());
        }

        Ok(Box::pin(futures::stream::iter(items)))
    }

    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError> {
        let mut state = self.state.lock();
        state.images.insert(reference.to_string());
        state.pulls.push(reference.to_string());
        Ok(())
    }

    async fn image_exists(&self, reference: &ImageRef) -> Result<bool, ImageError> {
        Ok(self.state.lock().images.contains(&reference.to_string()))
    }
}

#[async_trait]
impl ContainerOps for FakeRuntime {
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError> {
        let mut state = self.state.lock();
        if state.containers.values().any(|c| c.name == config.name) {
            return Err(ContainerError::AlreadyExists(config.name.clone()));
        }
        let image = config.image.to_string();
        if !state.images.contains(&image) {
            return Err(ContainerError::ImageNotFound(image));
        }

        state.next_id += 1;
        let id = format!("{:064x}", state.next_id);
        state.containers.insert(
            id.clone(),
            FakeContainer {
                id: id.clone(),
                name: config.name.clone(),
                image,
                labels: config.labels.clone().into_iter().collect(),
                env: config.env.clone(),
                network: config.network.clone(),
                aliases: config
                    .network_aliases
                    .iter()
                    .map(|a| a.as_str().to_string())
                    .collect(),
                restart: config.restart_policy,
                running: false,
            },
        );
        Ok(ContainerId::new(id))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        let mut state = self.state.lock();
        let failing = state.failing_starts.clone();
        let container = state
            .containers
            .get_mut(id.as_str())
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        if failing.iter().any(|f| container.name.contains(f.as_str())) {
            return Err(ContainerError::Runtime(format!(
                "cannot start {}: simulated failure",
                container.name
            )));
        }
        container.running = true;
        Ok(())
    }

    async fn remove_container(&self, id: &ContainerId, _force: bool) -> Result<(), ContainerError> {
        let mut state = self.state.lock();
        let name = state
            .containers
            .get(id.as_str())
            .map(|c| c.name.clone())
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        if state.failing_removals.iter().any(|f| name.contains(f.as_str())) {
            return Err(ContainerError::Runtime(format!(
                "cannot remove {}: simulated failure",
                name
            )));
        }
        state.containers.remove(id.as_str());
        state.removed.push(name);
        Ok(())
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError> {
        let state = self.state.lock();
        let c = state
            .containers
            .get(id.as_str())
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;

        let mut networks = HashMap::new();
        if let Some(network) = &c.network {
            networks.insert(
                network.clone(),
                NetworkInfo {
                    network_id: network.clone(),
                    ip_address: "172.18.0.2".to_string(),
                    aliases: c.aliases.clone(),
                },
            );
        }

        Ok(ContainerInfo {
            id: ContainerId::new(c.id.clone()),
            name: c.name.clone(),
            image: c.image.clone(),
            state: if c.running {
                ContainerState::Running
            } else {
                ContainerState::Created
            },
            labels: c.labels.clone(),
            network_settings: NetworkSettings { networks },
        })
    }

    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        let state = self.state.lock();
        Ok(state
            .containers
            .values()
            .filter(|c| filters.all || c.running)
            .filter(|c| {
                filters
                    .labels
                    .iter()
                    .all(|(k, v)| c.labels.get(k) == Some(v))
            })
            .map(|c| ContainerSummary {
                id: ContainerId::new(c.id.clone()),
                name: c.name.clone(),
                image: c.image.clone(),
                state: if c.running { "running" } else { "created" }.to_string(),
                labels: c.labels.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl NetworkOps for FakeRuntime {
    async fn create_network(&self, config: &NetworkConfig) -> Result<NetworkId, NetworkError> {
        let mut state = self.state.lock();
        if !state.networks.insert(config.name.clone()) {
            return Err(NetworkError::AlreadyExists(config.name.clone()));
        }
        Ok(NetworkId::new(format!("net-{}", config.name)))
    }

    async fn network_exists(&self, name: &str) -> Result<bool, NetworkError> {
        Ok(self.state.lock().networks.contains(name))
    }
}
