// ABOUTME: Shared types used across runtime trait definitions.
// ABOUTME: ContainerConfig, ContainerInfo, BuildRequest, port and volume specs, etc.

use crate::config::RestartPolicy;
use crate::types::{ContainerId, ImageRef, NetworkAlias};
use futures::Stream;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;
use std::str::FromStr;

use super::ImageError;

/// Configuration for creating a container.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// Container name, without the leading slash.
    pub name: String,
    pub image: ImageRef,
    pub env: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub ports: Vec<PortMapping>,
    pub volumes: Vec<VolumeMount>,
    /// Overrides the image CMD.
    pub command: Option<Vec<String>>,
    pub restart_policy: RestartPolicyConfig,
    /// Network to attach at creation time.
    pub network: Option<String>,
    /// Aliases on `network`; ignored when no network is set.
    pub network_aliases: Vec<NetworkAlias>,
}

/// Port mapping, parsed from `80`, `8080:80`, `127.0.0.1:8080:80` or `53/udp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    pub host_port: Option<u16>,
    pub container_port: u16,
    pub protocol: Protocol,
    pub host_ip: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => f.write_str("tcp"),
            Protocol::Udp => f.write_str("udp"),
        }
    }
}

impl FromStr for PortMapping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (ports, protocol) = match s.rsplit_once('/') {
            Some((p, "tcp")) => (p, Protocol::Tcp),
            Some((p, "udp")) => (p, Protocol::Udp),
            Some((_, other)) => return Err(format!("unknown port protocol: {}", other)),
            None => (s, Protocol::Tcp),
        };

        let parse = |p: &str| {
            p.parse::<u16>()
                .map_err(|_| format!("invalid port number in '{}'", s))
        };

        let parts: Vec<&str> = ports.split(':').collect();
        let (host_ip, host_port, container_port) = match parts.as_slice() {
            [container] => (None, None, parse(container)?),
            [host, container] => (None, Some(parse(host)?), parse(container)?),
            [ip, host, container] => (
                Some((*ip).to_string()),
                Some(parse(host)?),
                parse(container)?,
            ),
            _ => return Err(format!("invalid port mapping: {}", s)),
        };

        Ok(PortMapping {
            host_port,
            container_port,
            protocol,
            host_ip,
        })
    }
}

/// A mount: absolute host paths bind, anything else names a volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub source: String,
    pub target: String,
    pub read_only: bool,
}

impl VolumeMount {
    pub fn is_bind(&self) -> bool {
        self.source.starts_with('/')
    }
}

impl FromStr for VolumeMount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        let (source, target, read_only) = match parts.as_slice() {
            [source, target] => (*source, *target, false),
            [source, target, "ro"] => (*source, *target, true),
            [source, target, "rw"] => (*source, *target, false),
            _ => return Err(format!("invalid volume spec: {}", s)),
        };

        if source.is_empty() || !target.starts_with('/') {
            return Err(format!("invalid volume spec: {}", s));
        }
        // The upload directory is gone once the request ends.
        if source.starts_with('.') {
            return Err(format!(
                "relative bind mounts are not supported: {}",
                source
            ));
        }

        Ok(VolumeMount {
            source: source.to_string(),
            target: target.to_string(),
            read_only,
        })
    }
}

/// Restart policy as the runtime API understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicyConfig {
    No,
    Always,
    UnlessStopped,
    OnFailure { max_retries: Option<u32> },
}

impl From<RestartPolicy> for RestartPolicyConfig {
    fn from(policy: RestartPolicy) -> Self {
        match policy {
            RestartPolicy::No => RestartPolicyConfig::No,
            RestartPolicy::Always => RestartPolicyConfig::Always,
            RestartPolicy::UnlessStopped => RestartPolicyConfig::UnlessStopped,
            RestartPolicy::OnFailure { max_retries } => {
                RestartPolicyConfig::OnFailure { max_retries }
            }
        }
    }
}

/// Information about a container as reported by inspect.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    pub id: ContainerId,
    /// Name without the leading slash.
    pub name: String,
    pub image: String,
    pub state: ContainerState,
    pub labels: HashMap<String, String>,
    pub network_settings: NetworkSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
}

#[derive(Debug, Clone, Default)]
pub struct NetworkSettings {
    /// Attachments keyed by network name.
    pub networks: HashMap<String, NetworkInfo>,
}

#[derive(Debug, Clone, Default)]
pub struct NetworkInfo {
    pub network_id: String,
    pub ip_address: String,
    pub aliases: Vec<String>,
}

/// Configuration for creating a network.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub name: String,
    /// Network driver (bridge, overlay, ...).
    pub driver: Option<String>,
    pub labels: HashMap<String, String>,
}

/// Runtime metadata.
#[derive(Debug, Clone)]
pub struct RuntimeMetadata {
    /// Runtime name ("Docker" or "Podman").
    pub name: String,
    pub version: String,
    pub api_version: String,
    pub os: String,
    pub arch: String,
}

/// Where the Dockerfile for a build comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockerfileSource {
    /// Path relative to the build context.
    InContext(String),
    /// Contents generated by a recipe; injected into the context at build time.
    Generated(String),
}

/// Name under which generated Dockerfiles are added to the build context.
pub const GENERATED_DOCKERFILE: &str = ".exoframe.Dockerfile";

/// One image build.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub context: PathBuf,
    pub dockerfile: DockerfileSource,
    pub tag: ImageRef,
}

impl BuildRequest {
    /// Dockerfile path the runtime should read inside the packed context.
    pub fn dockerfile_name(&self) -> &str {
        match &self.dockerfile {
            DockerfileSource::InContext(path) => path,
            DockerfileSource::Generated(_) => GENERATED_DOCKERFILE,
        }
    }

    /// Dockerfile text: generated contents, or the file read from the context.
    pub fn dockerfile_contents(&self) -> std::io::Result<String> {
        match &self.dockerfile {
            DockerfileSource::InContext(path) => std::fs::read_to_string(self.context.join(path)),
            DockerfileSource::Generated(contents) => Ok(contents.clone()),
        }
    }
}

/// Progress from a running build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutput {
    /// One line of build log.
    Line(String),
    /// The build failed; the message is the runtime's own last line.
    Failed(String),
}

pub type BuildStream = Pin<Box<dyn Stream<Item = Result<BuildOutput, ImageError>> + Send>>;

/// Split a raw output chunk into log lines, dropping blanks and line endings.
pub fn split_log_lines(chunk: &str) -> impl Iterator<Item = String> + '_ {
    chunk
        .split('\n')
        .map(|line| line.trim_end_matches('\r').trim_end())
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
}
