// ABOUTME: Runtime detection on the local host.
// ABOUTME: Honours config overrides, then checks Podman sockets before Docker.

use super::types::{RuntimeConfig, RuntimeEndpoint, RuntimeType};
use std::path::Path;

/// Error during runtime detection.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container runtime found (checked Podman and Docker sockets)")]
    NoRuntimeFound,
}

const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Detect the container runtime on this host.
///
/// An explicit `runtime` in `config` wins outright. Otherwise sockets are
/// probed in order:
/// 1. Rootless Podman (`/run/user/$UID/podman/podman.sock`)
/// 2. Rootful Podman (`/run/podman/podman.sock`)
/// 3. Docker (`/var/run/docker.sock`)
///
/// A `socket` without a `runtime` is treated as a Docker-compatible socket.
pub fn detect_local(config: Option<&RuntimeConfig>) -> Result<RuntimeEndpoint, DetectionError> {
    detect_with(config, current_uid(), |p| Path::new(p).exists())
}

pub(crate) fn detect_with(
    config: Option<&RuntimeConfig>,
    uid: Option<String>,
    exists: impl Fn(&str) -> bool,
) -> Result<RuntimeEndpoint, DetectionError> {
    if let Some(cfg) = config {
        match (cfg.runtime, &cfg.socket) {
            (Some(runtime_type), socket) => {
                return Ok(RuntimeEndpoint {
                    runtime_type,
                    socket_path: socket
                        .clone()
                        .unwrap_or_else(|| default_socket_path(runtime_type)),
                });
            }
            (None, Some(socket)) => {
                return Ok(RuntimeEndpoint {
                    runtime_type: RuntimeType::Docker,
                    socket_path: socket.clone(),
                });
            }
            (None, None) => {}
        }
    }

    let rootless = uid.map(|uid| format!("/run/user/{}/podman/podman.sock", uid));
    let candidates = rootless
        .into_iter()
        .map(|p| (RuntimeType::Podman, p))
        .chain([
            (RuntimeType::Podman, ROOTFUL_PODMAN.to_string()),
            (RuntimeType::Docker, DOCKER_SOCKET.to_string()),
        ]);

    for (runtime_type, socket_path) in candidates {
        if exists(&socket_path) {
            tracing::debug!(%runtime_type, socket = %socket_path, "detected runtime");
            return Ok(RuntimeEndpoint {
                runtime_type,
                socket_path,
            });
        }
    }

    Err(DetectionError::NoRuntimeFound)
}

fn current_uid() -> Option<String> {
    std::env::var("UID").ok().or_else(|| {
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| {
                s.lines()
                    .find(|l| l.starts_with("Uid:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .map(str::to_string)
            })
    })
}

fn default_socket_path(runtime: RuntimeType) -> String {
    match runtime {
        RuntimeType::Docker => DOCKER_SOCKET.to_string(),
        RuntimeType::Podman => ROOTFUL_PODMAN.to_string(),
    }
}
