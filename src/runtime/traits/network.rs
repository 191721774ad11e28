// ABOUTME: Network operations trait for container runtimes.
// ABOUTME: Create the shared deployment network and check whether it exists.

use super::shared_types::NetworkConfig;
use crate::types::NetworkId;
use async_trait::async_trait;

#[async_trait]
pub trait NetworkOps: Send + Sync {
    async fn create_network(&self, config: &NetworkConfig) -> Result<NetworkId, NetworkError>;

    async fn network_exists(&self, name: &str) -> Result<bool, NetworkError>;
}

/// Errors from network operations.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("network already exists: {0}")]
    AlreadyExists(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
