// ABOUTME: Image operations trait for container runtimes.
// ABOUTME: Build from a context with streamed output, pull, and check existence.

use super::shared_types::{BuildRequest, BuildStream};
use crate::types::ImageRef;
use async_trait::async_trait;

/// Image operations: build, pull, check existence.
#[async_trait]
pub trait ImageOps: Send + Sync {
    /// Start a build. The stream yields log lines in order and ends after
    /// either the last line of a successful build or one `Failed` item.
    async fn build_image(&self, request: &BuildRequest) -> Result<BuildStream, ImageError>;

    /// Pull an image from its registry.
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError>;

    /// Check if an image exists locally.
    async fn image_exists(&self, reference: &ImageRef) -> Result<bool, ImageError>;
}

/// Errors from image operations.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("cannot prepare build context: {0}")]
    Context(String),

    #[error("pull failed: {0}")]
    PullFailed(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
