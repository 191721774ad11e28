// ABOUTME: Composable capability traits for container runtimes.
// ABOUTME: Defines ImageOps, ContainerOps, NetworkOps, RuntimeInfo and FullRuntime.

mod container;
mod image;
mod network;
mod runtime_info;
mod shared_types;

pub use container::{ContainerError, ContainerFilters, ContainerOps, ContainerSummary};
pub use image::{ImageError, ImageOps};
pub use network::{NetworkError, NetworkOps};
pub use runtime_info::{RuntimeInfo, RuntimeInfoError};
pub use shared_types::*;

/// Everything the deployment pipeline needs from a runtime.
pub trait FullRuntime: ImageOps + ContainerOps + NetworkOps {}

impl<T: ImageOps + ContainerOps + NetworkOps> FullRuntime for T {}
