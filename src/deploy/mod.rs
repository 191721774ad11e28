// ABOUTME: Deployment orchestration using the type state pattern.
// ABOUTME: Exports state markers, the Deployment struct and the request pipeline.

mod deployment;
mod discovery;
mod error;
mod lock;
mod pipeline;
mod state;
mod transitions;

pub use deployment::Deployment;
pub use discovery::{DiscoveryScope, discover};
pub use error::DeployError;
pub use lock::{ProjectGuard, ProjectLocks};
pub use pipeline::{Engine, Mode, PipelineError};
pub use state::{Built, Classified, Done, Started};
pub use transitions::ensure_network;
