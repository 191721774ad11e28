// ABOUTME: Container runtime access: detection, capability traits and the bollard client.
// ABOUTME: Everything above this module talks to the runtime through the traits only.

mod bollard;
mod context;
mod detection;
mod error;
mod traits;
mod types;

pub use self::bollard::BollardRuntime;
pub use context::pack_context;
pub use detection::{DetectionError, detect_local};
pub use error::{RuntimeError, RuntimeErrorKind};
pub use traits::*;
pub use types::{RuntimeConfig, RuntimeEndpoint, RuntimeType};
