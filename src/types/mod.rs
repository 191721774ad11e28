// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Phantom-typed runtime ids plus validated names, aliases and image refs.

mod deployment_id;
mod id;
mod image_ref;
mod network_alias;
mod slug;

pub use deployment_id::DeploymentId;
pub use id::{ContainerId, NetworkId};
pub use image_ref::{ImageRef, ParseImageRefError};
pub use network_alias::{NetworkAlias, NetworkAliasError};
pub use slug::{Slug, SlugError};
