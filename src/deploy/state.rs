// ABOUTME: Deployment state marker types for the type state pattern.
// ABOUTME: Later states carry the containers created so far.

use crate::runtime::ContainerInfo;

/// Project classified and planned; nothing built yet.
/// Available actions: `build()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Classified;

/// Every image built or present locally.
/// Available actions: `start()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Built;

/// New containers created and running, old ones still in place.
/// Available actions: `swap()`
#[derive(Debug, Clone)]
pub struct Started {
    pub(crate) containers: Vec<ContainerInfo>,
}

/// Old containers removed.
/// Available actions: `summaries()`
#[derive(Debug, Clone)]
pub struct Done {
    pub(crate) containers: Vec<ContainerInfo>,
}
