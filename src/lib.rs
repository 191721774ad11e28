// ABOUTME: Library root for exoframe - the deployment engine and its adapters.
// ABOUTME: The server binary is in main.rs.

pub mod archive;
pub mod build;
pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod identity;
pub mod labels;
pub mod project;
pub mod runtime;
pub mod server;
pub mod types;
