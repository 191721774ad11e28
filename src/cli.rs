// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "exoframe")]
#[command(about = "Self-hosted deployment server for Docker and Podman")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a starter exoframe-server.yml in the current directory
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Accept uploads and deploy them
    Serve {
        /// Config file (default: exoframe-server.yml in the current directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Address to listen on, overriding the config
        #[arg(short, long)]
        listen: Option<SocketAddr>,
    },
}
