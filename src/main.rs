// ABOUTME: Entry point for the exoframe server binary.
// ABOUTME: Parses arguments and dispatches to init or serve.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use exoframe::config::{self, ServerConfig};
use exoframe::deploy::{Engine, ensure_network};
use exoframe::error::{Error, Result};
use exoframe::runtime::{BollardRuntime, RuntimeError, RuntimeInfo, detect_local};
use exoframe::server;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbose flag when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { force } => {
            let cwd = env::current_dir()?;
            let path = config::init_config(&cwd, force)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        Commands::Serve { config, listen } => {
            let config = load_config(config)?;
            serve(config, listen).await
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<ServerConfig> {
    match path {
        Some(path) => ServerConfig::load_explicit(&path),
        None => ServerConfig::discover(&env::current_dir()?),
    }
}

async fn serve(config: ServerConfig, listen: Option<SocketAddr>) -> Result<()> {
    let endpoint = detect_local(Some(&config.runtime_config())).map_err(RuntimeError::from)?;
    tracing::info!(
        runtime = %endpoint.runtime_type,
        socket = %endpoint.socket_path,
        "using container runtime"
    );

    let runtime =
        BollardRuntime::connect(&endpoint, config.runtime_timeout).map_err(RuntimeError::from)?;
    runtime.ping().await.map_err(RuntimeError::from)?;
    match runtime.info().await {
        Ok(meta) => tracing::info!(
            name = %meta.name,
            version = %meta.version,
            api = %meta.api_version,
            "runtime is reachable"
        ),
        Err(e) => tracing::warn!(error = %e, "runtime info unavailable"),
    }

    ensure_network(&runtime, &config.network)
        .await
        .map_err(|e| Error::Network(e.to_string()))?;

    let addr = listen.unwrap_or(config.listen);
    let engine = Arc::new(Engine::new(Arc::new(runtime), Arc::new(config)));

    server::serve(addr, engine, shutdown_signal()).await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
