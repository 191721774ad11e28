// ABOUTME: HTTP server setup: routes, body limit, tracing and graceful shutdown.
// ABOUTME: Serves the deploy and update endpoints over one shared Engine.

mod handlers;

pub use handlers::{NDJSON, PROJECT_HEADER, USER_HEADER};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit, routing::post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::deploy::Engine;
use crate::error::{Error, Result};
use handlers::{deploy_handler, update_handler};

/// Routes with state and middleware attached.
pub fn router(engine: Arc<Engine>) -> Router {
    let limit = engine.config().max_upload_size;

    Router::new()
        .route("/deploy", post(deploy_handler))
        .route("/update", post(update_handler))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(engine)
        .layer(TraceLayer::new_for_http())
}

/// Serve until `shutdown_signal` resolves.
pub async fn serve(
    addr: SocketAddr,
    engine: Arc<Engine>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = router(engine);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Server(format!("cannot bind {}: {}", addr, e)))?;
    info!("Starting HTTP server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| Error::Server(e.to_string()))
}
