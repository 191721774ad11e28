// ABOUTME: HTTP request handlers for deploy and update uploads.
// ABOUTME: Resolves the user and upload name, spawns the pipeline, streams NDJSON.

use std::io;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{State, rejection::BytesRejection},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};

use crate::archive::DEFAULT_UPLOAD_NAME;
use crate::deploy::{Engine, Mode};
use crate::events::{EventReceiver, EventSink};
use crate::types::Slug;

/// Acting user, set by an authenticating proxy in front of the server.
pub const USER_HEADER: &str = "x-exoframe-user";

/// Optional project name hint, used when the upload has no exoframe.json name.
pub const PROJECT_HEADER: &str = "x-exoframe-project";

pub const NDJSON: &str = "application/x-ndjson";

/// Deploy handler: start new instances next to existing ones.
pub async fn deploy_handler(
    State(engine): State<Arc<Engine>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    start(engine, Mode::Deploy, &headers, body)
}

/// Update handler: start new instances, then remove the old ones.
pub async fn update_handler(
    State(engine): State<Arc<Engine>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    start(engine, Mode::Update, &headers, body)
}

fn start(
    engine: Arc<Engine>,
    mode: Mode,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let (sink, rx) = EventSink::channel();

    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "rejected upload");
            sink.fail(format!("cannot read upload: {}", rejection.body_text()), Vec::new());
            return ndjson(rx);
        }
    };

    let user = match resolve_user(headers, &engine.config().default_user) {
        Ok(user) => user,
        Err(message) => {
            sink.fail(message, Vec::new());
            return ndjson(rx);
        }
    };

    let upload_name = headers
        .get(PROJECT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(Slug::from_lossy)
        .map(|s| s.to_string())
        .unwrap_or_else(|| DEFAULT_UPLOAD_NAME.to_string());

    tracing::info!(?mode, user = %user, bytes = body.len(), "accepted upload");

    tokio::spawn(async move {
        engine
            .run_archive(mode, body, &upload_name, user, sink)
            .await;
    });

    ndjson(rx)
}

fn resolve_user(headers: &HeaderMap, default: &Slug) -> Result<Slug, String> {
    match headers.get(USER_HEADER) {
        None => Ok(default.clone()),
        Some(value) => {
            let raw = value
                .to_str()
                .map_err(|_| format!("invalid {} header", USER_HEADER))?;
            Slug::new(raw.trim()).map_err(|e| format!("invalid user '{}': {}", raw, e))
        }
    }
}

/// Stream events as they arrive; the body ends after the terminal event.
fn ndjson(rx: EventReceiver) -> Response {
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((event.to_line().map_err(io::Error::other), rx))
    });

    ([(header::CONTENT_TYPE, NDJSON)], Body::from_stream(stream)).into_response()
}
