// ABOUTME: Test support utilities.
// ABOUTME: Tracing setup, fixture packing, event collection and the in-memory runtime.

use std::path::{Path, PathBuf};
use std::sync::Once;

use bytes::Bytes;
use exoframe::config::ServerConfig;
use exoframe::events::{Event, EventReceiver};

// Each test binary only uses some of these helpers, so allow dead_code.
#[allow(dead_code)]
pub mod fake_runtime;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("exoframe=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Path of a directory under tests/fixtures.
#[allow(dead_code)]
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Tar a fixture the way a client uploads it: entries relative to the project root.
#[allow(dead_code)]
pub fn pack_fixture(name: &str) -> Bytes {
    let mut builder = tar::Builder::new(Vec::new());
    builder.append_dir_all(".", fixture(name)).unwrap();
    Bytes::from(builder.into_inner().unwrap())
}

/// Server config used by most tests: defaults plus a `static` template.
#[allow(dead_code)]
pub fn test_config() -> ServerConfig {
    ServerConfig::from_yaml(
        r#"
default_restart: "no"
templates:
  static:
    display_name: Static HTML
    dockerfile: |
      FROM nginx:latest
      COPY . /usr/share/nginx/html
"#,
    )
    .unwrap()
}

/// Drain a receiver until the sender side is gone.
#[allow(dead_code)]
pub async fn collect(mut rx: EventReceiver) -> Vec<Event> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

/// Parse an NDJSON body into events.
#[allow(dead_code)]
pub fn parse_ndjson(body: &[u8]) -> Vec<Event> {
    std::str::from_utf8(body)
        .unwrap()
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

/// Messages of all progress events, in order.
#[allow(dead_code)]
pub fn progress_messages(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Progress { message, .. } => Some(message.clone()),
            _ => None,
        })
        .collect()
}
