// ABOUTME: Protocol events streamed to the client as newline-delimited JSON.
// ABOUTME: EventSink guarantees ordered delivery and exactly one terminal event.

use crate::runtime::ContainerInfo;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::mpsc;

/// Sent when a sink is dropped before the pipeline produced an outcome.
pub const ABORTED: &str = "Deployment aborted unexpectedly.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Error,
}

/// One new instance as reported in the success event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSummary {
    #[serde(rename = "Id")]
    pub id: String,
    /// Container name with a leading `/`.
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Labels")]
    pub labels: BTreeMap<String, String>,
}

impl From<&ContainerInfo> for DeploymentSummary {
    fn from(info: &ContainerInfo) -> Self {
        Self {
            id: info.id.to_string(),
            name: format!("/{}", info.name.trim_start_matches('/')),
            labels: info
                .labels
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Event {
    Progress { message: String, level: Level },
    Success { deployments: Vec<DeploymentSummary> },
    Failure { message: String, log: Vec<String> },
}

impl Event {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Event::Progress { .. })
    }

    /// One NDJSON line, newline included.
    pub fn to_line(&self) -> Result<Bytes, serde_json::Error> {
        let mut buf = serde_json::to_vec(self)?;
        buf.push(b'\n');
        Ok(Bytes::from(buf))
    }
}

pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// Producer half of a request's event stream.
///
/// Progress methods borrow; `succeed` and `fail` consume the sink, so a
/// second terminal event cannot be expressed. Dropping the sink without
/// either emits a failure so the client never sees a stream without an
/// outcome.
#[derive(Debug)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<Event>>,
}

impl EventSink {
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn info(&self, message: impl Into<String>) {
        self.progress(Level::Info, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.progress(Level::Error, message.into());
    }

    pub fn succeed(mut self, deployments: Vec<DeploymentSummary>) {
        self.terminal(Event::Success { deployments });
    }

    pub fn fail(mut self, message: impl Into<String>, log: Vec<String>) {
        self.terminal(Event::Failure {
            message: message.into(),
            log,
        });
    }

    fn progress(&self, level: Level, message: String) {
        if let Some(tx) = &self.tx
            && tx.send(Event::Progress { message, level }).is_err()
        {
            tracing::debug!("event receiver closed, dropping progress event");
        }
    }

    fn terminal(&mut self, event: Event) {
        if let Some(tx) = self.tx.take()
            && tx.send(event).is_err()
        {
            tracing::debug!("event receiver closed, dropping terminal event");
        }
    }
}

impl Drop for EventSink {
    fn drop(&mut self) {
        if self.tx.is_some() {
            tracing::warn!("event sink dropped without an outcome");
            self.terminal(Event::Failure {
                message: ABORTED.to_string(),
                log: Vec::new(),
            });
        }
    }
}
