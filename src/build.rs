// ABOUTME: Image builder: runs one planned build, forwarding each log line as it arrives.
// ABOUTME: A failed build yields BuildError with the full ordered log.

use crate::events::EventSink;
use crate::project::BuildPlanEntry;
use crate::runtime::{BuildOutput, ImageOps};
use crate::types::ImageRef;
use futures::StreamExt;

pub const BUILD_FAILED: &str = "Build failed! See build log for details.";

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct BuildError {
    pub message: String,
    /// Every line seen, in order; the last one is the runtime's failure line.
    pub log: Vec<String>,
}

impl BuildError {
    fn new(log: Vec<String>) -> Self {
        Self {
            message: BUILD_FAILED.to_string(),
            log,
        }
    }
}

/// Build one image and return its tag.
pub async fn build<R>(
    runtime: &R,
    entry: &BuildPlanEntry,
    sink: &EventSink,
) -> Result<ImageRef, BuildError>
where
    R: ImageOps + ?Sized,
{
    let request = &entry.request;
    tracing::info!(
        deployment = %entry.identity,
        tag = %request.tag,
        context = %request.context.display(),
        "building image"
    );

    let mut log = Vec::new();
    let mut stream = match runtime.build_image(request).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(tag = %request.tag, error = %e, "build could not start");
            let line = e.to_string();
            sink.error(line.clone());
            log.push(line);
            return Err(BuildError::new(log));
        }
    };

    while let Some(item) = stream.next().await {
        match item {
            Ok(BuildOutput::Line(line)) => {
                sink.info(line.clone());
                log.push(line);
            }
            Ok(BuildOutput::Failed(line)) => {
                tracing::warn!(tag = %request.tag, reason = %line, "build failed");
                sink.error(line.clone());
                log.push(line);
                return Err(BuildError::new(log));
            }
            Err(e) => {
                tracing::warn!(tag = %request.tag, error = %e, "build stream failed");
                let line = e.to_string();
                sink.error(line.clone());
                log.push(line);
                return Err(BuildError::new(log));
            }
        }
    }

    tracing::debug!(tag = %request.tag, lines = log.len(), "build finished");
    Ok(request.tag.clone())
}
