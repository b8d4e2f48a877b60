//! Text Extraction Service collaborator.
//!
//! The service is opaque: artifact path in, plain text out (or a
//! structural error). The production implementation shells out to a
//! configured converter that writes the document's plain text to stdout;
//! tests substitute an in-memory implementation.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::process::Command;

use crate::config::{bound_diagnostic, ToolCommand};

use super::ExtractionError;

/// Plain-text view of a report artifact.
pub trait TextSource: Send + Sync {
    fn plain_text<'a>(
        &'a self,
        artifact: &'a Path,
    ) -> BoxFuture<'a, Result<String, ExtractionError>>;
}

/// Converter-backed text source: runs the configured tool and captures
/// its stdout as the document text.
pub struct CommandTextSource {
    command: ToolCommand,
    timeout: Duration,
}

impl CommandTextSource {
    pub fn new(command: ToolCommand, timeout: Duration) -> Self {
        Self { command, timeout }
    }

    async fn run(&self, artifact: &Path) -> Result<String, ExtractionError> {
        let args = self
            .command
            .render(&[("input", &artifact.to_string_lossy())]);

        tracing::debug!(tool = %self.command.program, artifact = %artifact.display(), "text extraction starting");

        let child = Command::new(&self.command.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExtractionError::Tool(format!("cannot start text converter: {e}")))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ExtractionError::Tool("text converter timed out".into()))?
            .map_err(|e| ExtractionError::Tool(format!("text converter failed: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::Tool(bound_diagnostic(&stderr)));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyDocument);
        }
        Ok(text)
    }
}

impl TextSource for CommandTextSource {
    fn plain_text<'a>(
        &'a self,
        artifact: &'a Path,
    ) -> BoxFuture<'a, Result<String, ExtractionError>> {
        Box::pin(self.run(artifact))
    }
}
