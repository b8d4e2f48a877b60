//! External-task runner: one subprocess, one timeout, one typed result.
//!
//! This is the trust boundary around collaborator tools: callers get a
//! structured success or a `TaskError`, never raw scraping of whatever
//! the subprocess printed. Diagnostics are size-bounded before surfacing.

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

use crate::config::bound_diagnostic;

/// Captured output of a successfully exited task.
#[derive(Debug)]
pub struct TaskOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("cannot start {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("exited with status {status}: {diagnostic}")]
    NonZeroExit { status: i32, diagnostic: String },

    #[error("timed out after {secs}s")]
    TimedOut { secs: u64 },
}

/// Run one external tool to completion, bounded by `timeout`.
///
/// On expiry the future is abandoned and the child is killed
/// (`kill_on_drop`); partial output is discarded.
pub async fn run_tool(
    program: &str,
    args: &[String],
    timeout: Duration,
) -> Result<TaskOutput, TaskError> {
    tracing::debug!(program, ?args, "external task starting");

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| TaskError::Spawn {
            program: program.to_string(),
            reason: e.to_string(),
        })?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| TaskError::TimedOut {
            secs: timeout.as_secs(),
        })?
        .map_err(|e| TaskError::Spawn {
            program: program.to_string(),
            reason: e.to_string(),
        })?;

    let stderr = bound_diagnostic(&String::from_utf8_lossy(&output.stderr));

    if !output.status.success() {
        let status = output.status.code().unwrap_or(-1);
        tracing::warn!(program, status, "external task failed");
        return Err(TaskError::NonZeroExit {
            status,
            diagnostic: stderr,
        });
    }

    Ok(TaskOutput {
        stdout: bound_diagnostic(&String::from_utf8_lossy(&output.stdout)),
        stderr,
    })
}
