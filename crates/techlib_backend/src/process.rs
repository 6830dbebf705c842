//! External tool invocation.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use techlib_common::SynthesisFailure;
use tokio::process::Command;
use tracing::debug;

/// What a finished tool run left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub status: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl ToolOutput {
    /// Returns `true` if the tool exited with status 0.
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs `program` with `args` inside `dir`, capturing its output.
///
/// The child is killed if it outlives `timeout` or if the returned future
/// is dropped.
pub async fn run_tool(
    unit: &str,
    program: &str,
    args: &[String],
    dir: &Path,
    timeout: Duration,
) -> Result<ToolOutput, SynthesisFailure> {
    debug!(unit, program, ?args, dir = %dir.display(), "spawning synthesis tool");

    let child = Command::new(program)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| SynthesisFailure::Spawn {
            unit: unit.to_string(),
            source,
        })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|source| SynthesisFailure::Spawn {
            unit: unit.to_string(),
            source,
        })?,
        Err(_) => {
            return Err(SynthesisFailure::Timeout {
                unit: unit.to_string(),
                seconds: timeout.as_secs(),
            })
        }
    };

    Ok(ToolOutput {
        status: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
