//! Blocking child-process invocation with captured output.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use serde::Serialize;
use tracing::debug;

use crate::command::BenchCommand;
use crate::error::{DriverError, Result};

/// Outcome of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseResult {
    /// Child exit code; `-signal` when the child was killed.
    pub exit_code: i32,
    /// File that received the child's stdout.
    pub output_path: PathBuf,
}

impl PhaseResult {
    /// Whether the child exited with code zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Where an invocation's output streams go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    /// Receives stdout; created or truncated.
    pub stdout: PathBuf,
    /// Receives stderr when set; otherwise stderr is inherited.
    pub stderr: Option<PathBuf>,
}

impl OutputTarget {
    /// Captures stdout only.
    pub fn stdout(path: impl Into<PathBuf>) -> Self {
        Self {
            stdout: path.into(),
            stderr: None,
        }
    }

    /// Captures stderr into `path` as well.
    pub fn with_stderr(mut self, path: impl Into<PathBuf>) -> Self {
        self.stderr = Some(path.into());
        self
    }
}

/// Runs `command` to completion with stdout (and optionally stderr) redirected
/// into `target`.
///
/// A non-zero exit is reported through [`PhaseResult::exit_code`], never as an
/// error. Errors mean the output files could not be opened or the child could
/// not be started or waited on. The output files are closed on every path.
pub fn invoke(command: &BenchCommand, target: &OutputTarget) -> Result<PhaseResult> {
    let stdout = create_output(&target.stdout)?;
    let mut child_cmd = command.to_command();
    child_cmd.stdout(Stdio::from(stdout));
    if let Some(path) = &target.stderr {
        child_cmd.stderr(Stdio::from(create_output(path)?));
    }
    debug!(command = %command, output = %target.stdout.display(), "spawning");
    let status = child_cmd.status().map_err(|source| DriverError::Spawn {
        program: command.program().to_path_buf(),
        source,
    })?;
    Ok(PhaseResult {
        exit_code: exit_code(status),
        output_path: target.stdout.clone(),
    })
}

pub(crate) fn create_output(path: &Path) -> Result<File> {
    File::create(path).map_err(|err| DriverError::output_file(path, err))
}

/// Numeric exit code, with signal terminations reported as `-signal`.
pub(crate) fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}
