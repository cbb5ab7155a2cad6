//! Argument lists for the benchmark executable.
//!
//! Every argument is pushed as its own element; nothing is ever joined into a
//! string and split again, so paths containing spaces survive intact.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;

use crate::matrix::ExecutionMode;
use crate::naming::format_fraction;

/// Workload kind selected with `-w`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Workload {
    /// Ingest a dataset.
    Insert,
    /// Run a query.
    Query,
    /// Interleave reads and writes.
    Mixed,
}

impl Workload {
    /// Value passed to `-w`.
    pub fn as_str(self) -> &'static str {
        match self {
            Workload::Insert => "insert",
            Workload::Query => "query",
            Workload::Mixed => "mixed",
        }
    }
}

/// Checkpoint behavior selected with `-c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointMode {
    /// No checkpoints.
    Disabled,
    /// Checkpoints enabled, diagnostics printed to stderr.
    Print,
}

impl CheckpointMode {
    /// Value passed to `-c`.
    pub fn as_str(self) -> &'static str {
        match self {
            CheckpointMode::Disabled => "disabled",
            CheckpointMode::Print => "print",
        }
    }
}

/// One invocation of the benchmark executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl BenchCommand {
    /// Starts a command with `-w <workload> -r <root>`.
    pub fn new(program: impl Into<PathBuf>, workload: Workload, root: &Path) -> Self {
        let mut cmd = Self {
            program: program.into(),
            args: Vec::new(),
        };
        cmd.push_pair("-w", workload.as_str());
        cmd.push_pair("-r", root);
        cmd
    }

    /// Source dataset file (`-d`).
    pub fn dataset(mut self, path: &Path) -> Self {
        self.push_pair("-d", path);
        self
    }

    /// Query id (`-q`).
    pub fn query(mut self, id: u32) -> Self {
        self.push_pair("-q", id.to_string());
        self
    }

    /// Dataset scale index (`-g`).
    pub fn group(mut self, scale: u32) -> Self {
        self.push_pair("-g", scale.to_string());
        self
    }

    /// Mixed-workload shape (`-a`).
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.push_pair("-a", format_fraction(alpha));
        self
    }

    /// Mixed-workload target row count (`-s`).
    pub fn rows(mut self, rows: u64) -> Self {
        self.push_pair("-s", rows.to_string());
        self
    }

    /// Mixed-workload ratio (`-t`).
    pub fn ratio(mut self, ratio: f64) -> Self {
        self.push_pair("-t", format_fraction(ratio));
        self
    }

    /// Checkpoint mode (`-c`).
    pub fn checkpoint(mut self, mode: CheckpointMode) -> Self {
        self.push_pair("-c", mode.as_str());
        self
    }

    /// Worker count (`-k`).
    pub fn concurrency(mut self, workers: u32) -> Self {
        self.push_pair("-k", workers.to_string());
        self
    }

    /// Adds `-p` when `on`.
    pub fn extra_mixed(mut self, on: bool) -> Self {
        if on {
            self.args.push("-p".into());
        }
        self
    }

    /// Appends `-f`, `-b`, `-m` as enabled in `mode`.
    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        if mode.full_database {
            self.args.push("-f".into());
        }
        if mode.bitmap_only {
            self.args.push("-b".into());
        }
        if mode.randomized_range {
            self.args.push("-m".into());
        }
        self
    }

    /// Executable path.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Ordered argument list.
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Value following `flag`, if present.
    pub fn value_of(&self, flag: &str) -> Option<&OsStr> {
        self.args
            .iter()
            .position(|arg| arg == flag)
            .and_then(|idx| self.args.get(idx + 1))
            .map(OsString::as_os_str)
    }

    /// Whether `flag` appears anywhere in the argument list.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|arg| arg == flag)
    }

    /// A `std::process::Command` with program and arguments set.
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }

    fn push_pair(&mut self, flag: &str, value: impl AsRef<OsStr>) {
        self.args.push(flag.into());
        self.args.push(value.as_ref().to_owned());
    }
}

impl fmt::Display for BenchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}
