//! Deterministic result-file names.
//!
//! Every name is a pure function of `(dataset, mode, key)` and lives directly
//! in the results directory.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::command::CheckpointMode;
use crate::matrix::{Dataset, ExecutionMode};

/// Phase kinds that produce result files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Insert into an emptied directory.
    FreshInsert,
    /// Insert into an already populated directory.
    Insert,
    /// Query run.
    Query,
    /// Mixed read/write trial.
    Mixed,
    /// Checkpoint comparison insert.
    Checkpoint,
    /// Query run under the resource sampler.
    QueryResource,
}

impl Phase {
    /// Name used inside result file names.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::FreshInsert => "fresh-insert",
            Phase::Insert => "insert",
            Phase::Query => "query",
            Phase::Mixed => "mixed",
            Phase::Checkpoint => "checkpoint",
            Phase::QueryResource => "query-resource",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase-specific parameters that select one result file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResultKey {
    /// Fresh-insert stdout.
    FreshInsert,
    /// Re-insert stdout.
    Insert,
    /// Query stdout.
    Query {
        /// Query id.
        query: u32,
    },
    /// Mixed trial stdout.
    Mixed {
        /// Read/write ratio.
        ratio: f64,
        /// Fraction of the dataset's rows.
        size: f64,
    },
    /// Checkpoint comparison stdout.
    Checkpoint {
        /// Checkpoint mode of the run.
        mode: CheckpointMode,
    },
    /// Stderr of the diagnostic checkpoint run.
    CheckpointDiagnostics,
    /// Stdout of a resource-sampled query.
    QueryResourceOutput {
        /// Query id.
        query: u32,
    },
    /// CSV samples of a resource-sampled query.
    QueryResourceSamples {
        /// Query id.
        query: u32,
    },
}

impl ResultKey {
    /// Phase the key belongs to.
    pub fn phase(&self) -> Phase {
        match self {
            ResultKey::FreshInsert => Phase::FreshInsert,
            ResultKey::Insert => Phase::Insert,
            ResultKey::Query { .. } => Phase::Query,
            ResultKey::Mixed { .. } => Phase::Mixed,
            ResultKey::Checkpoint { .. } | ResultKey::CheckpointDiagnostics => Phase::Checkpoint,
            ResultKey::QueryResourceOutput { .. } | ResultKey::QueryResourceSamples { .. } => {
                Phase::QueryResource
            }
        }
    }
}

/// Label for `mode`: `hybrid` or `fulldb`, then `-bm`, then `-rand`.
pub fn mode_label(mode: ExecutionMode) -> String {
    let mut label = String::from(if mode.full_database { "fulldb" } else { "hybrid" });
    if mode.bitmap_only {
        label.push_str("-bm");
    }
    if mode.randomized_range {
        label.push_str("-rand");
    }
    label
}

/// Formats a fraction that always keeps its decimal point (`0.0`, `0.3`, `1.0`).
pub fn format_fraction(value: f64) -> String {
    format!("{value:?}")
}

/// Maps result keys to files in one directory.
#[derive(Debug, Clone)]
pub struct ResultNamer {
    dir: PathBuf,
}

impl ResultNamer {
    /// Creates a namer writing into `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Results directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Result path for `key`.
    pub fn path(&self, dataset: &Dataset, mode: ExecutionMode, key: ResultKey) -> PathBuf {
        self.dir.join(file_name(dataset, mode, key))
    }
}

/// Bare result file name for `key`.
///
/// Query-style names use the dataset's scale index, not its position; all
/// other names use the dataset name.
pub fn file_name(dataset: &Dataset, mode: ExecutionMode, key: ResultKey) -> String {
    let label = mode_label(mode);
    let phase = key.phase();
    let name = &dataset.name;
    let scale = dataset.scale;
    match key {
        ResultKey::FreshInsert | ResultKey::Insert => format!("{name}-{label}-{phase}.txt"),
        ResultKey::Query { query } => format!("s{scale}-q{query}-{label}-{phase}.txt"),
        ResultKey::Mixed { ratio, size } => format!(
            "{name}-{label}-{phase}-{}-{}.txt",
            format_fraction(ratio),
            format_fraction(size)
        ),
        ResultKey::Checkpoint { mode } => format!("{name}-{label}-{phase}-{}.txt", mode.as_str()),
        ResultKey::CheckpointDiagnostics => format!(
            "{name}-{label}-{phase}-{}.err",
            CheckpointMode::Print.as_str()
        ),
        ResultKey::QueryResourceOutput { query } => {
            format!("s{scale}-q{query}-{label}-{phase}.txt")
        }
        ResultKey::QueryResourceSamples { query } => {
            format!("s{scale}-q{query}-{label}-{phase}.csv")
        }
    }
}
