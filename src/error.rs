use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;

/// Failures that stop the driver.
///
/// A child exiting with a non-zero code is not represented here; it is carried
/// as an exit code in [`crate::invoke::PhaseResult`] and handled by the phase
/// policy instead.
#[derive(Debug, Error)]
pub enum DriverError {
    /// A directory could not be created.
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        /// Directory being created.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// A directory could not be removed.
    #[error("failed to remove directory {path}: {source}")]
    RemoveDir {
        /// Directory being removed.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// A recursive copy failed part way.
    #[error("failed to copy {from} into {to}: {source}")]
    Copy {
        /// Copy source.
        from: PathBuf,
        /// Copy destination.
        to: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// A restore was attempted from a backup that was never taken.
    #[error("backup directory {0} does not exist")]
    MissingBackup(PathBuf),
    /// A result file could not be created or truncated.
    #[error("failed to open result file {path}: {source}")]
    OutputFile {
        /// Result file path.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// The benchmark executable could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// Waiting on a running child failed.
    #[error("failed to wait on {program}: {source}")]
    Wait {
        /// Program being waited on.
        program: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// Writing a resource sample row failed.
    #[error("failed to write resource samples: {0}")]
    Sample(#[from] csv::Error),
    /// Writing the run manifest failed.
    #[error("failed to serialize run manifest: {0}")]
    Manifest(#[from] serde_json::Error),
    /// The log subscriber could not be installed.
    #[error("logging setup failed: {0}")]
    Logging(String),
    /// Invalid or unreadable configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Other I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl DriverError {
    pub(crate) fn create_dir(path: impl AsRef<Path>, source: io::Error) -> Self {
        DriverError::CreateDir {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn remove_dir(path: impl AsRef<Path>, source: io::Error) -> Self {
        DriverError::RemoveDir {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn output_file(path: impl AsRef<Path>, source: io::Error) -> Self {
        DriverError::OutputFile {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
