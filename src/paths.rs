//! Working-directory layout and lifecycle.
//!
//! Paths are pure functions of `(dataset, mode)`. The lifecycle helpers move a
//! directory between three states: absent, populated, and populated with a
//! `_backup` sibling snapshot.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{DriverError, Result};
use crate::matrix::{Dataset, ExecutionMode};

const BACKUP_SUFFIX: &str = "_backup";
const MIXED_SUFFIX: &str = "-mixed";
const CHECKPOINT_SUFFIX: &str = "-checkpoint";
const PARTIAL_SUFFIX: &str = ".partial";

/// Computes working-directory paths under a fixed root.
#[derive(Debug, Clone)]
pub struct PathManager {
    root: PathBuf,
}

impl PathManager {
    /// Creates a manager rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Parent of every managed directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory the executable uses as `-r` for `dataset` under `mode`.
    pub fn working_dir(&self, dataset: &Dataset, mode: ExecutionMode) -> PathBuf {
        self.root
            .join(format!("{}{}", dataset.name, dir_suffix(mode)))
    }

    /// Directory the mixed trials run in. Always derived from the bitmap-only
    /// working directory, since that is where their snapshot comes from.
    pub fn mixed_dir(&self, dataset: &Dataset, mode: ExecutionMode) -> PathBuf {
        suffixed(&self.working_dir(dataset, mode.with_bitmap_only(true)), MIXED_SUFFIX)
    }

    /// Directory the checkpoint comparison inserts into.
    pub fn checkpoint_dir(&self, dataset: &Dataset, mode: ExecutionMode) -> PathBuf {
        suffixed(&self.working_dir(dataset, mode), CHECKPOINT_SUFFIX)
    }
}

/// Directory-name suffix for `mode`: `-full` then `-bm`.
///
/// Randomized ranges only affect queries, never the on-disk layout.
pub fn dir_suffix(mode: ExecutionMode) -> String {
    let mut suffix = String::new();
    if mode.full_database {
        suffix.push_str("-full");
    }
    if mode.bitmap_only {
        suffix.push_str("-bm");
    }
    suffix
}

/// Snapshot location for `working`.
pub fn backup_path(working: &Path) -> PathBuf {
    suffixed(working, BACKUP_SUFFIX)
}

fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(suffix);
    PathBuf::from(raw)
}

/// Creates `path` and any missing parents; an existing directory is fine.
pub fn create_dir(path: &Path) -> Result<()> {
    match fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(err) => Err(DriverError::create_dir(path, err)),
    }
}

/// Leaves `path` as an existing, empty directory.
pub fn ensure_empty(path: &Path) -> Result<()> {
    if path.exists() {
        debug!(path = %path.display(), "clearing working directory");
        fs::remove_dir_all(path).map_err(|err| DriverError::remove_dir(path, err))?;
    }
    create_dir(path)
}

/// Snapshots `working` into its backup path unless a snapshot already exists.
///
/// An existing backup is never overwritten, so the snapshot always reflects the
/// first successful call. The copy is staged in a `.partial` sibling and only
/// renamed into place once complete; a failed copy leaves no backup behind.
pub fn ensure_backup(working: &Path) -> Result<PathBuf> {
    let backup = backup_path(working);
    if backup.exists() {
        debug!(backup = %backup.display(), "backup already present");
        return Ok(backup);
    }
    if !working.is_dir() {
        return Err(DriverError::Copy {
            from: working.to_path_buf(),
            to: backup,
            source: io::Error::new(io::ErrorKind::NotFound, "working directory does not exist"),
        });
    }
    let partial = suffixed(&backup, PARTIAL_SUFFIX);
    if partial.exists() {
        debug!(partial = %partial.display(), "discarding incomplete backup");
        fs::remove_dir_all(&partial).map_err(|err| DriverError::remove_dir(&partial, err))?;
    }
    let bytes = match copy_dir_all(working, &partial) {
        Ok(bytes) => bytes,
        Err(err) => {
            let _ = fs::remove_dir_all(&partial);
            return Err(err);
        }
    };
    fs::rename(&partial, &backup).map_err(|source| DriverError::Copy {
        from: partial.clone(),
        to: backup.clone(),
        source,
    })?;
    info!(
        working = %working.display(),
        backup = %backup.display(),
        bytes,
        "backed up working directory"
    );
    Ok(backup)
}

/// Replaces `target` with a fresh copy of `backup`.
pub fn restore_from_backup(target: &Path, backup: &Path) -> Result<()> {
    if !backup.is_dir() {
        return Err(DriverError::MissingBackup(backup.to_path_buf()));
    }
    if target.exists() {
        fs::remove_dir_all(target).map_err(|err| DriverError::remove_dir(target, err))?;
    }
    let bytes = copy_dir_all(backup, target)?;
    debug!(
        target = %target.display(),
        backup = %backup.display(),
        bytes,
        "restored from backup"
    );
    Ok(())
}

/// Recursively copies `from` into `to`, returning the bytes copied.
///
/// Symlinks are recreated as links rather than followed.
fn copy_dir_all(from: &Path, to: &Path) -> Result<u64> {
    let copy_err = |source: io::Error| DriverError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };
    let mut bytes = 0u64;
    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(|err| copy_err(err.into()))?;
        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        let dest = to.join(relative);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&dest).map_err(copy_err)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &dest).map_err(copy_err)?;
        } else {
            bytes += fs::copy(entry.path(), &dest).map_err(copy_err)?;
        }
    }
    Ok(bytes)
}

#[cfg(unix)]
fn copy_symlink(link: &Path, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(link)?, dest)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, dest: &Path) -> io::Result<()> {
    fs::copy(link, dest).map(|_| ())
}
