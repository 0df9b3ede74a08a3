//! Mirror directory lock
//!
//! Two builds writing into the same target directory would race on the same
//! archives and the checksum ledger, so assembly holds an exclusive lock.
//!
//! The lock file itself stays in the target directory. Ownership is the
//! `flock` on it, which the kernel drops when the holding process exits, so
//! a crashed build never leaves a stale lock behind. The file's age says
//! nothing about whether it is held.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::{MirrorError, Result};

/// Lock file name inside the target directory
pub const LOCK_NAME: &str = ".cygmirror.lock";

/// Acquire an exclusive lock on a mirror directory.
/// Returns a guard that releases the lock when dropped.
pub fn acquire_mirror_lock(target_dir: &Path) -> Result<MirrorLock> {
    let lock_path = target_dir.join(LOCK_NAME);

    // Never truncate or replace: another process may hold this inode.
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|e| MirrorError::io(&lock_path, e))?;

    if lock_file.try_lock_exclusive().is_err() {
        return Err(MirrorError::Locked { path: lock_path });
    }

    Ok(MirrorLock {
        file: lock_file,
        path: lock_path,
    })
}

/// RAII guard for the mirror lock
#[derive(Debug)]
pub struct MirrorLock {
    file: File,
    path: PathBuf,
}

impl MirrorLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for MirrorLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
