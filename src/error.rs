//! Error types for mirror construction.
//!
//! Two tiers exist. [`MirrorError`] aborts the whole run: the manifest could
//! not be fetched or parsed, the package selection could not be resolved, or
//! a planned path would escape the target directory. [`FileError`] describes
//! a single package archive that failed to download or verify; it is recorded
//! in the [`MirrorReport`](crate::mirror::MirrorReport) and the run continues.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::Epoch;

/// Result alias for fallible library operations.
pub type Result<T> = std::result::Result<T, MirrorError>;

/// A URL could not be retrieved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to retrieve {url}: {reason}")]
pub struct FetchError {
    pub url: String,
    pub reason: String,
}

impl FetchError {
    pub fn new(url: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors that abort a mirror build.
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("failed to retrieve {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("manifest syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("refusing unsafe download path (absolute or contains ..): {path}")]
    UnsafePath { path: String },

    #[error("the following package names were not recognized:\n\t{}", .0.join("\n\t"))]
    UnknownPackages(Vec<String>),

    #[error("malformed install data for {package} ({epoch}): '{value}'")]
    MalformedInstall {
        package: String,
        epoch: Epoch,
        value: String,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "mirror directory is locked by another build; if this is incorrect, delete '{}'",
        path.display()
    )]
    Locked { path: PathBuf },

    #[error("configuration error: {0}")]
    Config(String),
}

impl MirrorError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<FetchError> for MirrorError {
    fn from(e: FetchError) -> Self {
        Self::Fetch {
            url: e.url,
            reason: e.reason,
        }
    }
}

/// Per-file download or verification failure. Never fatal to the run.
#[derive(Error, Debug)]
pub enum FileError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("mismatched package size (expected {expected} bytes, got {actual})")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("{algorithm} checksum mismatch\n  expected: {expected}\n  got:      {actual}")]
    HashMismatch {
        algorithm: &'static str,
        expected: String,
        actual: String,
    },

    #[error("unrecognized checksum format: '{0}'")]
    UnsupportedHash(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
