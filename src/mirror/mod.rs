//! Mirror assembly
//!
//! Turns a resolved package list into a self-consistent directory tree:
//!
//! 1. plan downloads, validate every path, render the manifest
//!    (all before any filesystem mutation)
//! 2. create the target directory and take its lock
//! 3. write `setup.ini` and `setup.bz2`
//! 4. fetch the installer; failure here aborts the build
//! 5. write the `md5.sum` ledger for the three top-level artifacts
//! 6. fetch and verify each planned archive; failures are recorded per file
//!
//! Re-running against an existing tree skips archives already present with
//! the expected size.

pub mod ledger;

use bzip2::Compression;
use bzip2::write::BzEncoder;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::{COMPRESSED_MANIFEST_NAME, INSTALLER_NAME, MANIFEST_NAME, MirrorConfig};
use crate::core::{lock, output};
use crate::error::{FileError, MirrorError, Result};
use crate::fetch::Fetcher;
use crate::manifest::{RepositoryIndex, render_manifest};
use crate::planner::{self, DownloadEntry, DownloadPlan};
use crate::util::{fs_utils, hash};

/// What happened to one planned archive
#[derive(Debug)]
pub enum FileOutcome {
    Fetched,
    AlreadyPresent,
    Failed(FileError),
}

/// Outcome for one planned archive
#[derive(Debug)]
pub struct FileReport {
    pub entry: DownloadEntry,
    pub outcome: FileOutcome,
}

/// Result of a mirror build
#[derive(Debug, Default)]
pub struct MirrorReport {
    pub target_dir: PathBuf,
    pub packages: Vec<String>,
    pub files: Vec<FileReport>,
    pub planned_bytes: u64,
    pub fetched_bytes: u64,
}

impl MirrorReport {
    pub fn failures(&self) -> impl Iterator<Item = (&DownloadEntry, &FileError)> {
        self.files.iter().filter_map(|f| match &f.outcome {
            FileOutcome::Failed(e) => Some((&f.entry, e)),
            _ => None,
        })
    }

    pub fn fetched_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Fetched))
            .count()
    }

    pub fn present_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::AlreadyPresent))
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Seconds since the Unix epoch
pub fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Builds a mirror tree for one configuration
pub struct MirrorAssembler<'a> {
    config: &'a MirrorConfig,
    fetcher: &'a dyn Fetcher,
    timestamp: Option<u64>,
}

impl<'a> MirrorAssembler<'a> {
    pub fn new(config: &'a MirrorConfig, fetcher: &'a dyn Fetcher) -> Self {
        Self {
            config,
            fetcher,
            timestamp: None,
        }
    }

    /// Fix the manifest generation timestamp instead of using the clock.
    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Assemble the mirror for `packages` (normally the resolver's output).
    ///
    /// Errors abort the build; per-archive problems are in the report.
    pub fn build<S: AsRef<str>>(&self, index: &RepositoryIndex, packages: &[S]) -> Result<MirrorReport> {
        let target = self.config.target_dir.as_path();

        let plan = planner::plan(index, packages, &self.config.epochs)?;
        plan.validate_paths()?;
        let timestamp = self.timestamp.unwrap_or_else(unix_timestamp);
        let manifest = render_manifest(index, packages, timestamp)?;

        std::fs::create_dir_all(target).map_err(|e| MirrorError::io(target, e))?;
        let _lock = lock::acquire_mirror_lock(target)?;

        self.write_manifests(target, &manifest)?;

        output::action(&format!("Fetching installer from {}", self.config.installer_url));
        self.fetcher
            .fetch_to_file(&self.config.installer_url, &target.join(INSTALLER_NAME))?;

        ledger::write_ledger(target)?;

        output::info(&format!(
            "Download size: {} from {}",
            output::format_size(plan.total_bytes),
            self.config.mirror_url
        ));

        let mut report = MirrorReport {
            target_dir: target.to_path_buf(),
            packages: packages.iter().map(|p| p.as_ref().to_string()).collect(),
            planned_bytes: plan.total_bytes,
            ..Default::default()
        };
        self.fetch_all(target, plan, &mut report);

        Ok(report)
    }

    fn write_manifests(&self, target: &Path, manifest: &str) -> Result<()> {
        let manifest_path = target.join(MANIFEST_NAME);
        std::fs::write(&manifest_path, manifest).map_err(|e| MirrorError::io(&manifest_path, e))?;

        let compressed_path = target.join(COMPRESSED_MANIFEST_NAME);
        let file = std::fs::File::create(&compressed_path)
            .map_err(|e| MirrorError::io(&compressed_path, e))?;
        let mut encoder = BzEncoder::new(file, Compression::best());
        encoder
            .write_all(manifest.as_bytes())
            .and_then(|_| encoder.finish())
            .map_err(|e| MirrorError::io(&compressed_path, e))?;
        Ok(())
    }

    fn fetch_all(&self, target: &Path, plan: DownloadPlan, report: &mut MirrorReport) {
        let total = plan.len();
        for (i, entry) in plan.entries.into_iter().enumerate() {
            let name = entry.path.rsplit('/').next().unwrap_or(&entry.path).to_string();
            let outcome = self.fetch_entry(target, &entry);

            match &outcome {
                FileOutcome::AlreadyPresent => {
                    output::skip(&format!("{} already present, skipping", name));
                }
                FileOutcome::Fetched => {
                    report.fetched_bytes += entry.size;
                    output::action_numbered(
                        i + 1,
                        total,
                        &format!("{} ({})", name, output::format_size(entry.size)),
                    );
                }
                FileOutcome::Failed(e) => output::file_failed(&name, &e.to_string()),
            }

            report.files.push(FileReport { entry, outcome });
        }
    }

    /// Fetch and verify a single archive. The file is left in place on a
    /// verification failure so it can be inspected.
    fn fetch_entry(&self, target: &Path, entry: &DownloadEntry) -> FileOutcome {
        let dest = target.join(&entry.path);

        if let Err(e) = fs_utils::ensure_parent_dir(&dest) {
            return FileOutcome::Failed(FileError::Io(e));
        }
        if fs_utils::file_size(&dest) == Some(entry.size) {
            return FileOutcome::AlreadyPresent;
        }

        let url = self.config.archive_url(&entry.path);
        match self.fetch_and_verify(&url, &dest, entry) {
            Ok(()) => FileOutcome::Fetched,
            Err(e) => FileOutcome::Failed(e),
        }
    }

    fn fetch_and_verify(&self, url: &str, dest: &Path, entry: &DownloadEntry) -> std::result::Result<(), FileError> {
        self.fetcher.fetch_to_file(url, dest)?;

        let actual = std::fs::metadata(dest)?.len();
        if actual != entry.size {
            return Err(FileError::SizeMismatch {
                expected: entry.size,
                actual,
            });
        }

        hash::verify_file_hash(dest, &entry.hash)
    }
}
