//! Download planning
//!
//! Turns a resolved package list into the archive files to fetch, one per
//! package and configured epoch.

use crate::config::Epoch;
use crate::core::output;
use crate::error::{MirrorError, Result};
use crate::manifest::{InstallSpec, RepositoryIndex};
use crate::util::fs_utils;

/// One archive to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEntry {
    pub package: String,
    pub epoch: Epoch,
    /// Repository-relative path; never absolute
    pub path: String,
    pub size: u64,
    pub hash: String,
}

/// Ordered archive list plus the aggregate size
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadPlan {
    pub entries: Vec<DownloadEntry>,
    pub total_bytes: u64,
}

impl DownloadPlan {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check every planned path before anything touches the filesystem.
    pub fn validate_paths(&self) -> Result<()> {
        self.entries
            .iter()
            .try_for_each(|e| fs_utils::validate_safe_path(&e.path))
    }
}

/// Build the download plan for `packages`.
///
/// A package without `install` data for an epoch contributes nothing for
/// that epoch (meta packages commonly have none); this is reported as a
/// warning. Malformed `install` data is fatal.
pub fn plan<S: AsRef<str>>(
    index: &RepositoryIndex,
    packages: &[S],
    epochs: &[Epoch],
) -> Result<DownloadPlan> {
    let mut plan = DownloadPlan::default();

    for name in packages {
        let name = name.as_ref();
        let record = index
            .get(name)
            .ok_or_else(|| MirrorError::UnknownPackages(vec![name.to_string()]))?;

        for &epoch in epochs {
            let Some(value) = record.install(epoch) else {
                output::warning(&format!(
                    "cannot find package filename for {} in epoch {}",
                    name, epoch
                ));
                continue;
            };

            let spec = InstallSpec::parse(value).ok_or_else(|| MirrorError::MalformedInstall {
                package: name.to_string(),
                epoch,
                value: value.to_string(),
            })?;

            plan.total_bytes = plan.total_bytes.checked_add(spec.size).ok_or_else(|| {
                MirrorError::MalformedInstall {
                    package: name.to_string(),
                    epoch,
                    value: value.to_string(),
                }
            })?;
            plan.entries.push(DownloadEntry {
                package: name.to_string(),
                epoch,
                path: spec.path,
                size: spec.size,
                hash: spec.hash,
            });
        }
    }

    Ok(plan)
}
