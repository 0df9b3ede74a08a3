//! Dependency closure
//!
//! Expands a requested package set into everything needed for a working
//! installation by following `requires` edges for the configured epochs.
//! There is no version negotiation: a name either is in the manifest or it
//! is not.

use std::collections::BTreeSet;

use crate::config::Epoch;
use crate::core::output;
use crate::error::{MirrorError, Result};
use crate::manifest::{BOOTSTRAP_PACKAGES, PackageKind, RepositoryIndex};

/// Compute the seed set for a resolution.
///
/// `include_all` overrides `seeds` and selects every non-reserved package;
/// with neither, the bootstrap set is used.
pub fn seed_names(index: &RepositoryIndex, seeds: Option<&[String]>, include_all: bool) -> Vec<String> {
    if include_all {
        let mut names: Vec<String> = index
            .packages()
            .values()
            .filter(|record| record.kind() == PackageKind::Normal)
            .map(|record| record.name().to_string())
            .collect();
        names.sort_unstable();
        return names;
    }
    match seeds {
        Some(seeds) => seeds.to_vec(),
        None => BOOTSTRAP_PACKAGES.iter().map(|s| s.to_string()).collect(),
    }
}

/// Resolve the transitive closure of the seed set.
///
/// Returns the closure sorted by name. If any seed or required package is
/// missing from the index, fails with [`MirrorError::UnknownPackages`]
/// listing all of them; a partial set is never returned.
pub fn resolve(
    index: &RepositoryIndex,
    seeds: Option<&[String]>,
    include_all: bool,
    epochs: &[Epoch],
) -> Result<Vec<String>> {
    let mut pending: BTreeSet<String> = seed_names(index, seeds, include_all).into_iter().collect();
    let mut resolved: BTreeSet<String> = BTreeSet::new();
    let mut unknown: BTreeSet<String> = BTreeSet::new();

    while let Some(name) = pending.pop_first() {
        resolved.insert(name.clone());

        let Some(record) = index.get(&name) else {
            unknown.insert(name);
            continue;
        };

        for &epoch in epochs {
            match record.requires(epoch) {
                Some(requires) => {
                    for dep in requires {
                        if !resolved.contains(dep) {
                            pending.insert(dep.to_string());
                        }
                    }
                }
                None => output::debug(&format!("no requires for {} in epoch {}", name, epoch)),
            }
        }
    }

    if !unknown.is_empty() {
        return Err(MirrorError::UnknownPackages(unknown.into_iter().collect()));
    }

    Ok(resolved.into_iter().collect())
}
