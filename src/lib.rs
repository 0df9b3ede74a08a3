//! Partial, offline-installable mirror builder for Cygwin-style repositories
//!
//! A run reads the repository manifest (`setup.ini`), expands a requested
//! package selection into its full dependency closure, and reproduces a
//! minimal copy of the repository on local storage:
//!
//! ```text
//! <target>/
//!   setup.ini        regenerated manifest (selected packages only)
//!   setup.bz2        bzip2 copy of setup.ini
//!   setup.exe        installer
//!   md5.sum          checksums of the three files above
//!   release/...      package archives, verified by size and hash
//! ```
//!
//! # Pipeline
//!
//! 1. [`manifest::fetch_index`] - fetch and parse the manifest
//! 2. [`resolver::resolve`] - dependency closure over the selected epochs
//! 3. [`planner::plan`] - archive list with sizes and hashes
//! 4. [`mirror::MirrorAssembler`] - write the tree, fetch and verify archives
//!
//! [`run`] drives the whole pipeline from a [`MirrorConfig`].
//!
//! # Example
//!
//! ```no_run
//! use cygmirror::{MirrorConfig, RunOutcome, UrlFetcher};
//!
//! let mut config = MirrorConfig::default().with_target_dir("/srv/cygwin");
//! config.seeds = Some(vec!["bash".to_string(), "make".to_string()]);
//!
//! match cygmirror::run(&config, &UrlFetcher::default())? {
//!     RunOutcome::Built(report) => println!("{} archives fetched", report.fetched_count()),
//!     RunOutcome::DryRun { plan, .. } => println!("{} bytes to fetch", plan.total_bytes),
//! }
//! # Ok::<(), cygmirror::MirrorError>(())
//! ```

pub mod categories;
pub mod config;
pub mod core;
pub mod error;
pub mod fetch;
pub mod manifest;
pub mod mirror;
pub mod pkglist;
pub mod planner;
pub mod resolver;
pub mod util;

pub use config::{Epoch, MirrorConfig};
pub use crate::core::output;
pub use error::{FetchError, FileError, MirrorError, Result};
pub use fetch::{Fetcher, UrlFetcher};
pub use manifest::{PackageRecord, RepositoryIndex};
pub use mirror::{MirrorAssembler, MirrorReport};
pub use planner::DownloadPlan;

/// What [`run`] did
#[derive(Debug)]
pub enum RunOutcome {
    /// Nothing was written; the resolved packages and the plan that would run
    DryRun {
        packages: Vec<String>,
        plan: DownloadPlan,
    },
    /// The mirror was assembled
    Built(MirrorReport),
}

/// Build (or, in dry-run mode, plan) a mirror for `config`.
pub fn run(config: &MirrorConfig, fetcher: &dyn Fetcher) -> Result<RunOutcome> {
    let manifest_url = config.manifest_url();
    output::action(&format!("Reading manifest {}", manifest_url));
    let index = manifest::fetch_index(fetcher, &manifest_url)?;
    output::detail(&format!("{} packages in manifest", index.len()));

    let packages = resolver::resolve(
        &index,
        config.seeds.as_deref(),
        config.include_all,
        &config.epochs,
    )?;
    output::info(&format!("{} packages selected after dependency resolution", packages.len()));

    if config.dry_run {
        let plan = planner::plan(&index, &packages, &config.epochs)?;
        plan.validate_paths()?;
        output::info(&format!(
            "Download size: {} ({} files)",
            output::format_size(plan.total_bytes),
            plan.len()
        ));
        output::info(&format!("Packages: {}", packages.join(" ")));
        return Ok(RunOutcome::DryRun { packages, plan });
    }

    let report = MirrorAssembler::new(config, fetcher).build(&index, &packages)?;
    Ok(RunOutcome::Built(report))
}
