//! Checksum ledger for the top-level mirror artifacts
//!
//! Format is one `"<md5>  <file name>"` line per artifact, the same layout
//! `md5sum -c` accepts.

use std::fmt::Write as _;
use std::path::Path;

use crate::config::{COMPRESSED_MANIFEST_NAME, INSTALLER_NAME, LEDGER_NAME, MANIFEST_NAME};
use crate::error::{MirrorError, Result};
use crate::util::hash::{self, HashAlgorithm};

/// Artifacts covered by the ledger, in ledger order
pub const LEDGER_FILES: [&str; 3] = [MANIFEST_NAME, COMPRESSED_MANIFEST_NAME, INSTALLER_NAME];

/// One ledger line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub hash: String,
    pub file: String,
}

/// Hash the top-level artifacts in `target_dir` and write the ledger.
///
/// Must only be called once every covered artifact is complete.
pub fn write_ledger(target_dir: &Path) -> Result<Vec<LedgerEntry>> {
    let mut entries = Vec::with_capacity(LEDGER_FILES.len());
    for name in LEDGER_FILES {
        let path = target_dir.join(name);
        let hash = hash::hash_file(&path, HashAlgorithm::Md5).map_err(|e| MirrorError::io(&path, e))?;
        entries.push(LedgerEntry {
            hash,
            file: name.to_string(),
        });
    }

    let mut content = String::new();
    for entry in &entries {
        let _ = writeln!(content, "{}  {}", entry.hash, entry.file);
    }

    let ledger_path = target_dir.join(LEDGER_NAME);
    std::fs::write(&ledger_path, content).map_err(|e| MirrorError::io(&ledger_path, e))?;
    Ok(entries)
}
