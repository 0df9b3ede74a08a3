//! Repository manifest model
//!
//! A manifest (`setup.ini`) is a line-oriented text file: a few top-level
//! header lines followed by one block per package.
//!
//! ```text
//! setup-timestamp: 1700000000
//! setup-version: 2.887
//!
//! @ bash
//! sdesc: "The GNU Bourne Again SHell"
//! category: Base Shells
//! requires: coreutils cygwin
//! install: release/bash/bash-4.4.tar.xz 1234567 5eb63bbbe01eeed093cb22bb8f5acdc3
//! [prev]
//! install: release/bash/bash-4.3.tar.xz 1200000 0f343b0931126a20f133d67c2b018a3b
//! ```
//!
//! Every attribute line is stored under `(attribute, epoch)`; the `[prev]`
//! marker switches the epoch for the lines that follow it.

mod parser;
mod writer;

pub use parser::{LineKind, ParseState, classify_line, parse_manifest};
pub use writer::{order_for_manifest, render_manifest};

use std::collections::{BTreeMap, HashMap};
use std::io::Read;

use crate::config::Epoch;
use crate::error::{MirrorError, Result};
use crate::fetch::Fetcher;

/// Prefix marking synthetic/meta packages (`_update-info-dir`, ...)
pub const RESERVED_PREFIX: char = '_';

/// Minimal package set for a functioning shell environment
pub const BOOTSTRAP_PACKAGES: &[&str] = &["bash", "bzip2", "coreutils", "gzip", "tar", "unzip", "zip"];

/// Key of a package field
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldKey {
    pub attribute: String,
    pub epoch: Epoch,
}

impl FieldKey {
    pub fn new(attribute: impl Into<String>, epoch: Epoch) -> Self {
        Self {
            attribute: attribute.into(),
            epoch,
        }
    }
}

/// Whether a package is an ordinary package or a reserved meta package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    Normal,
    Reserved,
}

impl PackageKind {
    pub fn of(name: &str) -> Self {
        if name.starts_with(RESERVED_PREFIX) {
            Self::Reserved
        } else {
            Self::Normal
        }
    }
}

/// One `@ name` block of the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    name: String,
    fields: HashMap<FieldKey, String>,
    raw_text: String,
}

impl PackageRecord {
    pub fn new(name: impl Into<String>, fields: HashMap<FieldKey, String>, raw_text: String) -> Self {
        Self {
            name: name.into(),
            fields,
            raw_text,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PackageKind {
        PackageKind::of(&self.name)
    }

    /// Verbatim text of the block, starting with its `@ name` line and
    /// ending with exactly one line terminator.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn field(&self, attribute: &str, epoch: Epoch) -> Option<&str> {
        self.fields
            .get(&FieldKey::new(attribute, epoch))
            .map(String::as_str)
    }

    /// Names listed in `requires` for an epoch, `None` when the field is absent.
    pub fn requires(&self, epoch: Epoch) -> Option<Vec<&str>> {
        self.field("requires", epoch)
            .map(|v| v.split_whitespace().collect())
    }

    /// Raw `install` value for an epoch.
    pub fn install(&self, epoch: Epoch) -> Option<&str> {
        self.field("install", epoch)
    }

    /// Categories declared for the current epoch.
    pub fn categories(&self) -> Vec<&str> {
        self.field("category", Epoch::Current)
            .map(|v| v.split_whitespace().collect())
            .unwrap_or_default()
    }
}

/// Archive reference from an `install` field: `path size hash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallSpec {
    pub path: String,
    pub size: u64,
    pub hash: String,
}

impl InstallSpec {
    /// Parse an `install` value. Returns `None` unless it holds exactly three
    /// tokens with an integer size.
    pub fn parse(value: &str) -> Option<Self> {
        let mut tokens = value.split_whitespace();
        let path = tokens.next()?;
        let size = tokens.next()?.parse().ok()?;
        let hash = tokens.next()?;
        if tokens.next().is_some() {
            return None;
        }
        Some(Self {
            path: path.to_string(),
            size,
            hash: hash.to_string(),
        })
    }
}

/// Parsed manifest: header values plus package records by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryIndex {
    header: BTreeMap<String, String>,
    packages: HashMap<String, PackageRecord>,
}

impl RepositoryIndex {
    pub fn new(header: BTreeMap<String, String>, packages: HashMap<String, PackageRecord>) -> Self {
        Self { header, packages }
    }

    /// Parse manifest text.
    pub fn parse(text: &str) -> Result<Self> {
        parse_manifest(text)
    }

    pub fn header(&self) -> &BTreeMap<String, String> {
        &self.header
    }

    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.header.get(key).map(String::as_str)
    }

    pub fn packages(&self) -> &HashMap<String, PackageRecord> {
        &self.packages
    }

    pub fn get(&self, name: &str) -> Option<&PackageRecord> {
        self.packages.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// All package names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.packages.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Fetch and parse the manifest at `url`.
///
/// A URL ending in `.bz2` is decompressed before parsing.
pub fn fetch_index(fetcher: &dyn Fetcher, url: &str) -> Result<RepositoryIndex> {
    let bytes = fetcher.fetch_bytes(url)?;

    let bytes = if url.ends_with(".bz2") {
        let mut decoded = Vec::new();
        bzip2::read::BzDecoder::new(bytes.as_slice())
            .read_to_end(&mut decoded)
            .map_err(|e| MirrorError::Fetch {
                url: url.to_string(),
                reason: format!("cannot decompress manifest: {}", e),
            })?;
        decoded
    } else {
        bytes
    };

    let text = String::from_utf8(bytes).map_err(|e| {
        let valid = e.utf8_error().valid_up_to();
        let line = e.as_bytes()[..valid].iter().filter(|&&b| b == b'\n').count() + 1;
        MirrorError::Syntax {
            line,
            message: "manifest is not valid UTF-8".to_string(),
        }
    })?;

    parse_manifest(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_kind() {
        assert_eq!(PackageKind::of("bash"), PackageKind::Normal);
        assert_eq!(PackageKind::of("_update-info-dir"), PackageKind::Reserved);
    }

    #[test]
    fn test_install_spec_parse() {
        let spec = InstallSpec::parse("bash/bash-4.tar.bz2 12345 deadbeef").unwrap();
        assert_eq!(spec.path, "bash/bash-4.tar.bz2");
        assert_eq!(spec.size, 12345);
        assert_eq!(spec.hash, "deadbeef");
    }

    #[test]
    fn test_install_spec_rejects_malformed() {
        assert!(InstallSpec::parse("bash/bash-4.tar.bz2 12345").is_none());
        assert!(InstallSpec::parse("bash/bash-4.tar.bz2 big deadbeef").is_none());
        assert!(InstallSpec::parse("a 1 b c").is_none());
        assert!(InstallSpec::parse("").is_none());
    }

    #[test]
    fn test_record_accessors() {
        let mut fields = HashMap::new();
        fields.insert(FieldKey::new("requires", Epoch::Current), "a  b".to_string());
        fields.insert(FieldKey::new("category", Epoch::Current), "Base Shells".to_string());
        let rec = PackageRecord::new("bash", fields, "@ bash\n".to_string());

        assert_eq!(rec.requires(Epoch::Current), Some(vec!["a", "b"]));
        assert_eq!(rec.requires(Epoch::Previous), None);
        assert_eq!(rec.categories(), vec!["Base", "Shells"]);
        assert_eq!(rec.install(Epoch::Current), None);
    }
}
