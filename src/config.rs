//! Mirror configuration
//!
//! [`MirrorConfig`] is an explicit value handed to every entry point; nothing
//! in the crate reads global state. The binary layers it from CLI flags,
//! environment variables and an optional TOML file:
//!
//! ```toml
//! # ~/.config/cygmirror/config.toml
//! mirror = "https://mirrors.kernel.org/sourceware/cygwin/"
//! installer_url = "https://cygwin.com/setup-x86_64.exe"
//! directory = "/srv/cygwin"
//! epochs = ["curr", "prev"]
//! ```

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{MirrorError, Result};
use crate::util::url_utils;

/// Default mirror site hosting the package archives
pub const DEFAULT_MIRROR: &str = "https://mirrors.kernel.org/sourceware/cygwin/";

/// Default source of the installer executable
pub const DEFAULT_INSTALLER_URL: &str = "https://cygwin.com/setup-x86_64.exe";

/// Default local directory for the assembled mirror
pub const DEFAULT_TARGET_DIR: &str = "cygwin";

/// Manifest file name, both on the mirror and in the target directory
pub const MANIFEST_NAME: &str = "setup.ini";

/// Compressed manifest file name in the target directory
pub const COMPRESSED_MANIFEST_NAME: &str = "setup.bz2";

/// Installer file name in the target directory
pub const INSTALLER_NAME: &str = "setup.exe";

/// Checksum ledger file name in the target directory
pub const LEDGER_NAME: &str = "md5.sum";

/// Lifecycle tag qualifying which variant of a package's metadata applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Epoch {
    #[default]
    Current,
    Previous,
    Test,
}

impl Epoch {
    pub const ALL: [Epoch; 3] = [Epoch::Current, Epoch::Previous, Epoch::Test];

    /// Tag as written in the manifest (`[prev]`, `requires_curr`, ...)
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Current => "curr",
            Self::Previous => "prev",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Epoch {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "curr" | "current" => Ok(Self::Current),
            "prev" | "previous" => Ok(Self::Previous),
            "test" => Ok(Self::Test),
            other => Err(MirrorError::Config(format!(
                "unknown epoch '{}' (expected curr, prev or test)",
                other
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Epoch {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse a comma-separated epoch list such as `"curr,prev"`.
///
/// Duplicates are dropped, first occurrence wins the ordering.
pub fn parse_epochs(list: &str) -> Result<Vec<Epoch>> {
    let mut epochs = Vec::new();
    for part in list.split(',').filter(|p| !p.trim().is_empty()) {
        let epoch: Epoch = part.parse()?;
        if !epochs.contains(&epoch) {
            epochs.push(epoch);
        }
    }
    if epochs.is_empty() {
        return Err(MirrorError::Config("epoch list is empty".to_string()));
    }
    Ok(epochs)
}

/// Everything the core needs to know to build a mirror.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Base URL of the mirror site, always ending with `/`
    pub mirror_url: String,
    /// Explicit manifest URL; derived from `mirror_url` when `None`
    pub manifest_url: Option<String>,
    /// URL of the installer executable
    pub installer_url: String,
    /// Directory the mirror is assembled into
    pub target_dir: PathBuf,
    /// Epochs whose requirements and archives are mirrored
    pub epochs: Vec<Epoch>,
    /// Parse and plan only, no fetches or writes
    pub dry_run: bool,
    /// Seed the selection with every non-reserved package
    pub include_all: bool,
    /// Requested package names; `None` selects the bootstrap set
    pub seeds: Option<Vec<String>>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            mirror_url: DEFAULT_MIRROR.to_string(),
            manifest_url: None,
            installer_url: DEFAULT_INSTALLER_URL.to_string(),
            target_dir: PathBuf::from(DEFAULT_TARGET_DIR),
            epochs: vec![Epoch::Current],
            dry_run: false,
            include_all: false,
            seeds: None,
        }
    }
}

impl MirrorConfig {
    /// Set the mirror base URL, normalizing the trailing slash.
    pub fn with_mirror(mut self, url: &str) -> Self {
        self.mirror_url = url_utils::normalize_base(url);
        self
    }

    pub fn with_target_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.target_dir = dir.into();
        self
    }

    /// URL the manifest is read from.
    pub fn manifest_url(&self) -> String {
        match &self.manifest_url {
            Some(url) => url.clone(),
            None => url_utils::join(&self.mirror_url, MANIFEST_NAME),
        }
    }

    /// URL of a repository-relative archive path.
    pub fn archive_url(&self, relative_path: &str) -> String {
        url_utils::join(&self.mirror_url, relative_path)
    }

    /// Merge settings from a config file; only keys present in the file apply.
    pub fn apply_file(&mut self, file: ConfigFile) {
        if let Some(mirror) = file.mirror {
            self.mirror_url = url_utils::normalize_base(&mirror);
        }
        if file.manifest_url.is_some() {
            self.manifest_url = file.manifest_url;
        }
        if let Some(url) = file.installer_url {
            self.installer_url = url;
        }
        if let Some(dir) = file.directory {
            self.target_dir = dir;
        }
        if let Some(epochs) = file.epochs
            && !epochs.is_empty()
        {
            self.epochs = epochs;
        }
    }
}

/// On-disk TOML configuration. All keys are optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub mirror: Option<String>,
    pub manifest_url: Option<String>,
    pub installer_url: Option<String>,
    pub directory: Option<PathBuf>,
    pub epochs: Option<Vec<Epoch>>,
}

impl ConfigFile {
    /// Read and parse a config file.
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| MirrorError::io(path, e))?;
        toml::from_str(&content).map_err(|e| {
            MirrorError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Default location: `$XDG_CONFIG_HOME/cygmirror/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("cygmirror").join("config.toml"))
    }

    /// Load from an explicit path, or from the default path if it exists.
    ///
    /// A missing explicit path is an error; a missing default file is not.
    pub fn load(explicit: Option<&Path>) -> Result<Option<Self>> {
        match explicit {
            Some(path) => Self::read(path).map(Some),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::read(&path).map(Some),
                _ => Ok(None),
            },
        }
    }
}
