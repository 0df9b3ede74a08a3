//! Transport: fetch bytes from a URL into memory or a local file
//!
//! The pipeline only talks to the [`Fetcher`] trait; [`UrlFetcher`] is the
//! real implementation. Timeouts belong here, not in the mirror logic.
//!
//! ## Timeout
//!
//! Set `CYGMIRROR_HTTP_TIMEOUT` (seconds) to change the per-request timeout:
//! ```bash
//! export CYGMIRROR_HTTP_TIMEOUT=120
//! ```

use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use crate::error::FetchError;
use crate::util::fs_utils;
use crate::util::progress::{self, ProgressGuard};
use crate::util::url_utils::{self, UrlScheme};

/// Default HTTP timeout in seconds
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

const TIMEOUT_ENV: &str = "CYGMIRROR_HTTP_TIMEOUT";

/// Source of remote bytes.
pub trait Fetcher {
    /// Download `url` into `dest`, creating parent directories.
    /// Returns the number of bytes written.
    fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<u64, FetchError>;

    /// Download `url` into memory.
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Read the timeout from the environment, clamped to 5-600 seconds.
pub fn timeout_from_env() -> Duration {
    let secs = std::env::var(TIMEOUT_ENV)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
    Duration::from_secs(secs.clamp(5, 600))
}

/// Fetcher for `http(s)://`, `file://` and plain local paths.
pub struct UrlFetcher {
    agent: ureq::Agent,
    show_progress: bool,
}

impl UrlFetcher {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("cygmirror/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            show_progress: true,
        }
    }

    /// Disable progress bars (for non-interactive use).
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    fn get(&self, url: &str) -> Result<ureq::Response, FetchError> {
        self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::Status(code, response) => {
                FetchError::new(url, format!("HTTP {} {}", code, response.status_text()))
            }
            ureq::Error::Transport(t) => FetchError::new(url, t),
        })
    }

    fn local_path(url: &str) -> Result<&Path, FetchError> {
        match url_utils::scheme_of(url) {
            UrlScheme::File | UrlScheme::Local => Ok(Path::new(url_utils::file_url_path(url))),
            _ => Err(FetchError::new(url, "unsupported URL scheme")),
        }
    }
}

impl Default for UrlFetcher {
    fn default() -> Self {
        Self::new(timeout_from_env())
    }
}

impl Fetcher for UrlFetcher {
    fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        fs_utils::ensure_parent_dir(dest)
            .map_err(|e| FetchError::new(url, format!("cannot create directory: {}", e)))?;

        if !matches!(url_utils::scheme_of(url), UrlScheme::Http | UrlScheme::Https) {
            let src = Self::local_path(url)?;
            return std::fs::copy(src, dest).map_err(|e| FetchError::new(url, e));
        }

        let response = self.get(url)?;
        let content_length: Option<u64> = response
            .header("content-length")
            .and_then(|s| s.parse().ok());

        let pb = progress::create_spinner(url_utils::display_name(url));
        if !self.show_progress {
            pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
        }
        let _guard = ProgressGuard::new(&pb);
        if let Some(len) = content_length {
            progress::upgrade_to_bytes(&pb, len);
        }

        let mut file = std::fs::File::create(dest)
            .map_err(|e| FetchError::new(url, format!("cannot create {}: {}", dest.display(), e)))?;

        let mut reader = response.into_reader();
        let mut buffer = [0u8; 8192];
        let mut total_bytes = 0u64;

        loop {
            let n = reader
                .read(&mut buffer)
                .map_err(|e| FetchError::new(url, format!("read error: {}", e)))?;
            if n == 0 {
                break;
            }
            file.write_all(&buffer[..n])
                .map_err(|e| FetchError::new(url, format!("write error: {}", e)))?;
            total_bytes += n as u64;
            pb.set_position(total_bytes);
        }

        file.flush()
            .map_err(|e| FetchError::new(url, format!("write error: {}", e)))?;
        Ok(total_bytes)
    }

    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if !matches!(url_utils::scheme_of(url), UrlScheme::Http | UrlScheme::Https) {
            let src = Self::local_path(url)?;
            return std::fs::read(src).map_err(|e| FetchError::new(url, e));
        }

        let mut bytes = Vec::new();
        self.get(url)?
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| FetchError::new(url, format!("read error: {}", e)))?;
        Ok(bytes)
    }
}
