//! URL joining and classification
//!
//! Mirror URLs are joined textually: the base always ends with `/` and
//! repository-relative paths never start with one.

/// Ensure a base URL ends with exactly one `/`.
pub fn normalize_base(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    }
}

/// Join a base URL with a relative path.
///
/// A `relative` value that is already a full URL is returned unchanged.
pub fn join(base: &str, relative: &str) -> String {
    if has_scheme(relative) {
        return relative.to_string();
    }
    format!("{}{}", normalize_base(base), relative.trim_start_matches('/'))
}

/// True for `scheme://...` strings.
pub fn has_scheme(url: &str) -> bool {
    match url.find("://") {
        Some(idx) => {
            idx > 0
                && url[..idx]
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
        }
        None => false,
    }
}

/// Supported transport for a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlScheme {
    Http,
    Https,
    File,
    /// No scheme at all: a plain local path
    Local,
    Unsupported,
}

/// Classify a URL by its scheme (case-insensitive).
pub fn scheme_of(url: &str) -> UrlScheme {
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") {
        UrlScheme::Http
    } else if lower.starts_with("https://") {
        UrlScheme::Https
    } else if lower.starts_with("file://") {
        UrlScheme::File
    } else if has_scheme(url) {
        UrlScheme::Unsupported
    } else {
        UrlScheme::Local
    }
}

/// Strip a `file://` prefix, leaving the filesystem path.
pub fn file_url_path(url: &str) -> &str {
    url.get(..7)
        .filter(|p| p.eq_ignore_ascii_case("file://"))
        .map(|_| &url[7..])
        .unwrap_or(url)
}

/// Last path segment of a URL, for display.
pub fn display_name(url: &str) -> &str {
    let clean = url.split(['?', '#']).next().unwrap_or(url);
    clean
        .rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or(clean)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base() {
        assert_eq!(normalize_base("http://a/b"), "http://a/b/");
        assert_eq!(normalize_base("http://a/b/"), "http://a/b/");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("http://a/b", "setup.ini"), "http://a/b/setup.ini");
        assert_eq!(join("http://a/b/", "x/y.tar.xz"), "http://a/b/x/y.tar.xz");
        assert_eq!(join("http://a/b/", "https://c/d"), "https://c/d");
    }

    #[test]
    fn test_scheme_of() {
        assert_eq!(scheme_of("http://x"), UrlScheme::Http);
        assert_eq!(scheme_of("HTTPS://x"), UrlScheme::Https);
        assert_eq!(scheme_of("file:///tmp/x"), UrlScheme::File);
        assert_eq!(scheme_of("/tmp/x"), UrlScheme::Local);
        assert_eq!(scheme_of("ftp://cygwin.com/pub"), UrlScheme::Unsupported);
    }

    #[test]
    fn test_file_url_path() {
        assert_eq!(file_url_path("file:///tmp/setup.ini"), "/tmp/setup.ini");
        assert_eq!(file_url_path("/tmp/setup.ini"), "/tmp/setup.ini");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("http://a/b/bash-4.tar.xz"), "bash-4.tar.xz");
        assert_eq!(display_name("http://a/b/file?v=1"), "file");
    }
}
