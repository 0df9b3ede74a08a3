//! Filesystem helpers for the mirror tree

use std::path::{Component, Path};

use crate::error::{MirrorError, Result};

/// Ensure a file's parent directory exists.
///
/// Creating an already existing directory is not an error, so concurrent
/// callers racing on the same parent are fine.
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Check if a repository-relative path is safe to join onto the target.
///
/// Rejects empty paths, absolute paths (either separator, or a drive
/// prefix), and paths containing a `..` segment.
pub fn is_safe_path(relative: &str) -> bool {
    if relative.is_empty() || relative.starts_with('/') || relative.starts_with('\\') {
        return false;
    }
    if relative.split(['/', '\\']).any(|seg| seg == "..") {
        return false;
    }
    Path::new(relative).components().all(|c| {
        !matches!(
            c,
            Component::Prefix(_) | Component::RootDir | Component::ParentDir
        )
    })
}

/// Validate a path is safe, returning [`MirrorError::UnsafePath`] if not.
pub fn validate_safe_path(relative: &str) -> Result<()> {
    if !is_safe_path(relative) {
        return Err(MirrorError::UnsafePath {
            path: relative.to_string(),
        });
    }
    Ok(())
}

/// Size of a regular file, or `None` when it is missing or not a file.
pub fn file_size(path: &Path) -> Option<u64> {
    std::fs::metadata(path)
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_parent_dir() {
        let temp = tempdir().unwrap();
        let nested = temp.path().join("a/b/c/file.txt");

        ensure_parent_dir(&nested).unwrap();
        assert!(temp.path().join("a/b/c").exists());

        // Second call is a no-op
        ensure_parent_dir(&nested).unwrap();
    }

    #[test]
    fn test_is_safe_path() {
        assert!(is_safe_path("release/bash/bash-4.tar.bz2"));
        assert!(is_safe_path("file.txt"));
        assert!(is_safe_path("release/foo..bar/x"));
        assert!(!is_safe_path(""));
        assert!(!is_safe_path("/absolute/path"));
        assert!(!is_safe_path("\\windows\\root"));
        assert!(!is_safe_path("../escape"));
        assert!(!is_safe_path("release/../../etc/passwd"));
        assert!(!is_safe_path("release\\..\\x"));
    }

    #[test]
    fn test_validate_safe_path_error() {
        let err = validate_safe_path("/etc/passwd").unwrap_err();
        assert!(matches!(err, MirrorError::UnsafePath { ref path } if path == "/etc/passwd"));
    }

    #[test]
    fn test_file_size() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("f");
        std::fs::write(&file, b"12345").unwrap();
        assert_eq!(file_size(&file), Some(5));
        assert_eq!(file_size(temp.path()), None);
        assert_eq!(file_size(&temp.path().join("missing")), None);
    }
}
