//! Package list files
//!
//! One package name per line. `#` starts a comment that runs to the end of
//! the line; blank lines are ignored.

use std::path::{Path, PathBuf};

use crate::error::{MirrorError, Result};

/// Parse the contents of one package list.
pub fn parse_package_list(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        })
        .flat_map(str::split_whitespace)
        .map(str::to_string)
        .collect()
}

fn read_package_list(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|e| MirrorError::io(path, e))?;
    Ok(parse_package_list(&text))
}

/// Read and concatenate several package lists, in order.
pub fn read_package_lists(paths: &[PathBuf]) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for path in paths {
        names.extend(read_package_list(path)?);
    }
    Ok(names)
}
