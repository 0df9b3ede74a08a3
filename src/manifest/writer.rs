//! Manifest regeneration
//!
//! The mirrored manifest is rebuilt from the stored raw text of each selected
//! package, so package blocks come out byte-for-byte as they went in.

use std::fmt::Write as _;

use super::{PackageKind, RepositoryIndex};
use crate::core::output;
use crate::error::{MirrorError, Result};

/// Header keys written in a fixed position ahead of the `setup-*` lines
const LEADING_KEYS: &[&str] = &["release", "arch"];

const TIMESTAMP_KEY: &str = "setup-timestamp";
const VERSION_KEY: &str = "setup-version";

/// Order packages for the manifest: normal packages sorted, then reserved
/// packages sorted.
pub fn order_for_manifest<S: AsRef<str>>(names: &[S]) -> Vec<&str> {
    let (mut normal, mut reserved): (Vec<&str>, Vec<&str>) = names
        .iter()
        .map(|n| n.as_ref())
        .partition(|n| PackageKind::of(n) == PackageKind::Normal);
    normal.sort_unstable();
    normal.dedup();
    reserved.sort_unstable();
    reserved.dedup();
    normal.extend(reserved);
    normal
}

fn write_header_value(out: &mut String, key: &str, value: &str) {
    if value.contains('\n') || value.starts_with('"') {
        let _ = writeln!(out, "{}: \"{}\"", key, value);
    } else {
        let _ = writeln!(out, "{}: {}", key, value);
    }
}

/// Render a manifest containing `names`, stamped with `timestamp`
/// (seconds since the Unix epoch).
///
/// Fails with [`MirrorError::UnknownPackages`] if a name is not in the index.
pub fn render_manifest<S: AsRef<str>>(
    index: &RepositoryIndex,
    names: &[S],
    timestamp: u64,
) -> Result<String> {
    let ordered = order_for_manifest(names);

    let missing: Vec<String> = ordered
        .iter()
        .filter(|n| !index.contains(n))
        .map(|n| n.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(MirrorError::UnknownPackages(missing));
    }

    let mut out = String::new();
    out.push_str("# This file is automatically generated by cygmirror\n");
    out.push_str("# Manual edits will be overwritten\n");

    for key in LEADING_KEYS {
        if let Some(value) = index.header_value(key) {
            write_header_value(&mut out, key, value);
        }
    }

    let _ = writeln!(out, "{}: {}", TIMESTAMP_KEY, timestamp);
    match index.header_value(VERSION_KEY) {
        Some(version) => write_header_value(&mut out, VERSION_KEY, version),
        None => output::warning("manifest has no setup-version; regenerated manifest omits it"),
    }

    for (key, value) in index.header() {
        if LEADING_KEYS.contains(&key.as_str()) || key == TIMESTAMP_KEY || key == VERSION_KEY {
            continue;
        }
        write_header_value(&mut out, key, value);
    }

    for name in ordered {
        if let Some(record) = index.get(name) {
            out.push('\n');
            out.push_str(record.raw_text());
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::parse_manifest;

    const SOURCE: &str = "\
release: cygwin
arch: x86_64
setup-timestamp: 1000
setup-version: 2.887
setup-minimum-version: 2.800

@ zlib
sdesc: \"compression\"
ldesc: \"multi
line\"

@ _update-info-dir
requires: bash

@ bash
# a comment kept verbatim
requires: zlib
install: bash/bash-4.tar.bz2 12345 deadbeef
[prev]
install: bash/bash-3.tar.bz2 100 cafe
";

    #[test]
    fn test_order_normal_then_reserved() {
        let names = ["_b", "zlib", "_a", "bash", "bash"];
        assert_eq!(order_for_manifest(&names), vec!["bash", "zlib", "_a", "_b"]);
    }

    #[test]
    fn test_render_header() {
        let index = parse_manifest(SOURCE).unwrap();
        let text = render_manifest(&index, &["bash"], 4242).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with('#'));
        assert!(lines[1].starts_with('#'));
        assert_eq!(lines[2], "release: cygwin");
        assert_eq!(lines[3], "arch: x86_64");
        assert_eq!(lines[4], "setup-timestamp: 4242");
        assert_eq!(lines[5], "setup-version: 2.887");
        assert_eq!(lines[6], "setup-minimum-version: 2.800");
    }

    #[test]
    fn test_round_trip_preserves_raw_text() {
        let index = parse_manifest(SOURCE).unwrap();
        let names = ["zlib", "_update-info-dir", "bash"];
        let text = render_manifest(&index, &names, 99).unwrap();

        let reparsed = parse_manifest(&text).unwrap();
        let mut keys: Vec<&str> = reparsed.names();
        keys.sort_unstable();
        assert_eq!(keys, vec!["_update-info-dir", "bash", "zlib"]);

        for name in names {
            assert_eq!(
                reparsed.get(name).unwrap().raw_text(),
                index.get(name).unwrap().raw_text(),
                "raw text changed for {}",
                name
            );
            assert_eq!(reparsed.get(name).unwrap(), index.get(name).unwrap());
        }
        assert_eq!(reparsed.header_value("setup-timestamp"), Some("99"));
        assert_eq!(reparsed.header_value("setup-version"), Some("2.887"));
    }

    #[test]
    fn test_header_value_starting_with_quote_round_trips() {
        let source = "odd: \"\"x\"\nsetup-version: 1\n\n@ a\nrequires: b\n";
        let index = parse_manifest(source).unwrap();
        assert_eq!(index.header_value("odd"), Some("\"x"));

        let text = render_manifest(&index, &["a"], 5).unwrap();
        assert!(text.contains("odd: \"\"x\"\n"));

        let reparsed = parse_manifest(&text).unwrap();
        assert_eq!(reparsed.header_value("odd"), Some("\"x"));
        assert_eq!(reparsed.get("a"), index.get("a"));
    }

    #[test]
    fn test_render_subset_excludes_others() {
        let index = parse_manifest(SOURCE).unwrap();
        let text = render_manifest(&index, &["zlib"], 1).unwrap();
        assert!(text.contains("@ zlib"));
        assert!(!text.contains("@ bash"));
    }

    #[test]
    fn test_render_empty_selection() {
        let index = parse_manifest(SOURCE).unwrap();
        let names: [&str; 0] = [];
        let text = render_manifest(&index, &names, 1).unwrap();
        let reparsed = parse_manifest(&text).unwrap();
        assert!(reparsed.is_empty());
    }

    #[test]
    fn test_render_unknown_name_fails() {
        let index = parse_manifest(SOURCE).unwrap();
        let err = render_manifest(&index, &["bash", "ghost"], 1).unwrap_err();
        assert!(matches!(err, MirrorError::UnknownPackages(ref n) if n == &vec!["ghost".to_string()]));
    }
}
