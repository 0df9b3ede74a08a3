//! Manifest parser
//!
//! Single pass over the lines. Outside a quoted field each line is classified
//! by [`classify_line`], trying the shapes in a fixed priority order: header,
//! comment, blank, package start, epoch marker, attribute. Anything else is a
//! syntax error.
//!
//! The only cross-line state is an open multi-line quoted value, modelled by
//! [`ParseState`]. While a quote is open, lines are not classified at all;
//! they are collected until one whose trimmed form ends with `"`.

use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use super::{FieldKey, PackageRecord, RepositoryIndex};
use crate::config::Epoch;
use crate::core::output;
use crate::error::{MirrorError, Result};

static RE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(setup-\S+):\s+(\S+)\s*$").expect("valid regex"));
static RE_BLANK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*$").expect("valid regex"));
static RE_PACKAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@\s+(\S+)\s*$").expect("valid regex"));
static RE_EPOCH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([a-z]+)\]\s*$").expect("valid regex"));
static RE_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9_-]*):\s*(.*)$").expect("valid regex"));

/// Shape of a single manifest line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// `setup-version: 2.887`, only before the first package
    Header { key: &'a str, value: &'a str },
    Comment,
    Blank,
    /// `@ name`
    PackageStart(&'a str),
    /// `[prev]`
    EpochMarker(&'a str),
    /// `attr: value`
    Attribute { name: &'a str, value: &'a str },
}

/// Classify one line (terminator already stripped).
///
/// `in_package` is true once the first `@ name` line has been seen; header
/// lines are only recognized before that.
pub fn classify_line(line: &str, in_package: bool) -> Option<LineKind<'_>> {
    if !in_package && let Some(caps) = RE_HEADER.captures(line) {
        let key = caps.get(1)?.as_str();
        let value = caps.get(2)?.as_str();
        return Some(LineKind::Header { key, value });
    }
    if line.starts_with('#') {
        return Some(LineKind::Comment);
    }
    if RE_BLANK.is_match(line) {
        return Some(LineKind::Blank);
    }
    if let Some(caps) = RE_PACKAGE.captures(line) {
        return Some(LineKind::PackageStart(caps.get(1)?.as_str()));
    }
    if let Some(caps) = RE_EPOCH.captures(line) {
        return Some(LineKind::EpochMarker(caps.get(1)?.as_str()));
    }
    if let Some(caps) = RE_FIELD.captures(line) {
        let name = caps.get(1)?.as_str();
        let value = caps.get(2)?.as_str();
        return Some(LineKind::Attribute { name, value });
    }
    None
}

/// Cross-line parser state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParseState {
    #[default]
    Idle,
    /// Inside a `"`-delimited value that did not close on its first line.
    AccumulatingQuotedField {
        key: FieldKey,
        opened_at: usize,
        lines: Vec<String>,
    },
}

impl ParseState {
    /// Feed one raw line to an open quoted field.
    ///
    /// Returns the completed `(key, value)` when this line closes the quote;
    /// the state is back to `Idle` afterwards.
    pub fn feed_quoted(&mut self, line: &str) -> Option<(FieldKey, String)> {
        let ParseState::AccumulatingQuotedField { lines, .. } = self else {
            return None;
        };

        let trimmed = line.trim_end();
        match trimmed.strip_suffix('"') {
            Some(last) => {
                lines.push(last.to_string());
                match std::mem::take(self) {
                    ParseState::AccumulatingQuotedField { key, lines, .. } => {
                        Some((key, lines.join("\n")))
                    }
                    ParseState::Idle => None,
                }
            }
            None => {
                lines.push(strip_terminator(line).to_string());
                None
            }
        }
    }
}

/// Package block being accumulated
struct PackageBuilder {
    name: String,
    epoch: Epoch,
    fields: HashMap<FieldKey, String>,
    raw_lines: Vec<String>,
}

impl PackageBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            epoch: Epoch::Current,
            fields: HashMap::new(),
            raw_lines: Vec::new(),
        }
    }

    fn finish(self) -> PackageRecord {
        PackageRecord::new(self.name, self.fields, merge_lines(self.raw_lines))
    }
}

/// Join a package's raw lines, dropping trailing whitespace-only lines and
/// making sure the text ends with a single line terminator.
fn merge_lines(mut lines: Vec<String>) -> String {
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let mut text = lines.concat();
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

fn strip_terminator(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

/// Split an `attr_curr` style name into attribute and explicit epoch.
fn split_epoch_suffix(name: &str) -> (&str, Option<Epoch>) {
    if let Some((attr, tag)) = name.rsplit_once('_')
        && !attr.is_empty()
    {
        let epoch = Epoch::ALL.into_iter().find(|e| e.tag() == tag);
        if epoch.is_some() {
            return (attr, epoch);
        }
    }
    (name, None)
}

struct ManifestParser {
    header: BTreeMap<String, String>,
    packages: HashMap<String, PackageRecord>,
    current: Option<PackageBuilder>,
    state: ParseState,
}

impl ManifestParser {
    fn new() -> Self {
        Self {
            header: BTreeMap::new(),
            packages: HashMap::new(),
            current: None,
            state: ParseState::Idle,
        }
    }

    fn store(&mut self, key: FieldKey, value: String) {
        match self.current.as_mut() {
            Some(pkg) => {
                pkg.fields.insert(key, value);
            }
            None => {
                self.header.insert(key.attribute, value);
            }
        }
    }

    fn finalize_current(&mut self) {
        if let Some(pkg) = self.current.take() {
            let record = pkg.finish();
            if self.packages.contains_key(record.name()) {
                output::debug(&format!("duplicate package '{}', keeping the last one", record.name()));
            }
            self.packages.insert(record.name().to_string(), record);
        }
    }

    fn feed(&mut self, lineno: usize, raw: &str) -> Result<()> {
        if matches!(self.state, ParseState::AccumulatingQuotedField { .. }) {
            if let Some((key, value)) = self.state.feed_quoted(raw) {
                self.store(key, value);
            }
            self.record_raw(raw);
            return Ok(());
        }

        let line = strip_terminator(raw);
        let kind = classify_line(line, self.current.is_some()).ok_or_else(|| MirrorError::Syntax {
            line: lineno,
            message: format!("unrecognized content: '{}'", line),
        })?;

        match kind {
            LineKind::Header { key, value } => {
                self.header.insert(key.to_string(), value.to_string());
            }
            LineKind::Comment | LineKind::Blank => {}
            LineKind::PackageStart(name) => {
                self.finalize_current();
                self.current = Some(PackageBuilder::new(name));
            }
            LineKind::EpochMarker(tag) => {
                let epoch: Epoch = tag.parse().map_err(|_| MirrorError::Syntax {
                    line: lineno,
                    message: format!("unknown epoch marker '[{}]'", tag),
                })?;
                match self.current.as_mut() {
                    Some(pkg) => pkg.epoch = epoch,
                    None => {
                        return Err(MirrorError::Syntax {
                            line: lineno,
                            message: format!("epoch marker '[{}]' outside a package", tag),
                        });
                    }
                }
            }
            LineKind::Attribute { name, value } => {
                let (attribute, explicit) = split_epoch_suffix(name);
                let epoch = explicit
                    .or_else(|| self.current.as_ref().map(|p| p.epoch))
                    .unwrap_or_default();
                let key = FieldKey::new(attribute, epoch);
                let value = value.trim_end();

                match value.strip_prefix('"') {
                    Some(rest) => match rest.strip_suffix('"') {
                        Some(inner) => self.store(key, inner.to_string()),
                        None => {
                            self.state = ParseState::AccumulatingQuotedField {
                                key,
                                opened_at: lineno,
                                lines: vec![rest.to_string()],
                            };
                        }
                    },
                    None => self.store(key, value.to_string()),
                }
            }
        }

        self.record_raw(raw);
        Ok(())
    }

    fn record_raw(&mut self, raw: &str) {
        if let Some(pkg) = self.current.as_mut() {
            pkg.raw_lines.push(raw.to_string());
        }
    }

    fn finish(mut self) -> Result<RepositoryIndex> {
        if let ParseState::AccumulatingQuotedField { key, opened_at, .. } = &self.state {
            return Err(MirrorError::Syntax {
                line: *opened_at,
                message: format!("unterminated quoted value for '{}'", key.attribute),
            });
        }
        self.finalize_current();
        Ok(RepositoryIndex::new(self.header, self.packages))
    }
}

/// Parse manifest text into a [`RepositoryIndex`].
pub fn parse_manifest(text: &str) -> Result<RepositoryIndex> {
    let mut parser = ManifestParser::new();
    for (idx, raw) in text.split_inclusive('\n').enumerate() {
        parser.feed(idx + 1, raw)?;
    }
    parser.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = "\
# comment at top
setup-timestamp: 1234567890
setup-version: 2.887

@ bash
sdesc: \"The GNU Bourne Again SHell\"
category: Base Shells
requires: coreutils
install: bash/bash-4.tar.bz2 12345 deadbeef

@ coreutils
sdesc: \"GNU core utilities\"
";

    // ==================== classify_line ====================

    #[test]
    fn test_classify_priority() {
        assert_eq!(
            classify_line("setup-version: 2.887", false),
            Some(LineKind::Header { key: "setup-version", value: "2.887" })
        );
        assert_eq!(classify_line("# hi", false), Some(LineKind::Comment));
        assert_eq!(classify_line("   ", true), Some(LineKind::Blank));
        assert_eq!(classify_line("@ bash", false), Some(LineKind::PackageStart("bash")));
        assert_eq!(classify_line("[prev]", true), Some(LineKind::EpochMarker("prev")));
        assert_eq!(
            classify_line("requires: a b", true),
            Some(LineKind::Attribute { name: "requires", value: "a b" })
        );
        assert_eq!(classify_line("!!! nonsense", true), None);
    }

    #[test]
    fn test_classify_header_only_before_packages() {
        assert!(matches!(
            classify_line("setup-version: 2", true),
            Some(LineKind::Attribute { name: "setup-version", .. })
        ));
    }

    // ==================== ParseState ====================

    #[test]
    fn test_quote_state_closes_on_trailing_quote() {
        let mut state = ParseState::AccumulatingQuotedField {
            key: FieldKey::new("ldesc", Epoch::Current),
            opened_at: 3,
            lines: vec!["first".to_string()],
        };
        assert_eq!(state.feed_quoted("middle\n"), None);
        let (key, value) = state.feed_quoted("last\"  \n").unwrap();
        assert_eq!(key.attribute, "ldesc");
        assert_eq!(value, "first\nmiddle\nlast");
        assert_eq!(state, ParseState::Idle);
    }

    #[test]
    fn test_idle_state_ignores_feed() {
        let mut state = ParseState::Idle;
        assert_eq!(state.feed_quoted("x\"\n"), None);
    }

    // ==================== parse_manifest ====================

    #[test]
    fn test_parse_header_and_packages() {
        let index = parse_manifest(BASIC).unwrap();
        assert_eq!(index.header_value("setup-version"), Some("2.887"));
        assert_eq!(index.header_value("setup-timestamp"), Some("1234567890"));
        assert_eq!(index.len(), 2);

        let bash = index.get("bash").unwrap();
        assert_eq!(bash.field("sdesc", Epoch::Current), Some("The GNU Bourne Again SHell"));
        assert_eq!(bash.requires(Epoch::Current), Some(vec!["coreutils"]));
        assert_eq!(bash.install(Epoch::Current), Some("bash/bash-4.tar.bz2 12345 deadbeef"));
        assert!(index.get("coreutils").unwrap().requires(Epoch::Current).is_none());
    }

    #[test]
    fn test_raw_text_trims_trailing_blank_lines() {
        let index = parse_manifest(BASIC).unwrap();
        let bash = index.get("bash").unwrap();
        assert!(bash.raw_text().starts_with("@ bash\n"));
        assert!(bash.raw_text().ends_with("12345 deadbeef\n"));
        assert_eq!(index.get("coreutils").unwrap().raw_text(), "@ coreutils\nsdesc: \"GNU core utilities\"\n");
    }

    #[test]
    fn test_raw_text_keeps_comments_verbatim() {
        let text = "@ foo\n# note about foo\nrequires: bar\n";
        let index = parse_manifest(text).unwrap();
        assert_eq!(index.get("foo").unwrap().raw_text(), text);
    }

    #[test]
    fn test_raw_text_adds_missing_final_newline() {
        let index = parse_manifest("@ foo\nrequires: bar").unwrap();
        assert_eq!(index.get("foo").unwrap().raw_text(), "@ foo\nrequires: bar\n");
    }

    #[test]
    fn test_epoch_marker_switches_epoch() {
        let text = "\
@ bash
install: a 1 h1
[prev]
install: b 2 h2
[test]
requires: x
@ next
requires: y
";
        let index = parse_manifest(text).unwrap();
        let bash = index.get("bash").unwrap();
        assert_eq!(bash.install(Epoch::Current), Some("a 1 h1"));
        assert_eq!(bash.install(Epoch::Previous), Some("b 2 h2"));
        assert_eq!(bash.requires(Epoch::Test), Some(vec!["x"]));
        // Epoch resets at the next package start
        assert_eq!(index.get("next").unwrap().requires(Epoch::Current), Some(vec!["y"]));
    }

    #[test]
    fn test_epoch_suffixed_attribute() {
        let text = "@ bash\nrequires_curr: coreutils\ninstall_prev: p 3 h\n";
        let index = parse_manifest(text).unwrap();
        let bash = index.get("bash").unwrap();
        assert_eq!(bash.requires(Epoch::Current), Some(vec!["coreutils"]));
        assert_eq!(bash.install(Epoch::Previous), Some("p 3 h"));
    }

    #[test]
    fn test_last_writer_wins() {
        let index = parse_manifest("@ a\nrequires: x\nrequires: y\n").unwrap();
        assert_eq!(index.get("a").unwrap().requires(Epoch::Current), Some(vec!["y"]));
    }

    #[test]
    fn test_quoted_field_single_line() {
        let index = parse_manifest("@ a\nsdesc: \"hello world\"\n").unwrap();
        assert_eq!(index.get("a").unwrap().field("sdesc", Epoch::Current), Some("hello world"));
    }

    #[test]
    fn test_quoted_field_no_interior_lines() {
        let text = "@ a\nldesc: \"first line\nsecond line\"\nrequires: b\n";
        let index = parse_manifest(text).unwrap();
        let a = index.get("a").unwrap();
        assert_eq!(a.field("ldesc", Epoch::Current), Some("first line\nsecond line"));
        assert_eq!(a.requires(Epoch::Current), Some(vec!["b"]));
    }

    #[test]
    fn test_quoted_field_three_lines() {
        let text = "@ a\nldesc: \"Line one\nline two\nline three\"\n";
        let index = parse_manifest(text).unwrap();
        assert_eq!(
            index.get("a").unwrap().field("ldesc", Epoch::Current),
            Some("Line one\nline two\nline three")
        );
    }

    #[test]
    fn test_quoted_field_many_interior_lines_not_classified() {
        // Interior lines look like package starts and attributes but must be
        // swallowed by the open quote.
        let text = "\
@ a
ldesc: \"Intro
@ not-a-package
requires: not-a-field

[prev]
done\"
requires: real
";
        let index = parse_manifest(text).unwrap();
        assert_eq!(index.len(), 1);
        let a = index.get("a").unwrap();
        assert_eq!(
            a.field("ldesc", Epoch::Current),
            Some("Intro\n@ not-a-package\nrequires: not-a-field\n\n[prev]\ndone")
        );
        assert_eq!(a.requires(Epoch::Current), Some(vec!["real"]));
        assert_eq!(a.raw_text(), text);
    }

    #[test]
    fn test_quoted_field_crlf_lines() {
        let text = "@ a\r\nldesc: \"one\r\ntwo\"\r\n";
        let index = parse_manifest(text).unwrap();
        assert_eq!(index.get("a").unwrap().field("ldesc", Epoch::Current), Some("one\ntwo"));
    }

    #[test]
    fn test_unterminated_quote_is_error() {
        let err = parse_manifest("@ a\nldesc: \"never closed\nstill open\n").unwrap_err();
        assert!(matches!(err, MirrorError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_unrecognized_line_reports_line_number() {
        let err = parse_manifest("setup-version: 1\n\n@ a\n!!! bad\n").unwrap_err();
        assert!(matches!(err, MirrorError::Syntax { line: 4, .. }));
    }

    #[test]
    fn test_unknown_epoch_marker_is_error() {
        let err = parse_manifest("@ a\n[nightly]\n").unwrap_err();
        assert!(matches!(err, MirrorError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_top_level_attributes_go_to_header() {
        let index = parse_manifest("release: cygwin\narch: x86_64\nsetup-version: 2.9\n@ a\n").unwrap();
        assert_eq!(index.header_value("release"), Some("cygwin"));
        assert_eq!(index.header_value("arch"), Some("x86_64"));
        assert_eq!(index.header_value("setup-version"), Some("2.9"));
    }

    #[test]
    fn test_empty_input() {
        let index = parse_manifest("").unwrap();
        assert!(index.is_empty());
        assert!(index.header().is_empty());
    }
}
