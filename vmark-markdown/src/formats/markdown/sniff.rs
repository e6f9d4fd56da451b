//! Content sniffing: which extensions a source needs, and whether the fast
//! parser may handle it.

use once_cell::sync::Lazy;
use regex::RegexSet;
use serde::Serialize;

/// Optional grammar extensions a source actually uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtensionNeeds {
    pub math: bool,
    pub frontmatter: bool,
    pub wiki_links: bool,
    pub details: bool,
    pub references: bool,
}

impl ExtensionNeeds {
    pub fn detect(source: &str) -> Self {
        ExtensionNeeds {
            math: source.contains('$'),
            frontmatter: source.starts_with("---"),
            wiki_links: source.contains("[["),
            details: contains_ignore_ascii_case(source, "<details"),
            references: source.contains("]:"),
        }
    }
}

fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    haystack
        .as_bytes()
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Syntax the fast parser never attempts. Any match routes to the full parser.
static FAST_PATH_DENYLIST: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        // inline and block math
        r"\$",
        // wiki links and embeds
        r"\[\[",
        // highlight, underline, superscript; subscript and strikethrough
        r"==",
        r"\+\+",
        r"\^",
        r"~",
        // details blocks
        r"(?i)<details",
        // task list checkboxes
        r"(?m)^\s*(?:[-*+]|\d+[.)])\s+\[[ xX]\]",
        // table rows
        r"\|",
        // two-space hard breaks
        r"(?m) {2,}$",
        // frontmatter fence
        r"\A---",
        // footnotes
        r"\[\^",
        // link reference definitions
        r"(?m)^ {0,3}\[[^\]]+\]:",
        // tabs, carriage returns and alerts
        r"\t",
        r"\r",
        r"\[!",
    ])
    .expect("fast path denylist patterns are valid")
});

/// True when no denylisted syntax appears in `source`.
pub fn fast_path_eligible(source: &str) -> bool {
    !FAST_PATH_DENYLIST.is_match(source)
}
