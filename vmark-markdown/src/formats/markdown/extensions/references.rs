//! Link reference definitions.
//!
//! The base grammar resolves `[text][id]` against definitions and then drops
//! the definitions themselves. To keep them in the document they are read
//! back from the source and appended to the root as `LinkDefinition` blocks,
//! first definition per label winning, the way references resolve.
//! Definitions inside blockquotes and list items are found too; like every
//! definition they apply to the whole document, so they move to the root.

use super::TreeExtension;
use crate::error::ConversionError;
use crate::formats::markdown::escape::{fence_closes, fence_open};
use crate::ir::nodes::{Block, LinkDefinition, Root};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^ {0,3}\[([^\]\^\s][^\]]*)\]:[ ]*(<[^>\n]*>|\S+)(?:[ ]+("[^"]*"|'[^']*'|\([^)]*\)))?[ ]*$"#,
    )
    .expect("link definition regex")
});

/// Blockquote markers and a list item marker in front of a line's content.
static CONTAINER_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?: {0,3}> ?)*(?: {0,3}(?:[-*+]|\d{1,9}[.)]) +)?")
        .expect("container prefix regex")
});

pub struct ReferenceExtension;

impl TreeExtension for ReferenceExtension {
    fn name(&self) -> &'static str {
        "references"
    }

    fn apply(&self, root: &mut Root, source: &str) -> Result<(), ConversionError> {
        root.children
            .extend(scan_definitions(source).into_iter().map(Block::LinkDefinition));
        Ok(())
    }
}

/// Single-line definitions at block starts, outside fenced code.
pub fn scan_definitions(source: &str) -> Vec<LinkDefinition> {
    let mut found = Vec::new();
    let mut seen = HashSet::new();
    let mut fence: Option<(char, usize)> = None;
    let mut block_start = true;

    for raw in source.lines() {
        let prefix = CONTAINER_PREFIX.find(raw).map_or(0, |m| m.end());
        let line = &raw[prefix..];
        // A list item marker opens a new block.
        if !raw[..prefix].trim_start_matches(['>', ' ']).is_empty() {
            block_start = true;
        }
        if let Some((fence_char, len)) = fence {
            if fence_closes(line, fence_char, len) {
                fence = None;
            }
            block_start = false;
            continue;
        }
        if let Some(open) = fence_open(line) {
            fence = Some(open);
            block_start = false;
            continue;
        }
        if line.trim().is_empty() {
            block_start = true;
            continue;
        }
        match (block_start, DEFINITION.captures(line)) {
            (true, Some(captures)) => {
                let identifier = captures[1].trim().to_string();
                if seen.insert(normalize_label(&identifier)) {
                    found.push(LinkDefinition {
                        identifier,
                        url: strip_angle_brackets(&captures[2]),
                        title: captures.get(3).map(|m| strip_title(m.as_str())),
                    });
                }
                // Definitions may follow each other without blank lines.
                block_start = true;
            }
            _ => block_start = false,
        }
    }
    found
}

/// Labels match case-insensitively with collapsed whitespace.
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn strip_angle_brackets(url: &str) -> String {
    url.strip_prefix('<')
        .and_then(|u| u.strip_suffix('>'))
        .unwrap_or(url)
        .to_string()
}

fn strip_title(title: &str) -> String {
    title[1..title.len() - 1].to_string()
}
