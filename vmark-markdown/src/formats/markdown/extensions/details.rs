//! Collapsible `<details>` blocks.
//!
//! The base grammar sees `<details>` as raw HTML. Depending on blank lines it
//! either swallows the whole element into one HTML block or splits it into an
//! opening HTML block, ordinary markdown blocks and a closing HTML block. Both
//! shapes are folded into a single `Details` node whose body is markdown.

use super::TreeExtension;
use crate::error::ConversionError;
use crate::formats::markdown::parser::parse_blocks;
use crate::formats::markdown::sniff::ExtensionNeeds;
use crate::ir::nodes::{Block, Details, Root};
use crate::ir::visit::walk_block_lists;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::VecDeque;

static OPEN_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*<details(\s[^>]*)?>").expect("details open regex"));

static OPEN_ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bopen\b").expect("details attribute regex"));

static SUMMARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^\s*<summary>(.*?)</summary>").expect("summary regex"));

static TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<details(?:\s[^>]*)?>|</details\s*>").expect("details tags regex")
});

pub struct DetailsExtension {
    needs: ExtensionNeeds,
    strict: bool,
}

impl DetailsExtension {
    pub fn new(needs: ExtensionNeeds, strict: bool) -> Self {
        // Bodies are fragments: they never carry frontmatter.
        let needs = ExtensionNeeds {
            frontmatter: false,
            ..needs
        };
        DetailsExtension { needs, strict }
    }

    fn reparse(&self, markdown: &str) -> Result<Vec<Block>, ConversionError> {
        if markdown.trim().is_empty() {
            return Ok(Vec::new());
        }
        parse_blocks(markdown, &self.needs, self.strict)
    }

    fn fold(&self, blocks: Vec<Block>) -> Result<Vec<Block>, ConversionError> {
        let mut pending: VecDeque<Block> = blocks.into();
        let mut out = Vec::with_capacity(pending.len());

        while let Some(block) = pending.pop_front() {
            let Some(open) = (match &block {
                Block::Html(html) => OpenTag::parse(html),
                _ => None,
            }) else {
                out.push(block);
                continue;
            };

            let mut depth = 1;
            if let Some((at, len)) = find_close(&open.rest, &mut depth) {
                let body = self.fold(self.reparse(&open.rest[..at])?)?;
                let trailing = self.reparse(&open.rest[at + len..])?;
                out.push(open.into_block(body));
                out.extend(trailing);
                continue;
            }

            let Some((index, at, len)) = find_close_in_blocks(&pending, depth) else {
                // Unclosed: leave the raw HTML alone.
                out.push(block);
                continue;
            };

            let mut body = self.reparse(&open.rest)?;
            body.extend(pending.drain(..index));
            if let Some(Block::Html(closing)) = pending.pop_front() {
                body.extend(self.reparse(&closing[..at])?);
                let body = self.fold(body)?;
                out.push(open.into_block(body));
                out.extend(self.reparse(&closing[at + len..])?);
            }
        }
        Ok(out)
    }
}

impl TreeExtension for DetailsExtension {
    fn name(&self) -> &'static str {
        "details"
    }

    fn apply(&self, root: &mut Root, _source: &str) -> Result<(), ConversionError> {
        let mut failure = None;
        walk_block_lists(&mut root.children, &mut |blocks| {
            if failure.is_some() || !blocks.iter().any(is_details_open) {
                return;
            }
            match self.fold(std::mem::take(blocks)) {
                Ok(folded) => *blocks = folded,
                Err(err) => failure = Some(err),
            }
        });
        failure.map_or(Ok(()), Err)
    }
}

fn is_details_open(block: &Block) -> bool {
    matches!(block, Block::Html(html) if OPEN_TAG.is_match(html))
}

struct OpenTag {
    open: bool,
    summary: String,
    /// Everything after the opening tag and the summary.
    rest: String,
}

impl OpenTag {
    fn parse(html: &str) -> Option<Self> {
        let tag = OPEN_TAG.captures(html)?;
        let open = tag
            .get(1)
            .is_some_and(|attrs| OPEN_ATTRIBUTE.is_match(attrs.as_str()));
        let after = &html[tag.get(0).map_or(0, |m| m.end())..];
        let (summary, rest) = match SUMMARY.captures(after) {
            Some(captures) => (
                captures[1].trim().to_string(),
                &after[captures.get(0).map_or(0, |m| m.end())..],
            ),
            None => (String::new(), after),
        };
        Some(OpenTag {
            open,
            summary,
            rest: rest.to_string(),
        })
    }

    fn into_block(self, children: Vec<Block>) -> Block {
        Block::Details(Details {
            open: self.open,
            summary: self.summary,
            children,
        })
    }
}

/// Offset and length of the closing tag that brings `depth` to zero.
fn find_close(html: &str, depth: &mut usize) -> Option<(usize, usize)> {
    for tag in TAGS.find_iter(html) {
        if tag.as_str().starts_with("</") {
            *depth -= 1;
            if *depth == 0 {
                return Some((tag.start(), tag.len()));
            }
        } else {
            *depth += 1;
        }
    }
    None
}

fn find_close_in_blocks(blocks: &VecDeque<Block>, mut depth: usize) -> Option<(usize, usize, usize)> {
    blocks.iter().enumerate().find_map(|(index, block)| match block {
        Block::Html(html) => find_close(html, &mut depth).map(|(at, len)| (index, at, len)),
        _ => None,
    })
}
