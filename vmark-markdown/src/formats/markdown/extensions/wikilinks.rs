//! Wiki link syntax extension
//!
//! - Links: `[[note]]`
//! - Links with aliases: `[[note|alias]]`
//! - Embeds: `![[note]]`
//!
//! The base grammar leaves these as literal text, so they are picked out of
//! text nodes after parsing. Code spans are separate nodes and never scanned.

use super::TreeExtension;
use crate::error::ConversionError;
use crate::ir::nodes::{Inline, Root};
use crate::ir::visit::map_inlines;
use once_cell::sync::Lazy;
use regex::Regex;

static WIKILINK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(!?)\[\[([^\[\]\n]+)\]\]").expect("wikilink regex"));

pub struct WikiLinkExtension;

impl TreeExtension for WikiLinkExtension {
    fn name(&self) -> &'static str {
        "wiki-links"
    }

    fn apply(&self, root: &mut Root, _source: &str) -> Result<(), ConversionError> {
        map_inlines(root, &mut split_wiki_links);
        Ok(())
    }
}

/// Replace wiki link syntax inside text nodes with wiki link nodes.
pub fn split_wiki_links(nodes: Vec<Inline>) -> Vec<Inline> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Inline::Text(text) if text.contains("[[") => split_text(&text, &mut out),
            other => out.push(other),
        }
    }
    out
}

fn split_text(text: &str, out: &mut Vec<Inline>) {
    let mut cursor = 0;
    for captures in WIKILINK_REGEX.captures_iter(text) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let body = captures.get(2).map_or("", |m| m.as_str());
        let Some(node) = wiki_node(!captures[1].is_empty(), body) else {
            continue;
        };
        if whole.start() > cursor {
            out.push(Inline::Text(text[cursor..whole.start()].to_string()));
        }
        out.push(node);
        cursor = whole.end();
    }
    if cursor < text.len() {
        out.push(Inline::Text(text[cursor..].to_string()));
    }
}

fn wiki_node(embed: bool, body: &str) -> Option<Inline> {
    let (target, alias) = match body.split_once('|') {
        Some((target, alias)) => (target.trim(), Some(alias.trim())),
        None => (body.trim(), None),
    };
    if target.is_empty() {
        return None;
    }
    if embed {
        return Some(Inline::WikiEmbed(target.to_string()));
    }
    Some(Inline::WikiLink {
        target: target.to_string(),
        alias: alias.filter(|a| !a.is_empty()).map(str::to_string),
    })
}
