//! GitHub-style alerts: a blockquote opening with `[!NOTE]`, `[!TIP]`,
//! `[!IMPORTANT]`, `[!WARNING]` or `[!CAUTION]` on its own line.

use super::TreeExtension;
use crate::error::ConversionError;
use crate::ir::nodes::{AlertKind, Block, Inline, Root};
use crate::ir::visit::walk_block_lists;
use once_cell::sync::Lazy;
use regex::Regex;

static ALERT_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[!([A-Za-z]+)\][ \t]*(?:\n|$)").expect("alert marker regex"));

pub struct AlertExtension;

impl TreeExtension for AlertExtension {
    fn name(&self) -> &'static str {
        "alerts"
    }

    fn apply(&self, root: &mut Root, _source: &str) -> Result<(), ConversionError> {
        walk_block_lists(&mut root.children, &mut |blocks| {
            for block in blocks.iter_mut() {
                if let Block::Blockquote(children) = block {
                    if let Some(kind) = take_marker(children) {
                        *block = Block::Alert {
                            kind,
                            children: std::mem::take(children),
                        };
                    }
                }
            }
        });
        Ok(())
    }
}

/// Strip the alert marker from the first paragraph and return its kind.
fn take_marker(children: &mut Vec<Block>) -> Option<AlertKind> {
    let Some(Block::Paragraph(inlines)) = children.first_mut() else {
        return None;
    };
    let Some(Inline::Text(text)) = inlines.first_mut() else {
        return None;
    };
    let captures = ALERT_MARKER.captures(text)?;
    let kind = AlertKind::from_label(&captures[1])?;
    let consumed = captures.get(0).map_or(0, |m| m.end());
    text.replace_range(..consumed, "");
    if text.is_empty() {
        inlines.remove(0);
    }
    if inlines.is_empty() {
        children.remove(0);
    }
    Some(kind)
}
