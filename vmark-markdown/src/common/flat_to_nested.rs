//! Converts the flat-run document tree back into the nested syntax tree.
//!
//! # The High-Level Concept
//!
//! A run only knows *which* marks it carries, not how they were nested in the
//! source. The converter therefore fixes one canonical nesting order,
//! [`MARK_ORDER`] (link outermost, code innermost), and rebuilds the wrappers
//! level by level.
//!
//! # The Algorithm
//!
//! At nesting level `n` (the `n`-th mark kind in [`MARK_ORDER`]):
//!
//! 1. **Grouping:**
//!    - Split the runs into maximal consecutive groups that agree on the mark
//!      of this kind (same link target counts as agreeing; "no mark" is a
//!      group too)
//!
//! 2. **Wrapping:**
//!    - A group with the mark becomes one wrapper node whose children are the
//!      group converted at level `n + 1`
//!    - A group without it is converted at level `n + 1` in place
//!    - At the code level, the group's text is joined into one inline code
//!
//! 3. **Leaves:**
//!    - Past the last level, runs become leaf nodes and adjacent text merges
//!
//! Grouping runs before wrapping is what keeps `**ab**` from coming back as
//! `**a****b**`, and it makes conversion stable across round trips.

use crate::common::nested_to_flat::checked_level;
use crate::document::marks::{find_mark, MARK_ORDER};
use crate::document::{DocNode, Document, Mark, MarkKind, Run, RunContent};
use crate::error::ConversionError;
use crate::ir::nodes::{
    merge_adjacent_text, plain_text, Block, Details, Inline, LinkDefinition, List, ListItem,
    Root, Table, MATH_BLOCK_LANG,
};

/// Converts a document tree to a syntax tree.
pub fn document_to_syntax(doc: &Document, strict: bool) -> Result<Root, ConversionError> {
    Ok(Root {
        children: convert_nodes(&doc.children, strict)?,
    })
}

fn convert_nodes(nodes: &[DocNode], strict: bool) -> Result<Vec<Block>, ConversionError> {
    nodes.iter().map(|node| convert_node(node, strict)).collect()
}

fn convert_node(node: &DocNode, strict: bool) -> Result<Block, ConversionError> {
    let block = match node {
        DocNode::Paragraph { content } => Block::Paragraph(runs_to_inlines(content)),
        DocNode::Heading { level, content } => Block::Heading {
            level: checked_level(*level, strict)?,
            children: runs_to_inlines(content),
        },
        DocNode::CodeBlock { language, code } => Block::Code {
            lang: language.clone(),
            value: code.clone(),
        },
        DocNode::MathBlock { tex } => Block::Code {
            lang: Some(MATH_BLOCK_LANG.to_string()),
            value: tex.clone(),
        },
        DocNode::Blockquote { children } => Block::Blockquote(convert_nodes(children, strict)?),
        DocNode::List {
            ordered,
            start,
            tight,
            items,
        } => Block::List(List {
            ordered: *ordered,
            start: if *ordered { Some(start.unwrap_or(1)) } else { None },
            tight: *tight,
            items: items
                .iter()
                .map(|item| {
                    Ok(ListItem {
                        checked: item.checked,
                        children: convert_nodes(&item.children, strict)?,
                    })
                })
                .collect::<Result<_, ConversionError>>()?,
        }),
        DocNode::HorizontalRule => Block::ThematicBreak,
        DocNode::Table { alignments, rows } => {
            let columns = alignments
                .len()
                .max(rows.first().map_or(0, Vec::len));
            let mut table_rows = Vec::with_capacity(rows.len());
            for (index, row) in rows.iter().enumerate() {
                if row.len() != columns {
                    ConversionError::RaggedTable {
                        row: index,
                        expected: columns,
                        found: row.len(),
                    }
                    .report(strict)?;
                }
                let mut cells: Vec<Vec<Inline>> = row
                    .iter()
                    .take(columns)
                    .map(|cell| runs_to_inlines(cell))
                    .collect();
                cells.resize_with(columns, Vec::new);
                table_rows.push(cells);
            }
            let mut align = alignments.clone();
            align.resize(columns, Default::default());
            Block::Table(Table {
                align,
                rows: table_rows,
            })
        }
        DocNode::HtmlBlock { html } => Block::Html(html.clone()),
        DocNode::Frontmatter { yaml } => Block::Frontmatter(yaml.clone()),
        DocNode::Details {
            open,
            summary,
            children,
        } => Block::Details(Details {
            open: *open,
            summary: summary.clone(),
            children: convert_nodes(children, strict)?,
        }),
        DocNode::Alert { kind, children } => Block::Alert {
            kind: *kind,
            children: convert_nodes(children, strict)?,
        },
        DocNode::FootnoteDefinition { label, children } => Block::FootnoteDefinition {
            label: label.clone(),
            children: convert_nodes(children, strict)?,
        },
        DocNode::LinkDefinition {
            identifier,
            url,
            title,
        } => Block::LinkDefinition(LinkDefinition {
            identifier: identifier.clone(),
            url: url.clone(),
            title: title.clone(),
        }),
    };
    Ok(block)
}

/// Rebuild nested phrasing content from runs.
pub fn runs_to_inlines(runs: &[Run]) -> Vec<Inline> {
    wrap_runs(runs, 0)
}

fn wrap_runs(runs: &[Run], level: usize) -> Vec<Inline> {
    let Some(&kind) = MARK_ORDER.get(level) else {
        let mut leaves: Vec<Inline> = runs.iter().map(|run| leaf(&run.content)).collect();
        merge_adjacent_text(&mut leaves);
        return leaves;
    };

    let mut out = Vec::new();
    let mut index = 0;
    while index < runs.len() {
        let mark = find_mark(&runs[index].marks, kind);
        let len = runs[index..]
            .iter()
            .take_while(|run| find_mark(&run.marks, kind) == mark)
            .count();
        let group = &runs[index..index + len];
        match mark {
            None => out.extend(wrap_runs(group, level + 1)),
            Some(_) if kind == MarkKind::Code => out.extend(code_group(group)),
            Some(mark) => {
                let children = wrap_runs(group, level + 1);
                if !children.is_empty() {
                    out.push(wrapper(mark, children));
                }
            }
        }
        index += len;
    }
    merge_adjacent_text(&mut out);
    out
}

/// Text under a code mark joins into inline code; anything else stays a leaf.
fn code_group(group: &[Run]) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut code = String::new();
    for run in group {
        match &run.content {
            RunContent::Text { text } => code.push_str(text),
            other => {
                if !code.is_empty() {
                    out.push(Inline::InlineCode(std::mem::take(&mut code)));
                }
                out.push(leaf(other));
            }
        }
    }
    if !code.is_empty() {
        out.push(Inline::InlineCode(code));
    }
    out
}

fn wrapper(mark: &Mark, children: Vec<Inline>) -> Inline {
    match mark {
        Mark::Link { href, title } => Inline::Link {
            url: href.clone(),
            title: title.clone(),
            children,
        },
        Mark::Highlight => Inline::Highlight(children),
        Mark::Underline => Inline::Underline(children),
        Mark::Strike => Inline::Delete(children),
        Mark::Bold => Inline::Strong(children),
        Mark::Italic => Inline::Emphasis(children),
        Mark::Subscript => Inline::Subscript(children),
        Mark::Superscript => Inline::Superscript(children),
        // Code never wraps: `code_group` handles it.
        Mark::Code => Inline::InlineCode(plain_text(&children)),
    }
}

fn leaf(content: &RunContent) -> Inline {
    match content {
        RunContent::Text { text } => Inline::Text(text.clone()),
        RunContent::HardBreak => Inline::Break,
        RunContent::Image { src, alt, title } => Inline::Image {
            url: src.clone(),
            alt: alt.clone(),
            title: title.clone(),
        },
        RunContent::Math { tex } => Inline::InlineMath(tex.clone()),
        RunContent::Html { html } => Inline::Html(html.clone()),
        RunContent::FootnoteRef { label } => Inline::FootnoteReference(label.clone()),
        RunContent::WikiLink { target, alias } => Inline::WikiLink {
            target: target.clone(),
            alias: alias.clone(),
        },
        RunContent::WikiEmbed { target } => Inline::WikiEmbed(target.clone()),
    }
}
