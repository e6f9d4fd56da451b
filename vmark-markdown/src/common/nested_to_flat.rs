//! Converts the nested syntax tree into the flat-run document tree.
//!
//! # The High-Level Concept
//!
//! Blocks map one-to-one. Inline wrappers (strong, emphasis, links, the custom
//! marks, inline code) do not survive as nodes: walking down into a wrapper
//! adds its mark to an accumulated mark set, and every leaf underneath becomes
//! a run carrying that whole set. Nesting is thereby flattened into "this run
//! is bold and subscript at once".
//!
//! # The Algorithm
//!
//! 1. **Blocks:**
//!    - Map each syntax block to its document counterpart
//!    - Math stored as a sentinel-tagged code block becomes a math block
//!    - Headings outside 1..=6 and ragged tables are reported and repaired
//!
//! 2. **Entering Wrappers:**
//!    - Insert the wrapper's mark into the current set, in rank order
//!    - Recurse into the children with the extended set
//!
//! 3. **Leaves:**
//!    - Text, images, breaks, math, html, footnote references and wiki links
//!      become runs with the current mark set
//!
//! 4. **Coalescing:**
//!    - Adjacent text runs with identical marks merge into one run
//!
//! This mirrors the reverse process performed in `flat_to_nested`.

use crate::document::{DocListItem, DocNode, Document, Mark, Run, RunContent};
use crate::error::ConversionError;
use crate::ir::nodes::{Block, Inline, Root, MATH_BLOCK_LANG};

/// Converts a syntax tree to a document tree.
pub fn syntax_to_document(root: &Root, strict: bool) -> Result<Document, ConversionError> {
    Ok(Document::new(convert_blocks(&root.children, strict)?))
}

fn convert_blocks(blocks: &[Block], strict: bool) -> Result<Vec<DocNode>, ConversionError> {
    blocks
        .iter()
        .map(|block| convert_block(block, strict))
        .collect()
}

fn convert_block(block: &Block, strict: bool) -> Result<DocNode, ConversionError> {
    let node = match block {
        Block::Paragraph(children) => DocNode::Paragraph {
            content: inline_runs(children),
        },
        Block::Heading { level, children } => DocNode::Heading {
            level: checked_level(*level, strict)?,
            content: inline_runs(children),
        },
        Block::Code { lang, value } if lang.as_deref() == Some(MATH_BLOCK_LANG) => {
            DocNode::MathBlock { tex: value.clone() }
        }
        Block::Code { lang, value } => DocNode::CodeBlock {
            language: lang.clone(),
            code: value.clone(),
        },
        Block::Blockquote(children) => DocNode::Blockquote {
            children: convert_blocks(children, strict)?,
        },
        Block::List(list) => DocNode::List {
            ordered: list.ordered,
            start: list.start,
            tight: list.tight,
            items: list
                .items
                .iter()
                .map(|item| {
                    Ok(DocListItem {
                        checked: item.checked,
                        children: convert_blocks(&item.children, strict)?,
                    })
                })
                .collect::<Result<_, ConversionError>>()?,
        },
        Block::ThematicBreak => DocNode::HorizontalRule,
        Block::Table(table) => {
            let columns = if table.align.is_empty() {
                table.rows.first().map_or(0, Vec::len)
            } else {
                table.align.len()
            };
            let mut rows = Vec::with_capacity(table.rows.len());
            for (index, row) in table.rows.iter().enumerate() {
                if row.len() != columns {
                    ConversionError::RaggedTable {
                        row: index,
                        expected: columns,
                        found: row.len(),
                    }
                    .report(strict)?;
                }
                let mut cells: Vec<Vec<Run>> =
                    row.iter().take(columns).map(|cell| inline_runs(cell)).collect();
                cells.resize_with(columns, Vec::new);
                rows.push(cells);
            }
            DocNode::Table {
                alignments: table.align.clone(),
                rows,
            }
        }
        Block::Html(html) => DocNode::HtmlBlock { html: html.clone() },
        Block::Frontmatter(yaml) => DocNode::Frontmatter { yaml: yaml.clone() },
        Block::Details(details) => DocNode::Details {
            open: details.open,
            summary: details.summary.clone(),
            children: convert_blocks(&details.children, strict)?,
        },
        Block::Alert { kind, children } => DocNode::Alert {
            kind: *kind,
            children: convert_blocks(children, strict)?,
        },
        Block::FootnoteDefinition { label, children } => DocNode::FootnoteDefinition {
            label: label.clone(),
            children: convert_blocks(children, strict)?,
        },
        Block::LinkDefinition(definition) => DocNode::LinkDefinition {
            identifier: definition.identifier.clone(),
            url: definition.url.clone(),
            title: definition.title.clone(),
        },
    };
    Ok(node)
}

/// Heading levels outside 1..=6 are clamped in lenient mode.
pub(crate) fn checked_level(level: u8, strict: bool) -> Result<u8, ConversionError> {
    if !(1..=6).contains(&level) {
        ConversionError::InvalidHeadingLevel(level).report(strict)?;
    }
    Ok(level.clamp(1, 6))
}

/// Flatten phrasing content into runs.
pub fn inline_runs(nodes: &[Inline]) -> Vec<Run> {
    let mut runs = Vec::new();
    collect_runs(nodes, &[], &mut runs);
    runs
}

fn collect_runs(nodes: &[Inline], marks: &[Mark], runs: &mut Vec<Run>) {
    for node in nodes {
        let (mark, children) = match node {
            Inline::Strong(children) => (Mark::Bold, children),
            Inline::Emphasis(children) => (Mark::Italic, children),
            Inline::Delete(children) => (Mark::Strike, children),
            Inline::Highlight(children) => (Mark::Highlight, children),
            Inline::Underline(children) => (Mark::Underline, children),
            Inline::Subscript(children) => (Mark::Subscript, children),
            Inline::Superscript(children) => (Mark::Superscript, children),
            Inline::Link {
                url,
                title,
                children,
            } => (
                Mark::Link {
                    href: url.clone(),
                    title: title.clone(),
                },
                children,
            ),
            leaf => {
                push_leaf(leaf, marks, runs);
                continue;
            }
        };
        collect_runs(children, &mark.add_to_set(marks), runs);
    }
}

fn push_leaf(leaf: &Inline, marks: &[Mark], runs: &mut Vec<Run>) {
    let (content, marks) = match leaf {
        Inline::Text(text) => (RunContent::Text { text: text.clone() }, marks.to_vec()),
        Inline::InlineCode(code) => (
            RunContent::Text { text: code.clone() },
            Mark::Code.add_to_set(marks),
        ),
        Inline::Image { url, alt, title } => (
            RunContent::Image {
                src: url.clone(),
                alt: alt.clone(),
                title: title.clone(),
            },
            marks.to_vec(),
        ),
        Inline::Break => (RunContent::HardBreak, marks.to_vec()),
        Inline::InlineMath(tex) => (RunContent::Math { tex: tex.clone() }, marks.to_vec()),
        Inline::Html(html) => (RunContent::Html { html: html.clone() }, marks.to_vec()),
        Inline::FootnoteReference(label) => (
            RunContent::FootnoteRef {
                label: label.clone(),
            },
            marks.to_vec(),
        ),
        Inline::WikiLink { target, alias } => (
            RunContent::WikiLink {
                target: target.clone(),
                alias: alias.clone(),
            },
            marks.to_vec(),
        ),
        Inline::WikiEmbed(target) => (
            RunContent::WikiEmbed {
                target: target.clone(),
            },
            marks.to_vec(),
        ),
        // Wrappers are handled by the caller.
        _ => return,
    };

    if let (Some(last), RunContent::Text { text }) = (runs.last_mut(), &content) {
        if let RunContent::Text { text: previous } = &mut last.content {
            if last.marks == marks {
                previous.push_str(text);
                return;
            }
        }
    }
    if matches!(&content, RunContent::Text { text } if text.is_empty()) {
        return;
    }
    runs.push(Run { content, marks });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::nodes::{Alignment, Table};

    fn text(value: &str) -> Inline {
        Inline::Text(value.to_string())
    }

    #[test]
    fn wrappers_become_marks() {
        let runs = inline_runs(&[
            text("a "),
            Inline::Strong(vec![
                text("b"),
                Inline::Subscript(vec![text("c")]),
                Inline::Emphasis(vec![Inline::InlineCode("d".into())]),
            ]),
        ]);
        assert_eq!(
            runs,
            vec![
                Run::text("a "),
                Run::text("b").with_marks(vec![Mark::Bold]),
                Run::text("c").with_marks(vec![Mark::Bold, Mark::Subscript]),
                Run::text("d").with_marks(vec![Mark::Bold, Mark::Italic, Mark::Code]),
            ]
        );
    }

    #[test]
    fn marks_are_ranked_regardless_of_nesting() {
        let outer_italic = inline_runs(&[Inline::Emphasis(vec![Inline::Strong(vec![text("x")])])]);
        let outer_bold = inline_runs(&[Inline::Strong(vec![Inline::Emphasis(vec![text("x")])])]);
        assert_eq!(outer_italic, outer_bold);
        assert_eq!(outer_bold[0].marks, vec![Mark::Bold, Mark::Italic]);
    }

    #[test]
    fn adjacent_text_with_equal_marks_coalesces() {
        let runs = inline_runs(&[
            Inline::Strong(vec![text("a")]),
            Inline::Strong(vec![text("b")]),
            text(""),
            Inline::Break,
            text("c"),
        ]);
        assert_eq!(
            runs,
            vec![
                Run::text("ab").with_marks(vec![Mark::Bold]),
                Run {
                    content: RunContent::HardBreak,
                    marks: vec![],
                },
                Run::text("c"),
            ]
        );
    }

    #[test]
    fn links_carry_their_target() {
        let runs = inline_runs(&[Inline::Link {
            url: "/x".into(),
            title: Some("T".into()),
            children: vec![Inline::Image {
                url: "/i.png".into(),
                alt: "i".into(),
                title: None,
            }],
        }]);
        assert_eq!(
            runs[0].marks,
            vec![Mark::Link {
                href: "/x".into(),
                title: Some("T".into()),
            }]
        );
        assert!(matches!(runs[0].content, RunContent::Image { .. }));
    }

    #[test]
    fn math_code_blocks_become_math_blocks() {
        let doc = syntax_to_document(
            &Root {
                children: vec![
                    Block::Code {
                        lang: Some(MATH_BLOCK_LANG.into()),
                        value: "x^2".into(),
                    },
                    Block::Code {
                        lang: Some("latex".into()),
                        value: "x^2".into(),
                    },
                ],
            },
            true,
        )
        .unwrap();
        assert_eq!(
            doc.children,
            vec![
                DocNode::MathBlock { tex: "x^2".into() },
                DocNode::CodeBlock {
                    language: Some("latex".into()),
                    code: "x^2".into(),
                },
            ]
        );
    }

    #[test]
    fn invalid_heading_level_is_clamped_or_rejected() {
        let root = Root {
            children: vec![Block::Heading {
                level: 9,
                children: vec![text("deep")],
            }],
        };
        assert_eq!(
            syntax_to_document(&root, true),
            Err(ConversionError::InvalidHeadingLevel(9))
        );
        let doc = syntax_to_document(&root, false).unwrap();
        assert!(matches!(doc.children[0], DocNode::Heading { level: 6, .. }));
    }

    #[test]
    fn ragged_tables_are_padded() {
        let root = Root {
            children: vec![Block::Table(Table {
                align: vec![Alignment::Left, Alignment::Center],
                rows: vec![vec![vec![text("a")], vec![text("b")]], vec![vec![text("1")]]],
            })],
        };
        assert_eq!(
            syntax_to_document(&root, true),
            Err(ConversionError::RaggedTable {
                row: 1,
                expected: 2,
                found: 1,
            })
        );
        let doc = syntax_to_document(&root, false).unwrap();
        match &doc.children[0] {
            DocNode::Table { rows, alignments } => {
                assert_eq!(alignments, &vec![Alignment::Left, Alignment::Center]);
                assert_eq!(rows[1], vec![vec![Run::text("1")], vec![]]);
            }
            other => panic!("expected table, got {other:?}"),
        }
    }
}
