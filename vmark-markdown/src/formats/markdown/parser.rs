//! Full markdown parser (Markdown → syntax tree)
//!
//! Comrak provides the base grammar (CommonMark plus GFM tables, task lists,
//! strikethrough and footnotes). Math and frontmatter are switched on only
//! when the sniffer saw them. The Comrak AST is mapped one-to-one onto the IR;
//! everything markdown-specific beyond that lives in the extensions.

use crate::error::ConversionError;
use crate::formats::markdown::sniff::ExtensionNeeds;
use crate::ir::nodes::{
    merge_adjacent_text, plain_text, Alignment, Block, Inline, List, ListItem, Root, Table,
    MATH_BLOCK_LANG,
};
use comrak::nodes::{AstNode, ListType, NodeValue, TableAlignment};
use comrak::{parse_document, Arena, ComrakOptions};

/// Comrak options for a source with the given extension needs.
pub fn comrak_options(needs: &ExtensionNeeds) -> ComrakOptions<'static> {
    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.tasklist = true;
    options.extension.footnotes = true;
    options.extension.math_dollars = needs.math;
    if needs.frontmatter {
        options.extension.front_matter_delimiter = Some("---".to_string());
    }
    options
}

/// Parse preprocessed markdown into a syntax tree, before extensions run.
pub fn parse_full(source: &str, needs: &ExtensionNeeds, strict: bool) -> Result<Root, ConversionError> {
    Ok(Root {
        children: parse_blocks(source, needs, strict)?,
    })
}

/// Parse a markdown fragment into blocks.
pub fn parse_blocks(
    source: &str,
    needs: &ExtensionNeeds,
    strict: bool,
) -> Result<Vec<Block>, ConversionError> {
    let arena = Arena::new();
    let options = comrak_options(needs);
    let root = parse_document(&arena, source, &options);
    convert_children(root, strict)
}

fn convert_children<'a>(node: &'a AstNode<'a>, strict: bool) -> Result<Vec<Block>, ConversionError> {
    let mut blocks = Vec::new();
    for child in node.children() {
        if let Some(block) = convert_block(child, strict)? {
            blocks.push(block);
        }
    }
    Ok(blocks)
}

fn convert_block<'a>(node: &'a AstNode<'a>, strict: bool) -> Result<Option<Block>, ConversionError> {
    let value = node.data.borrow().value.clone();
    let block = match value {
        NodeValue::Paragraph => {
            if let Some(tex) = display_math_only(node) {
                Block::Code {
                    lang: Some(MATH_BLOCK_LANG.to_string()),
                    value: tex,
                }
            } else {
                Block::Paragraph(convert_inlines(node, strict)?)
            }
        }

        NodeValue::Heading(heading) => Block::Heading {
            level: heading.level,
            children: convert_inlines(node, strict)?,
        },

        NodeValue::CodeBlock(code) => {
            let info = code.info.trim();
            let value = code
                .literal
                .strip_suffix('\n')
                .unwrap_or(&code.literal)
                .to_string();
            Block::Code {
                lang: (!info.is_empty()).then(|| info.to_string()),
                value,
            }
        }

        NodeValue::BlockQuote => Block::Blockquote(convert_children(node, strict)?),

        NodeValue::List(list) => {
            let ordered = matches!(list.list_type, ListType::Ordered);
            let mut items = Vec::new();
            for child in node.children() {
                if let Some(item) = convert_item(child, strict)? {
                    items.push(item);
                }
            }
            Block::List(List {
                ordered,
                start: ordered.then_some(list.start as u64),
                tight: list.tight,
                items,
            })
        }

        NodeValue::ThematicBreak => Block::ThematicBreak,

        NodeValue::Table(table) => {
            let align = table
                .alignments
                .iter()
                .map(|alignment| match alignment {
                    TableAlignment::Left => Alignment::Left,
                    TableAlignment::Center => Alignment::Center,
                    TableAlignment::Right => Alignment::Right,
                    TableAlignment::None => Alignment::None,
                })
                .collect();
            let mut rows = Vec::new();
            for row in node.children() {
                let mut cells = Vec::new();
                for cell in row.children() {
                    cells.push(convert_inlines(cell, strict)?);
                }
                rows.push(cells);
            }
            Block::Table(Table { align, rows })
        }

        NodeValue::HtmlBlock(html) => Block::Html(html.literal.trim_end_matches('\n').to_string()),

        NodeValue::FrontMatter(raw) => Block::Frontmatter(strip_frontmatter(&raw)),

        NodeValue::FootnoteDefinition(definition) => Block::FootnoteDefinition {
            label: definition.name,
            children: convert_children(node, strict)?,
        },

        other => {
            ConversionError::UnsupportedNode {
                context: "block",
                kind: node_kind(&other),
            }
            .report(strict)?;
            return Ok(None);
        }
    };
    Ok(Some(block))
}

fn convert_item<'a>(node: &'a AstNode<'a>, strict: bool) -> Result<Option<ListItem>, ConversionError> {
    let checked = match &node.data.borrow().value {
        NodeValue::Item(_) => None,
        NodeValue::TaskItem(symbol) => Some(symbol.is_some()),
        other => {
            ConversionError::UnsupportedNode {
                context: "list",
                kind: node_kind(other),
            }
            .report(strict)?;
            return Ok(None);
        }
    };
    Ok(Some(ListItem {
        checked,
        children: convert_children(node, strict)?,
    }))
}

/// A paragraph holding nothing but one `$$...$$` span is block math.
fn display_math_only<'a>(node: &'a AstNode<'a>) -> Option<String> {
    let mut tex = None;
    for child in node.children() {
        match &child.data.borrow().value {
            NodeValue::Math(math) if math.display_math && tex.is_none() => {
                tex = Some(math.literal.trim_matches('\n').to_string());
            }
            NodeValue::SoftBreak => {}
            NodeValue::Text(text) if text.trim().is_empty() => {}
            _ => return None,
        }
    }
    tex
}

fn convert_inlines<'a>(node: &'a AstNode<'a>, strict: bool) -> Result<Vec<Inline>, ConversionError> {
    let mut inlines = Vec::new();
    for child in node.children() {
        if let Some(inline) = convert_inline(child, strict)? {
            inlines.push(inline);
        }
    }
    merge_adjacent_text(&mut inlines);
    Ok(inlines)
}

fn convert_inline<'a>(node: &'a AstNode<'a>, strict: bool) -> Result<Option<Inline>, ConversionError> {
    let value = node.data.borrow().value.clone();
    let inline = match value {
        NodeValue::Text(text) => Inline::Text(text),
        NodeValue::SoftBreak => Inline::Text("\n".to_string()),
        NodeValue::LineBreak => Inline::Break,
        NodeValue::Code(code) => Inline::InlineCode(code.literal),
        NodeValue::HtmlInline(html) => Inline::Html(html),
        NodeValue::Emph => Inline::Emphasis(convert_inlines(node, strict)?),
        NodeValue::Strong => Inline::Strong(convert_inlines(node, strict)?),
        NodeValue::Strikethrough => Inline::Delete(convert_inlines(node, strict)?),
        NodeValue::Link(link) => Inline::Link {
            url: link.url,
            title: non_empty(link.title),
            children: convert_inlines(node, strict)?,
        },
        NodeValue::Image(link) => Inline::Image {
            url: link.url,
            alt: plain_text(&convert_inlines(node, strict)?),
            title: non_empty(link.title),
        },
        NodeValue::FootnoteReference(reference) => Inline::FootnoteReference(reference.name),
        NodeValue::Math(math) => Inline::InlineMath(math.literal),
        other => {
            ConversionError::UnsupportedNode {
                context: "inline",
                kind: node_kind(&other),
            }
            .report(strict)?;
            return Ok(None);
        }
    };
    Ok(Some(inline))
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn strip_frontmatter(raw: &str) -> String {
    let body = raw.trim_end_matches(['\n', '\r']);
    let body = body.strip_prefix("---").unwrap_or(body);
    let body = body.strip_suffix("---").unwrap_or(body);
    body.trim_matches('\n').to_string()
}

fn node_kind(value: &NodeValue) -> String {
    let debug = format!("{value:?}");
    debug
        .split(|c: char| !c.is_alphanumeric())
        .next()
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Vec<Block> {
        parse_blocks(source, &ExtensionNeeds::detect(source), true).unwrap()
    }

    fn text(value: &str) -> Inline {
        Inline::Text(value.to_string())
    }

    #[test]
    fn paragraphs_keep_soft_breaks_as_newlines() {
        assert_eq!(
            parse("one\ntwo *three*"),
            vec![Block::Paragraph(vec![
                text("one\ntwo "),
                Inline::Emphasis(vec![text("three")]),
            ])]
        );
    }

    #[test]
    fn code_blocks_drop_the_final_newline() {
        assert_eq!(
            parse("```rust\nfn main() {}\n```"),
            vec![Block::Code {
                lang: Some("rust".into()),
                value: "fn main() {}".into(),
            }]
        );
    }

    #[test]
    fn task_lists_are_tri_state() {
        let blocks = parse("- [ ] todo\n- [x] done\n- plain");
        let Block::List(list) = &blocks[0] else {
            panic!("expected list, got {blocks:?}");
        };
        let checked: Vec<_> = list.items.iter().map(|item| item.checked).collect();
        assert_eq!(checked, vec![Some(false), Some(true), None]);
        assert!(list.tight);
        assert_eq!(list.start, None);
    }

    #[test]
    fn ordered_lists_keep_their_start() {
        let blocks = parse("3. three\n4. four");
        assert!(matches!(
            &blocks[0],
            Block::List(List { ordered: true, start: Some(3), .. })
        ));
    }

    #[test]
    fn table_alignment() {
        let blocks = parse("| a | b |\n|:-:|--:|\n| 1 | 2 |");
        assert_eq!(
            blocks,
            vec![Block::Table(Table {
                align: vec![Alignment::Center, Alignment::Right],
                rows: vec![
                    vec![vec![text("a")], vec![text("b")]],
                    vec![vec![text("1")], vec![text("2")]],
                ],
            })]
        );
    }

    #[test]
    fn dollar_amounts_are_not_math() {
        assert_eq!(
            parse("$100 and $200"),
            vec![Block::Paragraph(vec![text("$100 and $200")])]
        );
    }

    #[test]
    fn math_spans() {
        assert_eq!(
            parse("energy $E=mc^2$"),
            vec![Block::Paragraph(vec![
                text("energy "),
                Inline::InlineMath("E=mc^2".into()),
            ])]
        );
    }

    #[test]
    fn frontmatter_is_raw_yaml() {
        assert_eq!(
            parse("---\ntitle: Notes\n---\n\nBody"),
            vec![
                Block::Frontmatter("title: Notes".into()),
                Block::Paragraph(vec![text("Body")]),
            ]
        );
    }

    #[test]
    fn footnotes() {
        let blocks = parse("Text[^n].\n\n[^n]: The note.");
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph(vec![
                    text("Text"),
                    Inline::FootnoteReference("n".into()),
                    text("."),
                ]),
                Block::FootnoteDefinition {
                    label: "n".into(),
                    children: vec![Block::Paragraph(vec![text("The note.")])],
                },
            ]
        );
    }

    #[test]
    fn images_flatten_alt_text() {
        assert_eq!(
            parse("![a *b*](/img.png \"T\")"),
            vec![Block::Paragraph(vec![Inline::Image {
                url: "/img.png".into(),
                alt: "a b".into(),
                title: Some("T".into()),
            }])]
        );
    }
}
