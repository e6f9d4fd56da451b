//! Mutable walkers over the syntax tree, shared by the grammar extensions.

use super::nodes::{Block, Inline, Root};

/// Whether a visited string is prose or verbatim source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    /// Text, titles, alt text, labels, urls.
    Text,
    /// Code, math, html and frontmatter.
    Raw,
}

/// Call `f` on every block sequence, innermost containers first.
pub fn walk_block_lists(blocks: &mut Vec<Block>, f: &mut dyn FnMut(&mut Vec<Block>)) {
    for block in blocks.iter_mut() {
        for children in child_block_lists(block) {
            walk_block_lists(children, f);
        }
    }
    f(blocks);
}

fn child_block_lists(block: &mut Block) -> Vec<&mut Vec<Block>> {
    match block {
        Block::Blockquote(children)
        | Block::Alert { children, .. }
        | Block::FootnoteDefinition { children, .. } => vec![children],
        Block::Details(details) => vec![&mut details.children],
        Block::List(list) => list.items.iter_mut().map(|item| &mut item.children).collect(),
        _ => Vec::new(),
    }
}

/// Rewrite every inline sequence in the tree with `f`.
///
/// Wrapper children are rewritten before the sequence that contains them.
pub fn map_inlines(root: &mut Root, f: &mut dyn FnMut(Vec<Inline>) -> Vec<Inline>) {
    walk_block_lists(&mut root.children, &mut |blocks| {
        for block in blocks.iter_mut() {
            match block {
                Block::Paragraph(children) | Block::Heading { children, .. } => {
                    map_inline_list(children, f)
                }
                Block::Table(table) => {
                    for cell in table.rows.iter_mut().flatten() {
                        map_inline_list(cell, f);
                    }
                }
                _ => {}
            }
        }
    });
}

fn map_inline_list(nodes: &mut Vec<Inline>, f: &mut dyn FnMut(Vec<Inline>) -> Vec<Inline>) {
    for node in nodes.iter_mut() {
        if let Some(children) = node.children_mut() {
            map_inline_list(children, f);
        }
    }
    *nodes = f(std::mem::take(nodes));
}

/// Visit every string-valued field in the tree.
pub fn visit_strings_mut(root: &mut Root, f: &mut dyn FnMut(StringKind, &mut String)) {
    for block in root.children.iter_mut() {
        visit_block(block, f);
    }
}

fn visit_block(block: &mut Block, f: &mut dyn FnMut(StringKind, &mut String)) {
    match block {
        Block::Paragraph(children) | Block::Heading { children, .. } => visit_inlines(children, f),
        Block::Code { value, .. } => f(StringKind::Raw, value),
        Block::Html(value) | Block::Frontmatter(value) => f(StringKind::Raw, value),
        Block::Blockquote(children) | Block::Alert { children, .. } => {
            children.iter_mut().for_each(|child| visit_block(child, f))
        }
        Block::FootnoteDefinition { label, children } => {
            f(StringKind::Text, label);
            children.iter_mut().for_each(|child| visit_block(child, f));
        }
        Block::List(list) => {
            for item in list.items.iter_mut() {
                item.children.iter_mut().for_each(|child| visit_block(child, f));
            }
        }
        Block::Table(table) => {
            for cell in table.rows.iter_mut().flatten() {
                visit_inlines(cell, f);
            }
        }
        Block::Details(details) => {
            f(StringKind::Raw, &mut details.summary);
            details
                .children
                .iter_mut()
                .for_each(|child| visit_block(child, f));
        }
        Block::LinkDefinition(definition) => {
            f(StringKind::Text, &mut definition.identifier);
            f(StringKind::Text, &mut definition.url);
            if let Some(title) = definition.title.as_mut() {
                f(StringKind::Text, title);
            }
        }
        Block::ThematicBreak => {}
    }
}

fn visit_inlines(nodes: &mut [Inline], f: &mut dyn FnMut(StringKind, &mut String)) {
    for node in nodes.iter_mut() {
        match node {
            Inline::Text(value) => f(StringKind::Text, value),
            Inline::InlineCode(value) | Inline::InlineMath(value) | Inline::Html(value) => {
                f(StringKind::Raw, value)
            }
            Inline::Link {
                url,
                title,
                children,
            } => {
                f(StringKind::Text, url);
                if let Some(title) = title.as_mut() {
                    f(StringKind::Text, title);
                }
                visit_inlines(children, f);
            }
            Inline::Image { url, alt, title } => {
                f(StringKind::Text, url);
                f(StringKind::Text, alt);
                if let Some(title) = title.as_mut() {
                    f(StringKind::Text, title);
                }
            }
            Inline::FootnoteReference(label) | Inline::WikiEmbed(label) => {
                f(StringKind::Text, label)
            }
            Inline::WikiLink { target, alias } => {
                f(StringKind::Text, target);
                if let Some(alias) = alias.as_mut() {
                    f(StringKind::Text, alias);
                }
            }
            Inline::Strong(children)
            | Inline::Emphasis(children)
            | Inline::Delete(children)
            | Inline::Subscript(children)
            | Inline::Superscript(children)
            | Inline::Highlight(children)
            | Inline::Underline(children) => visit_inlines(children, f),
            Inline::Break => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::nodes::{List, ListItem};

    #[test]
    fn map_inlines_reaches_nested_lists() {
        let mut root = Root {
            children: vec![Block::List(List {
                ordered: false,
                start: None,
                tight: true,
                items: vec![ListItem {
                    checked: None,
                    children: vec![Block::Paragraph(vec![Inline::Strong(vec![Inline::Text(
                        "a".into(),
                    )])])],
                }],
            })],
        };
        let mut seen = 0;
        map_inlines(&mut root, &mut |nodes| {
            seen += 1;
            nodes
                .into_iter()
                .map(|node| match node {
                    Inline::Text(text) => Inline::Text(text.to_uppercase()),
                    other => other,
                })
                .collect()
        });
        assert_eq!(seen, 2);
        let Block::List(list) = &root.children[0] else {
            panic!("expected a list");
        };
        assert_eq!(
            list.items[0].children[0],
            Block::Paragraph(vec![Inline::Strong(vec![Inline::Text("A".into())])])
        );
    }

    #[test]
    fn strings_are_classified() {
        let mut root = Root {
            children: vec![
                Block::Code {
                    lang: None,
                    value: "code".into(),
                },
                Block::Paragraph(vec![Inline::Text("text".into())]),
            ],
        };
        let mut kinds = Vec::new();
        visit_strings_mut(&mut root, &mut |kind, value| kinds.push((kind, value.clone())));
        assert_eq!(
            kinds,
            vec![
                (StringKind::Raw, "code".to_string()),
                (StringKind::Text, "text".to_string())
            ]
        );
    }
}
