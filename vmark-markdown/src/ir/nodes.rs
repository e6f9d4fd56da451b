//! Core data structures for the syntax tree (the intermediate representation).
//!
//! Block and phrasing content live in two separate enums, so a block can never
//! end up inside a paragraph and vice versa: the content-category invariant is
//! carried by the types instead of being checked at runtime.

/// Language tag used to store block math as a code block.
///
/// It lives in the private use area so that no fenced block written by a user
/// can collide with it. The serializer turns it back into `$$ ... $$`.
pub const MATH_BLOCK_LANG: &str = "\u{F8FF}math";

/// Root of a parsed markdown document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Root {
    pub children: Vec<Block>,
}

/// Block-level nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Vec<Inline>),
    Heading {
        level: u8,
        children: Vec<Inline>,
    },
    /// Fenced or indented code. `value` carries no trailing newline.
    Code {
        lang: Option<String>,
        value: String,
    },
    Blockquote(Vec<Block>),
    List(List),
    ThematicBreak,
    Table(Table),
    Html(String),
    /// Raw YAML between the `---` fences.
    Frontmatter(String),
    Details(Details),
    Alert {
        kind: AlertKind,
        children: Vec<Block>,
    },
    FootnoteDefinition {
        label: String,
        children: Vec<Block>,
    },
    LinkDefinition(LinkDefinition),
}

#[derive(Debug, Clone, PartialEq)]
pub struct List {
    pub ordered: bool,
    /// Start number of an ordered list, `None` for bullet lists.
    pub start: Option<u64>,
    pub tight: bool,
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    /// `None` for a plain item, `Some(checked)` for a task item.
    pub checked: Option<bool>,
    pub children: Vec<Block>,
}

/// A table. The first row is the header row.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub align: Vec<Alignment>,
    pub rows: Vec<Vec<Vec<Inline>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Details {
    pub open: bool,
    /// Raw contents of the `<summary>` element, empty when absent.
    pub summary: String,
    pub children: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkDefinition {
    pub identifier: String,
    pub url: String,
    pub title: Option<String>,
}

/// Column alignment of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

/// GitHub-style alert flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
}

impl AlertKind {
    pub const ALL: [AlertKind; 5] = [
        AlertKind::Note,
        AlertKind::Tip,
        AlertKind::Important,
        AlertKind::Warning,
        AlertKind::Caution,
    ];

    /// The upper-case label used inside `[!...]`.
    pub fn label(self) -> &'static str {
        match self {
            AlertKind::Note => "NOTE",
            AlertKind::Tip => "TIP",
            AlertKind::Important => "IMPORTANT",
            AlertKind::Warning => "WARNING",
            AlertKind::Caution => "CAUTION",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(label))
    }
}

/// Phrasing (inline) nodes.
///
/// Soft line breaks are kept as `\n` inside `Text` values; only hard breaks
/// get their own `Break` node.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
    Delete(Vec<Inline>),
    InlineCode(String),
    Link {
        url: String,
        title: Option<String>,
        children: Vec<Inline>,
    },
    Image {
        url: String,
        alt: String,
        title: Option<String>,
    },
    Break,
    InlineMath(String),
    Html(String),
    FootnoteReference(String),
    WikiLink {
        target: String,
        alias: Option<String>,
    },
    WikiEmbed(String),
    Subscript(Vec<Inline>),
    Superscript(Vec<Inline>),
    Highlight(Vec<Inline>),
    Underline(Vec<Inline>),
}

impl Inline {
    /// Children of a wrapper node, `None` for leaves.
    pub fn children_mut(&mut self) -> Option<&mut Vec<Inline>> {
        match self {
            Inline::Strong(children)
            | Inline::Emphasis(children)
            | Inline::Delete(children)
            | Inline::Subscript(children)
            | Inline::Superscript(children)
            | Inline::Highlight(children)
            | Inline::Underline(children)
            | Inline::Link { children, .. } => Some(children),
            _ => None,
        }
    }
}

/// Concatenated text content of phrasing nodes, used for image alt text.
pub fn plain_text(nodes: &[Inline]) -> String {
    let mut out = String::new();
    collect_plain_text(nodes, &mut out);
    out
}

fn collect_plain_text(nodes: &[Inline], out: &mut String) {
    for node in nodes {
        match node {
            Inline::Text(value) | Inline::InlineCode(value) | Inline::InlineMath(value) => {
                out.push_str(value)
            }
            Inline::Image { alt, .. } => out.push_str(alt),
            Inline::Break => out.push('\n'),
            Inline::WikiLink { target, alias } => {
                out.push_str(alias.as_deref().unwrap_or(target))
            }
            Inline::WikiEmbed(target) => out.push_str(target),
            Inline::Html(_) | Inline::FootnoteReference(_) => {}
            Inline::Strong(children)
            | Inline::Emphasis(children)
            | Inline::Delete(children)
            | Inline::Subscript(children)
            | Inline::Superscript(children)
            | Inline::Highlight(children)
            | Inline::Underline(children)
            | Inline::Link { children, .. } => collect_plain_text(children, out),
        }
    }
}

/// Merge adjacent `Text` nodes in place, recursing into wrappers.
pub fn merge_adjacent_text(nodes: &mut Vec<Inline>) {
    let mut merged: Vec<Inline> = Vec::with_capacity(nodes.len());
    for mut node in nodes.drain(..) {
        if let Some(children) = node.children_mut() {
            merge_adjacent_text(children);
        }
        if let Inline::Text(next) = &node {
            if next.is_empty() {
                continue;
            }
            if let Some(Inline::Text(previous)) = merged.last_mut() {
                previous.push_str(next);
                continue;
            }
        }
        merged.push(node);
    }
    *nodes = merged;
}
