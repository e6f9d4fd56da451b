//! The document tree: editable blocks whose inline content is a flat list of runs.

use super::marks::{normalize_marks, Mark};
use crate::ir::nodes::{AlertKind, Alignment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub children: Vec<DocNode>,
}

impl Document {
    pub fn new(children: Vec<DocNode>) -> Self {
        Document { children }
    }

    /// Total number of blocks and runs, used for diagnostics.
    pub fn node_count(&self) -> usize {
        self.children.iter().map(DocNode::node_count).sum()
    }

    /// Put every run's marks in rank order, one mark per kind. Trees that come
    /// from outside the parser may list them in any order.
    pub fn normalize_marks(&mut self) {
        self.children.iter_mut().for_each(DocNode::normalize_marks);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocNode {
    Paragraph {
        content: Vec<Run>,
    },
    Heading {
        level: u8,
        content: Vec<Run>,
    },
    CodeBlock {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        code: String,
    },
    MathBlock {
        tex: String,
    },
    Blockquote {
        children: Vec<DocNode>,
    },
    List {
        ordered: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start: Option<u64>,
        #[serde(default = "default_tight")]
        tight: bool,
        items: Vec<DocListItem>,
    },
    HorizontalRule,
    Table {
        alignments: Vec<Alignment>,
        rows: Vec<Vec<Vec<Run>>>,
    },
    HtmlBlock {
        html: String,
    },
    Frontmatter {
        yaml: String,
    },
    Details {
        #[serde(default)]
        open: bool,
        #[serde(default)]
        summary: String,
        children: Vec<DocNode>,
    },
    Alert {
        kind: AlertKind,
        children: Vec<DocNode>,
    },
    FootnoteDefinition {
        label: String,
        children: Vec<DocNode>,
    },
    LinkDefinition {
        identifier: String,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
}

fn normalize_runs(runs: &mut [Run]) {
    for run in runs {
        run.marks = normalize_marks(&run.marks);
    }
}

fn default_tight() -> bool {
    true
}

impl DocNode {
    pub fn paragraph(content: Vec<Run>) -> Self {
        DocNode::Paragraph { content }
    }

    fn normalize_marks(&mut self) {
        match self {
            DocNode::Paragraph { content } | DocNode::Heading { content, .. } => {
                normalize_runs(content)
            }
            DocNode::Blockquote { children }
            | DocNode::Details { children, .. }
            | DocNode::Alert { children, .. }
            | DocNode::FootnoteDefinition { children, .. } => {
                children.iter_mut().for_each(DocNode::normalize_marks)
            }
            DocNode::List { items, .. } => items
                .iter_mut()
                .flat_map(|item| item.children.iter_mut())
                .for_each(DocNode::normalize_marks),
            DocNode::Table { rows, .. } => rows
                .iter_mut()
                .flatten()
                .for_each(|cell| normalize_runs(cell)),
            _ => {}
        }
    }

    fn node_count(&self) -> usize {
        let nested = match self {
            DocNode::Paragraph { content } | DocNode::Heading { content, .. } => content.len(),
            DocNode::Blockquote { children }
            | DocNode::Details { children, .. }
            | DocNode::Alert { children, .. }
            | DocNode::FootnoteDefinition { children, .. } => {
                children.iter().map(DocNode::node_count).sum()
            }
            DocNode::List { items, .. } => items
                .iter()
                .map(|item| 1 + item.children.iter().map(DocNode::node_count).sum::<usize>())
                .sum(),
            DocNode::Table { rows, .. } => rows.iter().flatten().map(Vec::len).sum(),
            _ => 0,
        };
        1 + nested
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocListItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    pub children: Vec<DocNode>,
}

/// A leaf of inline content together with the marks active on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    #[serde(flatten)]
    pub content: RunContent,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl Run {
    pub fn text(text: impl Into<String>) -> Self {
        Run {
            content: RunContent::Text { text: text.into() },
            marks: Vec::new(),
        }
    }

    pub fn with_marks(mut self, marks: Vec<Mark>) -> Self {
        self.marks = marks;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunContent {
    Text {
        text: String,
    },
    HardBreak,
    Image {
        src: String,
        #[serde(default)]
        alt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Math {
        tex: String,
    },
    Html {
        html: String,
    },
    FootnoteRef {
        label: String,
    },
    WikiLink {
        target: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
    },
    WikiEmbed {
        target: String,
    },
}
