//! Inline marks and their canonical ordering.
//!
//! A run's marks are kept sorted by [`MarkKind`] rank, outermost first. When
//! the document tree is turned back into nested wrappers, the same order
//! decides which wrapper encloses which, so a given mark set always nests the
//! same way regardless of how it was produced.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mark {
    Link {
        href: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Highlight,
    Underline,
    Strike,
    Bold,
    Italic,
    Subscript,
    Superscript,
    Code,
}

/// Mark kinds in nesting order, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MarkKind {
    Link,
    Highlight,
    Underline,
    Strike,
    Bold,
    Italic,
    Subscript,
    Superscript,
    Code,
}

pub const MARK_ORDER: [MarkKind; 9] = [
    MarkKind::Link,
    MarkKind::Highlight,
    MarkKind::Underline,
    MarkKind::Strike,
    MarkKind::Bold,
    MarkKind::Italic,
    MarkKind::Subscript,
    MarkKind::Superscript,
    MarkKind::Code,
];

impl Mark {
    pub fn kind(&self) -> MarkKind {
        match self {
            Mark::Link { .. } => MarkKind::Link,
            Mark::Highlight => MarkKind::Highlight,
            Mark::Underline => MarkKind::Underline,
            Mark::Strike => MarkKind::Strike,
            Mark::Bold => MarkKind::Bold,
            Mark::Italic => MarkKind::Italic,
            Mark::Subscript => MarkKind::Subscript,
            Mark::Superscript => MarkKind::Superscript,
            Mark::Code => MarkKind::Code,
        }
    }

    /// Add this mark to a rank-sorted set.
    ///
    /// A mark of the same kind already in the set is replaced, so a link
    /// nested in another link keeps the innermost target.
    pub fn add_to_set(self, set: &[Mark]) -> Vec<Mark> {
        let kind = self.kind();
        let mut out = Vec::with_capacity(set.len() + 1);
        let mut placed = false;
        for mark in set {
            if mark.kind() == kind {
                continue;
            }
            if !placed && mark.kind() > kind {
                out.push(self.clone());
                placed = true;
            }
            out.push(mark.clone());
        }
        if !placed {
            out.push(self);
        }
        out
    }
}

/// Sort marks into rank order and drop duplicate kinds, keeping the last one.
pub fn normalize_marks(marks: &[Mark]) -> Vec<Mark> {
    marks
        .iter()
        .cloned()
        .fold(Vec::new(), |set, mark| mark.add_to_set(&set))
}

/// The mark of `kind` in `marks`, if any.
pub fn find_mark(marks: &[Mark], kind: MarkKind) -> Option<&Mark> {
    marks.iter().find(|mark| mark.kind() == kind)
}
