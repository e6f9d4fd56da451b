//! Custom inline marks: highlight, underline, superscript and subscript.
//!
//! The base grammar leaves these markers in text nodes. The tokenizer walks a
//! text value, repeatedly picking the pair whose opener comes first (first
//! definition on ties), and re-scans the pair's content for nested marks.
//! Unclosed markers stay literal text.
//!
//! A sibling list is scanned as one line, with every non-text sibling standing
//! in as [`SIBLING_PLACEHOLDER`], so a pair may enclose emphasis, code spans
//! or links: `==**x**==`, `^`x`^`.

use super::TreeExtension;
use crate::error::ConversionError;
use crate::ir::nodes::{Inline, Root};
use crate::ir::visit::map_inlines;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomMark {
    Highlight,
    Underline,
    Superscript,
    Subscript,
}

#[derive(Debug)]
pub struct MarkDef {
    pub kind: CustomMark,
    pub marker: &'static str,
    /// The marker may not be part of a doubled run (`~` inside `~~`).
    pub skip_double: bool,
}

pub const MARK_DEFS: [MarkDef; 4] = [
    MarkDef {
        kind: CustomMark::Highlight,
        marker: "==",
        skip_double: false,
    },
    MarkDef {
        kind: CustomMark::Underline,
        marker: "++",
        skip_double: false,
    },
    MarkDef {
        kind: CustomMark::Superscript,
        marker: "^",
        skip_double: false,
    },
    MarkDef {
        kind: CustomMark::Subscript,
        marker: "~",
        skip_double: true,
    },
];

impl CustomMark {
    pub fn def(self) -> &'static MarkDef {
        match self {
            CustomMark::Highlight => &MARK_DEFS[0],
            CustomMark::Underline => &MARK_DEFS[1],
            CustomMark::Superscript => &MARK_DEFS[2],
            CustomMark::Subscript => &MARK_DEFS[3],
        }
    }

    pub fn marker(self) -> &'static str {
        self.def().marker
    }

    fn wrap(self, children: Vec<Inline>) -> Inline {
        match self {
            CustomMark::Highlight => Inline::Highlight(children),
            CustomMark::Underline => Inline::Underline(children),
            CustomMark::Superscript => Inline::Superscript(children),
            CustomMark::Subscript => Inline::Subscript(children),
        }
    }
}

/// An opening and closing marker, as byte offsets into the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkPair {
    pub kind: CustomMark,
    pub open: usize,
    pub close: usize,
}

impl MarkPair {
    pub fn content_range(&self) -> std::ops::Range<usize> {
        self.open + self.kind.marker().len()..self.close
    }

    pub fn end(&self) -> usize {
        self.close + self.kind.marker().len()
    }
}

fn marker_at(text: &str, def: &MarkDef, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let marker = def.marker.as_bytes();
    let mut at = from;
    while at <= text.len() {
        let found = at + text.get(at..)?.find(def.marker)?;
        let doubled = def.skip_double
            && ((found > 0 && bytes[found - 1] == marker[0])
                || bytes.get(found + marker.len()) == Some(&marker[0]));
        if !doubled {
            return Some(found);
        }
        at = found + 1;
    }
    None
}

/// The first valid pair of `def` whose opener is at or after `from`.
pub fn find_pair(text: &str, def: &MarkDef, from: usize) -> Option<MarkPair> {
    let len = def.marker.len();
    let mut start = from;
    loop {
        let open = marker_at(text, def, start)?;
        let close = marker_at(text, def, open + len)?;
        if close > open + len {
            return Some(MarkPair {
                kind: def.kind,
                open,
                close,
            });
        }
        // Adjacent markers enclose nothing: try the next opener.
        start = open + 1;
    }
}

/// The pair with the earliest opener among all mark definitions.
pub fn earliest_pair(text: &str, from: usize) -> Option<MarkPair> {
    let mut best: Option<MarkPair> = None;
    for def in MARK_DEFS.iter() {
        if let Some(pair) = find_pair(text, def, from) {
            if best.map_or(true, |current| pair.open < current.open) {
                best = Some(pair);
            }
        }
    }
    best
}

/// Split a text value into text and mark nodes.
pub fn tokenize(text: &str) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut cursor = 0;
    while let Some(pair) = earliest_pair(text, cursor) {
        if pair.open > cursor {
            out.push(Inline::Text(text[cursor..pair.open].to_string()));
        }
        out.push(pair.kind.wrap(tokenize(&text[pair.content_range()])));
        cursor = pair.end();
    }
    if cursor < text.len() {
        out.push(Inline::Text(text[cursor..].to_string()));
    }
    out
}

/// Stands in for a non-text sibling while a sibling list is scanned.
pub const SIBLING_PLACEHOLDER: char = '\u{FFFC}';

pub fn has_marker(text: &str) -> bool {
    text.contains(['=', '+', '^', '~'])
}

/// Tokenize an inline sequence, pairing markers across sibling nodes.
pub fn apply(nodes: Vec<Inline>) -> Vec<Inline> {
    let texts = || {
        nodes.iter().filter_map(|node| match node {
            Inline::Text(text) => Some(text),
            _ => None,
        })
    };
    if !texts().any(|text| has_marker(text)) {
        return nodes;
    }
    if texts().any(|text| text.contains(SIBLING_PLACEHOLDER)) {
        // The placeholder is ambiguous here: scan each text node on its own.
        return nodes
            .into_iter()
            .flat_map(|node| match node {
                Inline::Text(text) if has_marker(&text) => tokenize(&text),
                other => vec![other],
            })
            .collect();
    }

    let mut line = String::new();
    let mut atoms = Vec::new();
    for node in nodes {
        match node {
            Inline::Text(text) => line.push_str(&text),
            atom => {
                line.push(SIBLING_PLACEHOLDER);
                atoms.push(atom);
            }
        }
    }
    splice(tokenize(&line), &mut atoms.into_iter())
}

/// Put the non-text siblings back where their placeholders ended up.
fn splice(nodes: Vec<Inline>, atoms: &mut impl Iterator<Item = Inline>) -> Vec<Inline> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Inline::Text(text) => {
                for (index, piece) in text.split(SIBLING_PLACEHOLDER).enumerate() {
                    if index > 0 {
                        out.extend(atoms.next());
                    }
                    if !piece.is_empty() {
                        out.push(Inline::Text(piece.to_string()));
                    }
                }
            }
            Inline::Highlight(children) => out.push(Inline::Highlight(splice(children, atoms))),
            Inline::Underline(children) => out.push(Inline::Underline(splice(children, atoms))),
            Inline::Superscript(children) => {
                out.push(Inline::Superscript(splice(children, atoms)))
            }
            Inline::Subscript(children) => out.push(Inline::Subscript(splice(children, atoms))),
            other => out.push(other),
        }
    }
    out
}

pub struct MarkExtension;

impl TreeExtension for MarkExtension {
    fn name(&self) -> &'static str {
        "marks"
    }

    fn apply(&self, root: &mut Root, _source: &str) -> Result<(), ConversionError> {
        map_inlines(root, &mut apply);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::nodes::plain_text;
    use proptest::prelude::*;

    fn text(value: &str) -> Inline {
        Inline::Text(value.to_string())
    }

    #[test]
    fn chemistry_and_powers() {
        assert_eq!(
            tokenize("H~2~O and x^2^"),
            vec![
                text("H"),
                Inline::Subscript(vec![text("2")]),
                text("O and x"),
                Inline::Superscript(vec![text("2")]),
            ]
        );
    }

    #[test]
    fn earliest_opener_wins() {
        assert_eq!(
            tokenize("++a ==b++ c=="),
            vec![
                Inline::Underline(vec![text("a ==b")]),
                text(" c=="),
            ]
        );
    }

    #[test]
    fn nested_marks_are_rescanned() {
        assert_eq!(
            tokenize("==a ^b^ c=="),
            vec![Inline::Highlight(vec![
                text("a "),
                Inline::Superscript(vec![text("b")]),
                text(" c"),
            ])]
        );
    }

    #[test]
    fn double_tildes_are_not_subscript() {
        assert_eq!(tokenize("~~strike~~"), vec![text("~~strike~~")]);
        assert_eq!(
            tokenize("~~no~~ ~yes~"),
            vec![text("~~no~~ "), Inline::Subscript(vec![text("yes")])]
        );
    }

    #[test]
    fn empty_and_unclosed_markers_stay_literal() {
        assert_eq!(tokenize("====x"), vec![text("====x")]);
        assert_eq!(tokenize("^^"), vec![text("^^")]);
        assert_eq!(tokenize("a ^ b"), vec![text("a ^ b")]);
        assert_eq!(
            tokenize("^^x^"),
            vec![text("^"), Inline::Superscript(vec![text("x")])]
        );
    }

    #[test]
    fn apply_leaves_other_nodes() {
        let nodes = vec![text("a"), Inline::InlineCode("x^2^".into()), text("==b==")];
        assert_eq!(
            apply(nodes),
            vec![
                text("a"),
                Inline::InlineCode("x^2^".into()),
                Inline::Highlight(vec![text("b")]),
            ]
        );
    }

    #[test]
    fn pairs_span_sibling_nodes() {
        let strong = Inline::Strong(vec![text("x")]);
        assert_eq!(
            apply(vec![text("=="), strong.clone(), text("==")]),
            vec![Inline::Highlight(vec![strong])]
        );

        let code = Inline::InlineCode("x".into());
        assert_eq!(
            apply(vec![text("a ^"), code.clone(), text("^ b")]),
            vec![
                text("a "),
                Inline::Superscript(vec![code]),
                text(" b"),
            ]
        );
    }

    #[test]
    fn siblings_keep_their_order_inside_nested_pairs() {
        let first = Inline::Emphasis(vec![text("a")]);
        let second = Inline::InlineCode("b".into());
        assert_eq!(
            apply(vec![
                text("++"),
                first.clone(),
                text(" ~"),
                second.clone(),
                text("~++ tail"),
            ]),
            vec![
                Inline::Underline(vec![
                    first,
                    text(" "),
                    Inline::Subscript(vec![second]),
                ]),
                text(" tail"),
            ]
        );
    }

    #[test]
    fn literal_placeholder_falls_back_to_single_nodes() {
        let strong = Inline::Strong(vec![text("x")]);
        let nodes = vec![text("==\u{FFFC}"), strong.clone(), text("==")];
        assert_eq!(
            apply(nodes),
            vec![text("==\u{FFFC}"), strong, text("==")]
        );
    }

    proptest! {
        #[test]
        fn tokenizer_terminates_and_never_grows_text(source in "[ab =+^~]{0,48}") {
            let nodes = tokenize(&source);
            prop_assert!(plain_text(&nodes).len() <= source.len());
        }
    }
}
