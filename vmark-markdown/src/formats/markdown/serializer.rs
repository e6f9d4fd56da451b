//! Markdown serialization (syntax tree → Markdown text)
//!
//! Comrak's own CommonMark printer has no nodes for the custom marks, details
//! blocks, alerts or wiki links, so the tree is printed by hand. Every block is
//! rendered to a string at column zero and then indented or prefixed by its
//! container; blocks are separated by blank lines.
//!
//! Text escaping mirrors the parse side: CommonMark specials are always
//! escaped, line-start block markers only where they would open a block, and
//! custom-mark openers only where the mark tokenizer would actually find a
//! pair (using the tokenizer's own pair finder).

use crate::formats::markdown::escape::fence_closes;
use crate::formats::markdown::extensions::marks::{
    earliest_pair, has_marker, CustomMark, SIBLING_PLACEHOLDER,
};
use crate::ir::nodes::{
    AlertKind, Alignment, Block, Details, Inline, LinkDefinition, List, ListItem, Root, Table,
    MATH_BLOCK_LANG,
};
use crate::options::HardBreakStyle;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^&(?:#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});")
        .expect("entity regex")
});

static ORDERED_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{1,9}[.)](?:[ \t\n]|$)").expect("ordered marker regex"));

/// Serialize a syntax tree to markdown.
pub fn serialize(root: &Root, hard_break: HardBreakStyle) -> String {
    MarkdownSerializer::new(hard_break).serialize(root)
}

pub struct MarkdownSerializer {
    hard_break: HardBreakStyle,
}

/// Inline rendering context.
#[derive(Debug, Clone, Copy, Default)]
struct Context {
    /// Newlines become spaces (headings, table cells).
    flat: bool,
    table_cell: bool,
    /// Bit set of the custom marks enclosing the current content.
    open_marks: u8,
}

impl Context {
    fn paragraph() -> Self {
        Context::default()
    }

    fn heading() -> Self {
        Context {
            flat: true,
            ..Context::default()
        }
    }

    fn cell() -> Self {
        Context {
            flat: true,
            table_cell: true,
            ..Context::default()
        }
    }

    fn inside(self, mark: CustomMark) -> Self {
        Context {
            open_marks: self.open_marks | mark_bit(mark),
            ..self
        }
    }

    fn is_open(self, mark: CustomMark) -> bool {
        self.open_marks & mark_bit(mark) != 0
    }
}

fn mark_bit(mark: CustomMark) -> u8 {
    1 << (mark as u8)
}

impl MarkdownSerializer {
    pub fn new(hard_break: HardBreakStyle) -> Self {
        MarkdownSerializer { hard_break }
    }

    pub fn serialize(&self, root: &Root) -> String {
        let mut body = self.blocks(&root.children, false, true);
        if !body.is_empty() {
            body.push('\n');
        }
        body
    }

    fn blocks(&self, blocks: &[Block], tight: bool, top: bool) -> String {
        let mut out = String::new();
        let mut previous: Option<&Block> = None;
        let mut alternate = false;

        for block in blocks {
            alternate = match (previous, block) {
                (Some(Block::List(before)), Block::List(list)) if before.ordered == list.ordered => {
                    !alternate
                }
                _ => false,
            };
            let rendered = self.block(block, alternate, top && out.is_empty());
            if rendered.is_empty() {
                continue;
            }
            if !out.is_empty() {
                let joins_tightly = tight
                    && matches!(previous, Some(Block::Paragraph(_)))
                    && interrupts_paragraph(block);
                out.push_str(if joins_tightly { "\n" } else { "\n\n" });
            }
            out.push_str(&rendered);
            previous = Some(block);
        }
        out
    }

    fn block(&self, block: &Block, alternate: bool, first: bool) -> String {
        match block {
            Block::Paragraph(children) => self.paragraph(children),
            Block::Heading { level, children } => self.heading(*level, children),
            Block::Code { lang, value } => code_block(lang.as_deref(), value),
            Block::Blockquote(children) => prefix_lines(&self.blocks(children, false, false)),
            Block::List(list) => self.list(list, alternate),
            // `---` opening a document would be read as frontmatter.
            Block::ThematicBreak if first => "***".to_string(),
            Block::ThematicBreak => "---".to_string(),
            Block::Table(table) => self.table(table),
            Block::Html(html) => html.clone(),
            Block::Frontmatter(yaml) if yaml.is_empty() => "---\n---".to_string(),
            Block::Frontmatter(yaml) => format!("---\n{yaml}\n---"),
            Block::Details(details) => self.details(details),
            Block::Alert { kind, children } => self.alert(*kind, children),
            Block::FootnoteDefinition { label, children } => {
                self.footnote_definition(label, children)
            }
            Block::LinkDefinition(definition) => link_definition(definition),
        }
    }

    fn paragraph(&self, children: &[Inline]) -> String {
        let children = without_trailing_breaks(children);
        protect_edges(self.inlines(children, Context::paragraph(), true))
    }

    fn heading(&self, level: u8, children: &[Inline]) -> String {
        let hashes = "#".repeat(level.clamp(1, 6) as usize);
        let mut text = self.inlines(children, Context::heading(), false);
        if text.ends_with('#') {
            // A trailing run of `#` would be read as a closing sequence.
            text.insert(text.len() - 1, '\\');
        }
        let text = protect_edges(text);
        if text.is_empty() {
            hashes
        } else {
            format!("{hashes} {text}")
        }
    }

    fn list(&self, list: &List, alternate: bool) -> String {
        let start = list.start.unwrap_or(1);
        let items: Vec<String> = list
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let marker = match (list.ordered, alternate) {
                    (true, false) => format!("{}.", start + index as u64),
                    (true, true) => format!("{})", start + index as u64),
                    (false, false) => "-".to_string(),
                    (false, true) => "*".to_string(),
                };
                self.list_item(item, &marker, list.tight)
            })
            .collect();
        items.join(if list.tight { "\n" } else { "\n\n" })
    }

    fn list_item(&self, item: &ListItem, marker: &str, tight: bool) -> String {
        let mut body = self.blocks(&item.children, tight, false);
        if let Some(checked) = item.checked {
            let checkbox = if checked { "[x]" } else { "[ ]" };
            body = if body.is_empty() {
                checkbox.to_string()
            } else {
                format!("{checkbox} {body}")
            };
        }
        if body.is_empty() {
            return marker.to_string();
        }
        let indent = " ".repeat(marker.len() + 1);
        hang(&body, &format!("{marker} "), &indent)
    }

    fn table(&self, table: &Table) -> String {
        let columns = table
            .rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(table.align.len());
        if columns == 0 || table.rows.is_empty() {
            return String::new();
        }

        let mut lines = Vec::with_capacity(table.rows.len() + 1);
        for (index, row) in table.rows.iter().enumerate() {
            let cells: Vec<String> = (0..columns)
                .map(|column| {
                    row.get(column)
                        .map(|cell| protect_edges(self.inlines(cell, Context::cell(), false)))
                        .unwrap_or_default()
                })
                .collect();
            lines.push(format!("| {} |", cells.join(" | ")));

            if index == 0 {
                let delimiters: Vec<&str> = (0..columns)
                    .map(|column| match table.align.get(column).copied().unwrap_or_default() {
                        Alignment::None => "---",
                        Alignment::Left => ":--",
                        Alignment::Center => ":-:",
                        Alignment::Right => "--:",
                    })
                    .collect();
                lines.push(format!("| {} |", delimiters.join(" | ")));
            }
        }
        lines.join("\n")
    }

    fn details(&self, details: &Details) -> String {
        let mut out = String::from(if details.open {
            "<details open>"
        } else {
            "<details>"
        });
        if !details.summary.is_empty() {
            out.push_str("\n<summary>");
            out.push_str(&details.summary);
            out.push_str("</summary>");
        }
        let body = self.blocks(&details.children, false, false);
        if !body.is_empty() {
            out.push_str("\n\n");
            out.push_str(&body);
        }
        out.push_str("\n\n</details>");
        out
    }

    fn alert(&self, kind: AlertKind, children: &[Block]) -> String {
        let mut text = format!("[!{}]", kind.label());
        let body = self.blocks(children, false, false);
        if !body.is_empty() {
            text.push('\n');
            text.push_str(&body);
        }
        prefix_lines(&text)
    }

    fn footnote_definition(&self, label: &str, children: &[Block]) -> String {
        let body = self.blocks(children, false, false);
        if body.is_empty() {
            return format!("[^{label}]:");
        }
        hang(&body, &format!("[^{label}]: "), "    ")
    }

    fn inlines(&self, nodes: &[Inline], ctx: Context, line_start: bool) -> String {
        let mut out = String::new();
        let openers = sibling_mark_openers(nodes);
        for (node, openers) in nodes.iter().zip(openers) {
            let at_line_start = if out.is_empty() {
                line_start
            } else {
                out.ends_with('\n')
            };
            match node {
                Inline::Text(text) => escape_text(text, openers, ctx, at_line_start, &mut out),
                Inline::Strong(children) => self.delimited(children, "**", ctx, &mut out),
                Inline::Emphasis(children) => self.delimited(children, "*", ctx, &mut out),
                Inline::Delete(children) => self.delimited(children, "~~", ctx, &mut out),
                Inline::Highlight(children) => {
                    self.custom(children, CustomMark::Highlight, ctx, &mut out)
                }
                Inline::Underline(children) => {
                    self.custom(children, CustomMark::Underline, ctx, &mut out)
                }
                Inline::Superscript(children) => {
                    self.custom(children, CustomMark::Superscript, ctx, &mut out)
                }
                Inline::Subscript(children) => {
                    self.custom(children, CustomMark::Subscript, ctx, &mut out)
                }
                Inline::InlineCode(code) => out.push_str(&code_span(code, ctx.table_cell)),
                Inline::Link {
                    url,
                    title,
                    children,
                } => {
                    if out.ends_with('!') {
                        out.insert(out.len() - 1, '\\');
                    }
                    out.push('[');
                    out.push_str(&self.inlines(children, ctx, false));
                    out.push_str("](");
                    out.push_str(&destination(url, title.as_deref()));
                    out.push(')');
                }
                Inline::Image { url, alt, title } => {
                    out.push_str("![");
                    escape_text(alt, mark_openers(alt), ctx, false, &mut out);
                    out.push_str("](");
                    out.push_str(&destination(url, title.as_deref()));
                    out.push(')');
                }
                Inline::Break if ctx.flat => out.push(' '),
                Inline::Break => out.push_str(match self.hard_break {
                    HardBreakStyle::Backslash => "\\\n",
                    HardBreakStyle::TrailingSpaces => "  \n",
                }),
                Inline::InlineMath(tex) => {
                    out.push('$');
                    out.push_str(tex);
                    out.push('$');
                }
                Inline::Html(html) => out.push_str(html),
                Inline::FootnoteReference(label) => {
                    out.push_str("[^");
                    out.push_str(label);
                    out.push(']');
                }
                Inline::WikiLink { target, alias } => {
                    out.push_str("[[");
                    out.push_str(target);
                    if let Some(alias) = alias {
                        out.push('|');
                        out.push_str(alias);
                    }
                    out.push_str("]]");
                }
                Inline::WikiEmbed(target) => {
                    out.push_str("![[");
                    out.push_str(target);
                    out.push_str("]]");
                }
            }
        }
        out
    }

    /// Emphasis-like wrappers: spaces just inside the markers would stop them
    /// from flanking, so they are moved outside.
    fn delimited(&self, children: &[Inline], marker: &str, ctx: Context, out: &mut String) {
        let content = self.inlines(children, ctx, false);
        let inner = content.trim_matches(' ');
        if inner.is_empty() {
            out.push_str(&content);
            return;
        }
        let lead = content.len() - content.trim_start_matches(' ').len();
        let trail = content.len() - content.trim_end_matches(' ').len();
        out.push_str(&content[..lead]);
        out.push_str(marker);
        out.push_str(inner);
        out.push_str(marker);
        out.push_str(&content[content.len() - trail..]);
    }

    fn custom(&self, children: &[Inline], mark: CustomMark, ctx: Context, out: &mut String) {
        let content = self.inlines(children, ctx.inside(mark), false);
        if content.is_empty() {
            return;
        }
        out.push_str(mark.marker());
        out.push_str(&content);
        out.push_str(mark.marker());
    }
}

/// Blocks that may follow a paragraph line without a blank line in between.
fn interrupts_paragraph(block: &Block) -> bool {
    match block {
        Block::List(_) | Block::Heading { .. } | Block::Blockquote(_) => true,
        Block::Code { lang, .. } => lang.as_deref() != Some(MATH_BLOCK_LANG),
        _ => false,
    }
}

fn without_trailing_breaks(nodes: &[Inline]) -> &[Inline] {
    let end = nodes
        .iter()
        .rposition(|node| !matches!(node, Inline::Break))
        .map_or(0, |index| index + 1);
    &nodes[..end]
}

/// Leading and trailing whitespace of a paragraph is stripped by the parser;
/// keep it as character references.
fn protect_edges(mut text: String) -> String {
    if let Some(last) = text.chars().last().filter(|c| *c == ' ' || *c == '\t') {
        text.pop();
        text.push_str(if last == ' ' { "&#32;" } else { "&#9;" });
    }
    if let Some(first) = text.chars().next().filter(|c| *c == ' ' || *c == '\t') {
        text.replace_range(..1, if first == ' ' { "&#32;" } else { "&#9;" });
    }
    text
}

/// Prefix the first line with `first` and indent the others with `rest`.
fn hang(body: &str, first: &str, rest: &str) -> String {
    let mut out = String::with_capacity(body.len() + first.len());
    for (index, line) in body.split('\n').enumerate() {
        if index == 0 {
            out.push_str(first);
        } else {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(rest);
            }
        }
        out.push_str(line);
    }
    out
}

/// Blockquote prefixing.
fn prefix_lines(body: &str) -> String {
    body.split('\n')
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn code_block(lang: Option<&str>, value: &str) -> String {
    if lang == Some(MATH_BLOCK_LANG) {
        return if value.is_empty() {
            "$$\n$$".to_string()
        } else {
            format!("$$\n{value}\n$$")
        };
    }
    let info = lang.unwrap_or("");
    let fence_char = if info.contains('`') { '~' } else { '`' };
    let mut len = 3;
    while value.lines().any(|line| fence_closes(line, fence_char, len)) {
        len += 1;
    }
    let fence = fence_char.to_string().repeat(len);
    if value.is_empty() {
        format!("{fence}{info}\n{fence}")
    } else {
        format!("{fence}{info}\n{value}\n{fence}")
    }
}

fn code_span(code: &str, table_cell: bool) -> String {
    if code.is_empty() {
        return String::new();
    }
    let mut code = code.replace('\n', " ");
    if table_cell {
        code = code.replace('|', "\\|");
    }
    let fence = "`".repeat(longest_run(&code, '`') + 1);
    let pad = code.starts_with('`')
        || code.ends_with('`')
        || (code.starts_with(' ') && code.ends_with(' ') && !code.trim().is_empty());
    if pad {
        format!("{fence} {code} {fence}")
    } else {
        format!("{fence}{code}{fence}")
    }
}

fn longest_run(text: &str, target: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == target {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Link destination plus optional title, as written between the parentheses.
fn destination(url: &str, title: Option<&str>) -> String {
    let mut out = if needs_angle_brackets(url) {
        format!("<{}>", url.replace('<', "\\<").replace('>', "\\>"))
    } else {
        url.to_string()
    };
    if let Some(title) = title {
        out.push_str(" \"");
        out.push_str(&title.replace('\\', "\\\\").replace('"', "\\\""));
        out.push('"');
    }
    out
}

fn needs_angle_brackets(url: &str) -> bool {
    let mut depth: i32 = 0;
    for c in url.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            c if c.is_whitespace() || c.is_control() => return true,
            _ => {}
        }
    }
    url.is_empty() || url.starts_with('<') || depth != 0
}

fn link_definition(definition: &LinkDefinition) -> String {
    let url = if definition.url.is_empty() || definition.url.contains(char::is_whitespace) {
        format!("<{}>", definition.url)
    } else {
        definition.url.clone()
    };
    let mut out = format!("[{}]: {url}", definition.identifier);
    let title = definition.title.as_deref().and_then(|title| {
        [('"', '"'), ('\'', '\''), ('(', ')')]
            .into_iter()
            .find(|(_, close)| !title.contains(*close))
            .map(|(open, close)| format!("{open}{title}{close}"))
    });
    if let Some(title) = title {
        out.push(' ');
        out.push_str(&title);
    }
    out
}

/// Byte offsets of custom-mark openers the tokenizer would pair up.
fn mark_openers(text: &str) -> BTreeSet<usize> {
    let mut openers = BTreeSet::new();
    if !has_marker(text) {
        return openers;
    }
    let mut from = 0;
    while let Some(pair) = earliest_pair(text, from) {
        openers.insert(pair.open);
        from = pair.open + pair.kind.marker().len();
    }
    openers
}

/// Mark openers of each text sibling, found the way the tokenizer scans a
/// sibling list: as one line with non-text nodes as placeholders.
fn sibling_mark_openers(nodes: &[Inline]) -> Vec<BTreeSet<usize>> {
    let mut per_node = vec![BTreeSet::new(); nodes.len()];
    let texts = || {
        nodes.iter().filter_map(|node| match node {
            Inline::Text(text) => Some(text),
            _ => None,
        })
    };
    if !texts().any(|text| has_marker(text)) {
        return per_node;
    }
    if texts().any(|text| text.contains(SIBLING_PLACEHOLDER)) {
        for (node, openers) in nodes.iter().zip(per_node.iter_mut()) {
            if let Inline::Text(text) = node {
                *openers = mark_openers(text);
            }
        }
        return per_node;
    }

    let mut line = String::new();
    let mut starts = Vec::with_capacity(nodes.len());
    for node in nodes {
        starts.push(line.len());
        match node {
            Inline::Text(text) => line.push_str(text),
            _ => line.push(SIBLING_PLACEHOLDER),
        }
    }
    for opener in mark_openers(&line) {
        let index = starts.partition_point(|&start| start <= opener) - 1;
        per_node[index].insert(opener - starts[index]);
    }
    per_node
}

/// Offset, relative to `line`, of a character that would open a block.
fn line_start_escape(line: &str) -> Option<usize> {
    let first = line.chars().next()?;
    let rest_of_line = line.split('\n').next().unwrap_or(line);
    match first {
        '#' => {
            let hashes = line.len() - line.trim_start_matches('#').len();
            let after = line[hashes..].chars().next();
            (hashes <= 6 && after.map_or(true, is_line_space)).then_some(0)
        }
        '>' => Some(0),
        '-' | '+' | '=' => {
            let after = line[1..].chars().next();
            let list_marker = first != '=' && after.map_or(true, is_line_space);
            let underline = rest_of_line.chars().all(|c| c == first || c == ' ');
            (list_marker || underline).then_some(0)
        }
        '0'..='9' => ORDERED_MARKER
            .find(line)
            .map(|m| m.as_str().trim_end().len() - 1),
        _ => None,
    }
}

fn is_line_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n')
}

fn opens_math(text: &str, offset: usize) -> bool {
    let rest = &text[offset + 1..];
    match rest.chars().next() {
        Some(c) if !c.is_whitespace() => {}
        _ => return false,
    }
    let mut previous = None;
    for c in rest.chars() {
        if c == '$' && previous.is_some_and(|p: char| !p.is_whitespace()) {
            return true;
        }
        previous = Some(c);
    }
    false
}

fn escape_text(
    text: &str,
    mut forced: BTreeSet<usize>,
    ctx: Context,
    line_start: bool,
    out: &mut String,
) {
    if !ctx.flat {
        let line_starts = text
            .match_indices('\n')
            .map(|(index, _)| index + 1)
            .chain(line_start.then_some(0));
        for start in line_starts {
            if let Some(offset) = line_start_escape(&text[start..]) {
                forced.insert(start + offset);
            }
        }
    }

    let chars: Vec<(usize, char)> = text.char_indices().collect();
    for (index, &(offset, c)) in chars.iter().enumerate() {
        let previous = index.checked_sub(1).map(|i| chars[i].1);
        let next = chars.get(index + 1).map(|&(_, c)| c);

        if c == '\n' {
            out.push(if ctx.flat { ' ' } else { '\n' });
            continue;
        }

        let escape = forced.contains(&offset)
            || match c {
                '\\' | '*' | '`' | '[' | ']' | '<' => true,
                '_' => !(previous.is_some_and(char::is_alphanumeric)
                    && next.is_some_and(char::is_alphanumeric)),
                '&' => ENTITY.is_match(&text[offset..]),
                '|' => ctx.table_cell,
                '$' => opens_math(text, offset),
                '~' => {
                    ctx.is_open(CustomMark::Subscript)
                        || previous.map_or(true, |p| p == '~')
                        || next.map_or(true, |n| n == '~')
                }
                '^' => {
                    ctx.is_open(CustomMark::Superscript) || previous.is_none() || next.is_none()
                }
                '=' => ctx.is_open(CustomMark::Highlight) && next == Some('='),
                '+' => ctx.is_open(CustomMark::Underline) && next == Some('+'),
                _ => false,
            };
        if escape {
            out.push('\\');
        }
        out.push(c);
    }
}
