//! Structural fast parser
//!
//! A restricted markdown parser for documents that use nothing beyond
//! paragraphs, ATX headings, fenced and indented code, blockquotes, tight
//! lists, thematic breaks, simple HTML blocks and the core inline syntax
//! (emphasis, strong, code spans, inline links and images, breaks).
//!
//! It must build exactly the tree the full parser would build. Rather than
//! reproduce every corner of CommonMark, it returns `None` as soon as it
//! meets a construct whose outcome it cannot be sure of, and the caller falls
//! back to the full parser. Setext headings, lazy continuation lines, loose
//! lists, entities, escapes, autolinks and reference links all bail.

use crate::formats::markdown::escape::fence_closes;
use crate::ir::nodes::{merge_adjacent_text, plain_text, Block, Inline, List, ListItem, Root};

/// Parse `source`, or `None` if the full parser is needed.
pub fn parse_fast(source: &str) -> Option<Root> {
    if source.contains(['\u{FEFF}', '\0', '\r', '\t']) {
        return None;
    }
    let lines: Vec<&str> = source.lines().collect();
    Some(Root {
        children: parse_lines(&lines)?,
    })
}

/// Block-level classification of one line.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Line<'a> {
    Blank,
    Indented,
    Heading(u8, &'a str),
    ThematicBreak(char),
    Fence(usize, &'a str),
    Quote,
    Bullet(char),
    Ordered(u64, char, usize),
    HtmlComment,
    HtmlBlock,
    Text,
    Unsupported,
}

const HTML_BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "center", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr",
    "li", "main", "nav", "ol", "p", "section", "table", "tbody", "td", "th", "thead", "tr", "ul",
];

fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn classify(line: &str) -> Line<'_> {
    if line.trim().is_empty() {
        return Line::Blank;
    }
    match leading_spaces(line) {
        0 => {}
        1..=3 => return Line::Unsupported,
        _ => return Line::Indented,
    }

    let first = line.as_bytes()[0];
    if let Some(c) = thematic_break(line) {
        return Line::ThematicBreak(c);
    }
    match first {
        b'#' => {
            let hashes = line.len() - line.trim_start_matches('#').len();
            let rest = &line[hashes..];
            if hashes <= 6 && (rest.is_empty() || rest.starts_with(' ')) {
                return Line::Heading(hashes as u8, heading_content(rest));
            }
            Line::Text
        }
        b'`' => {
            let run = line.len() - line.trim_start_matches('`').len();
            let info = &line[run..];
            if run < 3 || info.contains('`') {
                return Line::Text;
            }
            // Info strings with escapes or entities are decoded by the full parser.
            if info.contains(['\\', '&']) {
                return Line::Unsupported;
            }
            Line::Fence(run, info.trim())
        }
        b'>' => Line::Quote,
        b'-' | b'*' | b'+' => match line.as_bytes().get(1) {
            Some(b' ') if line.len() > 2 => Line::Bullet(first as char),
            None | Some(b' ') => Line::Unsupported,
            _ => Line::Text,
        },
        b'0'..=b'9' => ordered_marker(line).unwrap_or(Line::Text),
        b'<' => html_start(line),
        b'=' if line.trim_end().bytes().all(|b| b == b'=') => Line::Unsupported,
        _ => Line::Text,
    }
}

fn thematic_break(line: &str) -> Option<char> {
    let c = line.chars().next().filter(|c| matches!(c, '*' | '-' | '_'))?;
    let mut count = 0;
    for x in line.chars() {
        if x == c {
            count += 1;
        } else if x != ' ' {
            return None;
        }
    }
    (count >= 3).then_some(c)
}

fn heading_content(rest: &str) -> &str {
    let content = rest.trim();
    if !content.ends_with('#') {
        return content;
    }
    let stripped = content.trim_end_matches('#');
    if stripped.is_empty() {
        ""
    } else if stripped.ends_with(' ') {
        stripped.trim_end()
    } else {
        content
    }
}

fn ordered_marker(line: &str) -> Option<Line<'_>> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 9 {
        return None;
    }
    let delimiter = *line.as_bytes().get(digits)?;
    if delimiter != b'.' && delimiter != b')' {
        return None;
    }
    match line.as_bytes().get(digits + 1) {
        Some(b' ') if line.len() > digits + 2 => {
            let number = line[..digits].parse().ok()?;
            Some(Line::Ordered(number, delimiter as char, digits + 2))
        }
        None | Some(b' ') => Some(Line::Unsupported),
        _ => None,
    }
}

fn html_start(line: &str) -> Line<'_> {
    if line.starts_with("<!--") {
        return Line::HtmlComment;
    }
    let rest = line[1..].strip_prefix('/').unwrap_or(&line[1..]);
    let name_len = rest
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    let name = rest[..name_len].to_ascii_lowercase();
    let after = &rest[name_len..];
    let terminated = after.is_empty()
        || after.starts_with(' ')
        || after.starts_with('>')
        || after.starts_with("/>");
    if terminated && HTML_BLOCK_TAGS.contains(&name.as_str()) {
        Line::HtmlBlock
    } else {
        Line::Unsupported
    }
}

fn parse_lines(lines: &[&str]) -> Option<Vec<Block>> {
    let mut blocks = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        match classify(lines[i]) {
            Line::Blank => i += 1,
            Line::Indented => {
                let (block, next) = indented_code(lines, i);
                blocks.push(block);
                i = next;
            }
            Line::Heading(level, content) => {
                blocks.push(Block::Heading {
                    level,
                    children: parse_inlines(content)?,
                });
                i += 1;
            }
            Line::ThematicBreak(_) => {
                blocks.push(Block::ThematicBreak);
                i += 1;
            }
            Line::Fence(len, info) => {
                let close = (i + 1..lines.len()).find(|&j| fence_closes(lines[j], '`', len))?;
                blocks.push(Block::Code {
                    lang: (!info.is_empty()).then(|| info.to_string()),
                    value: lines[i + 1..close].join("\n"),
                });
                i = close + 1;
            }
            Line::Quote => {
                let (block, next) = blockquote(lines, i)?;
                blocks.push(block);
                i = next;
            }
            Line::Bullet(_) | Line::Ordered(..) => {
                let (block, next) = list(lines, i)?;
                blocks.push(block);
                i = next;
            }
            Line::HtmlComment => {
                let close = (i..lines.len()).find(|&j| {
                    let from = if j == i { 4 } else { 0 };
                    lines[j].get(from..).is_some_and(|rest| rest.contains("-->"))
                })?;
                blocks.push(Block::Html(lines[i..=close].join("\n")));
                i = close + 1;
            }
            Line::HtmlBlock => {
                let end = (i..lines.len())
                    .find(|&j| classify(lines[j]) == Line::Blank)
                    .unwrap_or(lines.len());
                blocks.push(Block::Html(lines[i..end].join("\n")));
                i = end;
            }
            Line::Text => {
                let (block, next) = paragraph(lines, i)?;
                blocks.push(block);
                i = next;
            }
            Line::Unsupported => return None,
        }
    }
    Some(blocks)
}

fn indented_code(lines: &[&str], start: usize) -> (Block, usize) {
    let mut end = start;
    let mut last_code = start;
    while end < lines.len() {
        match classify(lines[end]) {
            Line::Indented => last_code = end,
            Line::Blank => {}
            _ => break,
        }
        end += 1;
    }
    let value = lines[start..=last_code]
        .iter()
        .map(|line| line.get(4..).unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n");
    (Block::Code { lang: None, value }, last_code + 1)
}

fn paragraph(lines: &[&str], start: usize) -> Option<(Block, usize)> {
    let mut text = lines[start].trim_end().to_string();
    let mut i = start + 1;
    while i < lines.len() {
        match classify(lines[i]) {
            Line::Text | Line::Indented => {
                text.push('\n');
                text.push_str(lines[i].trim());
                i += 1;
            }
            Line::Blank
            | Line::Heading(..)
            | Line::Fence(..)
            | Line::Quote
            | Line::Bullet(_)
            | Line::Ordered(1, _, _) => break,
            Line::ThematicBreak(c) if c != '-' => break,
            _ => return None,
        }
    }
    Some((Block::Paragraph(parse_inlines(&text)?), i))
}

fn blockquote(lines: &[&str], start: usize) -> Option<(Block, usize)> {
    let mut inner = Vec::new();
    let mut i = start;
    while i < lines.len() {
        let Some(rest) = lines[i].strip_prefix('>') else {
            break;
        };
        inner.push(rest.strip_prefix(' ').unwrap_or(rest));
        i += 1;
    }
    // A following non-blank line would be a lazy continuation.
    if i < lines.len() && classify(lines[i]) != Line::Blank {
        return None;
    }
    Some((Block::Blockquote(parse_lines(&inner)?), i))
}

fn same_list_kind(first: Line<'_>, other: Line<'_>) -> bool {
    match (first, other) {
        (Line::Bullet(a), Line::Bullet(b)) => a == b,
        (Line::Ordered(_, a, _), Line::Ordered(_, b, _)) => a == b,
        _ => false,
    }
}

fn list(lines: &[&str], start: usize) -> Option<(Block, usize)> {
    let first = classify(lines[start]);
    let (ordered, number) = match first {
        Line::Ordered(number, _, _) => (true, Some(number)),
        _ => (false, None),
    };
    let mut items = Vec::new();
    let mut i = start;

    while i < lines.len() {
        let marker = classify(lines[i]);
        if !same_list_kind(first, marker) {
            return None;
        }
        let width = match marker {
            Line::Ordered(_, _, width) => width,
            _ => 2,
        };
        let content = &lines[i][width..];
        if content.starts_with(' ') {
            return None;
        }
        let mut item_lines = vec![content];
        i += 1;

        while i < lines.len() {
            let line = lines[i];
            if classify(line) == Line::Blank {
                break;
            }
            let indent = leading_spaces(line);
            if indent >= width {
                item_lines.push(&line[width..]);
                i += 1;
            } else if indent > 0 {
                return None;
            } else {
                break;
            }
        }

        items.push(ListItem {
            checked: None,
            children: parse_lines(&item_lines)?,
        });

        if i >= lines.len() {
            break;
        }
        match classify(lines[i]) {
            Line::Blank => {
                // Anything that could continue the list after a blank line
                // would make it loose.
                let next = lines[i..].iter().find(|line| !line.trim().is_empty());
                if let Some(next) = next {
                    if leading_spaces(next) > 0
                        || matches!(classify(next), Line::Bullet(_) | Line::Ordered(..))
                    {
                        return None;
                    }
                }
                break;
            }
            line if same_list_kind(first, line) => continue,
            _ => return None,
        }
    }

    Some((
        Block::List(List {
            ordered,
            start: number,
            tight: true,
            items,
        }),
        i,
    ))
}

/// One open emphasis delimiter and the nodes collected since.
struct Frame {
    delimiter: char,
    len: usize,
    children: Vec<Inline>,
}

struct InlineParser {
    chars: Vec<char>,
}

/// Parse inline content, or `None` if it needs the full parser.
pub fn parse_inlines(text: &str) -> Option<Vec<Inline>> {
    let parser = InlineParser {
        chars: text.chars().collect(),
    };
    parser.parse_range(0, parser.chars.len())
}

impl InlineParser {
    fn parse_range(&self, start: usize, end: usize) -> Option<Vec<Inline>> {
        let chars = &self.chars;
        let mut stack = vec![Frame {
            delimiter: ' ',
            len: 0,
            children: Vec::new(),
        }];
        let mut text = String::new();
        let mut i = start;

        while i < end {
            let c = chars[i];
            match c {
                '\\' => {
                    if chars.get(i + 1) != Some(&'\n') || i + 1 >= end {
                        return None;
                    }
                    push_text(&mut stack, &mut text);
                    top(&mut stack).children.push(Inline::Break);
                    i += 2;
                }
                '&' | '<' | ']' => return None,
                '`' => {
                    let run = self.run(i, '`');
                    let close = self.code_close(i + run, end, run)?;
                    push_text(&mut stack, &mut text);
                    let code = code_content(&chars[i + run..close]);
                    top(&mut stack).children.push(Inline::InlineCode(code));
                    i = close + run;
                }
                '!' if chars.get(i + 1) == Some(&'[') => {
                    let link = self.link(i + 1, end)?;
                    let alt = plain_text(&self.parse_range(link.text_start, link.text_end)?);
                    push_text(&mut stack, &mut text);
                    top(&mut stack).children.push(Inline::Image {
                        url: link.url,
                        alt,
                        title: link.title,
                    });
                    i = link.next;
                }
                '[' => {
                    let link = self.link(i, end)?;
                    let children = self.parse_range(link.text_start, link.text_end)?;
                    push_text(&mut stack, &mut text);
                    top(&mut stack).children.push(Inline::Link {
                        url: link.url,
                        title: link.title,
                        children,
                    });
                    i = link.next;
                }
                '*' | '_' => {
                    let run = self.run(i, c);
                    if run > 2 {
                        return None;
                    }
                    let (can_open, can_close) = self.flanking(i, run, c)?;
                    if can_open && can_close {
                        return None;
                    }
                    if can_close {
                        // Only a closer matching the innermost opener is accepted.
                        let mut frame =
                            stack.pop().filter(|f| f.delimiter == c && f.len == run)?;
                        push_text_into(&mut frame.children, &mut text);
                        let node = if run == 2 {
                            Inline::Strong(frame.children)
                        } else {
                            Inline::Emphasis(frame.children)
                        };
                        top(&mut stack).children.push(node);
                    } else if can_open {
                        push_text(&mut stack, &mut text);
                        stack.push(Frame {
                            delimiter: c,
                            len: run,
                            children: Vec::new(),
                        });
                    } else {
                        text.extend(std::iter::repeat(c).take(run));
                    }
                    i += run;
                }
                _ => {
                    text.push(c);
                    i += 1;
                }
            }
        }

        if stack.len() != 1 {
            return None;
        }
        let mut root = stack.pop()?;
        push_text_into(&mut root.children, &mut text);
        merge_adjacent_text(&mut root.children);
        Some(root.children)
    }

    fn run(&self, at: usize, c: char) -> usize {
        self.chars[at..].iter().take_while(|&&x| x == c).count()
    }

    /// Start of the backtick run of exactly `len` closing a code span.
    fn code_close(&self, from: usize, end: usize, len: usize) -> Option<usize> {
        let mut j = from;
        while j < end {
            if self.chars[j] == '`' {
                let run = self.run(j, '`');
                if run == len {
                    return Some(j);
                }
                j += run;
            } else {
                j += 1;
            }
        }
        None
    }

    /// CommonMark left/right flanking rules for a delimiter run.
    fn flanking(&self, at: usize, run: usize, c: char) -> Option<(bool, bool)> {
        let prev = at.checked_sub(1).map(|p| self.chars[p]);
        let next = self.chars.get(at + run).copied();
        for neighbour in [prev, next].into_iter().flatten() {
            if !neighbour.is_ascii() && !neighbour.is_alphanumeric() {
                return None;
            }
        }
        let space = |x: Option<char>| x.map_or(true, char::is_whitespace);
        let punct = |x: Option<char>| x.is_some_and(|x| x.is_ascii_punctuation());

        let left = !space(next) && (!punct(next) || space(prev) || punct(prev));
        let right = !space(prev) && (!punct(prev) || space(next) || punct(next));
        Some(if c == '_' {
            (left && (!right || punct(prev)), right && (!left || punct(next)))
        } else {
            (left, right)
        })
    }

    /// An inline link starting at the `[` at `open`.
    fn link(&self, open: usize, end: usize) -> Option<LinkParts> {
        let chars = &self.chars;
        let mut j = open + 1;
        let close = loop {
            match chars.get(j).filter(|_| j < end)? {
                '[' => return None,
                ']' => break j,
                '`' => {
                    let run = self.run(j, '`');
                    j = self.code_close(j + run, end, run)? + run;
                }
                _ => j += 1,
            }
        };
        if chars.get(close + 1) != Some(&'(') {
            return None;
        }

        let mut k = close + 2;
        let mut url = String::new();
        while k < end && !matches!(chars[k], ' ' | ')' | '\n') {
            if matches!(chars[k], '(' | '<' | '>' | '\\' | '[' | ']' | '&') {
                return None;
            }
            url.push(chars[k]);
            k += 1;
        }

        let mut title = None;
        if chars.get(k) == Some(&' ') {
            while chars.get(k) == Some(&' ') {
                k += 1;
            }
            if chars.get(k) != Some(&'"') {
                return None;
            }
            k += 1;
            let mut value = String::new();
            loop {
                match chars.get(k).filter(|_| k < end)? {
                    '"' => break,
                    '\\' | '&' | '\n' => return None,
                    c => value.push(*c),
                }
                k += 1;
            }
            k += 1;
            while chars.get(k) == Some(&' ') {
                k += 1;
            }
            title = (!value.is_empty()).then_some(value);
        }
        if k >= end || chars[k] != ')' {
            return None;
        }
        Some(LinkParts {
            text_start: open + 1,
            text_end: close,
            url,
            title,
            next: k + 1,
        })
    }
}

struct LinkParts {
    text_start: usize,
    text_end: usize,
    url: String,
    title: Option<String>,
    next: usize,
}

fn top(stack: &mut [Frame]) -> &mut Frame {
    let last = stack.len() - 1;
    &mut stack[last]
}

fn push_text(stack: &mut [Frame], text: &mut String) {
    push_text_into(&mut top(stack).children, text);
}

fn push_text_into(children: &mut Vec<Inline>, text: &mut String) {
    if !text.is_empty() {
        children.push(Inline::Text(std::mem::take(text)));
    }
}

fn code_content(chars: &[char]) -> String {
    let content: String = chars
        .iter()
        .map(|&c| if c == '\n' { ' ' } else { c })
        .collect();
    let padded = content.len() >= 2 && content.starts_with(' ') && content.ends_with(' ');
    if padded && !content.trim().is_empty() {
        content[1..content.len() - 1].to_string()
    } else {
        content
    }
}
