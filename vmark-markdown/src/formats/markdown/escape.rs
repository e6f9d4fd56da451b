//! Escape preprocessing for the custom inline marks.
//!
//! The base grammar has no idea that `\==` or `\^` mean "a literal marker",
//! and it would happily drop the backslash and leave the marker for the mark
//! tokenizer to pick up. Before parsing, escaped markers are swapped for
//! private-use sentinels; after parsing, the sentinels are swapped back.
//!
//! The scan never touches inline code spans or fenced code blocks, so escape
//! sequences written inside code come out byte-for-byte unchanged.
//!
//! The same scan also shields lone tildes (`~x~`) from the base grammar's
//! single-tilde strikethrough, leaving only `~~` to be read as strikethrough.

use crate::ir::nodes::Root;
use crate::ir::visit::{visit_strings_mut, StringKind};

/// Escaped marker and the sentinel it is replaced with.
pub struct EscapeSequence {
    pub marker: &'static str,
    pub sentinel: char,
}

pub const ESCAPE_SEQUENCES: [EscapeSequence; 4] = [
    EscapeSequence {
        marker: "==",
        sentinel: '\u{E000}',
    },
    EscapeSequence {
        marker: "++",
        sentinel: '\u{E001}',
    },
    EscapeSequence {
        marker: "^",
        sentinel: '\u{E002}',
    },
    EscapeSequence {
        marker: "~",
        sentinel: '\u{E003}',
    },
];

/// Stand-in for an unescaped tilde that has no tilde next to it.
pub const TILDE_SHIELD: char = '\u{E004}';

/// Opening line of a fenced code block: fence character and run length.
///
/// Follows the CommonMark rule: at most three leading spaces, then at least
/// three backticks or tildes; backtick fences may not carry a backtick in
/// their info string.
pub fn fence_open(line: &str) -> Option<(char, usize)> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let fence = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let run = rest.len() - rest.trim_start_matches(fence).len();
    if run < 3 {
        return None;
    }
    if fence == '`' && rest[run..].contains('`') {
        return None;
    }
    Some((fence, run))
}

/// Whether `line` closes a fence opened with `fence` repeated `len` times.
pub fn fence_closes(line: &str, fence: char, len: usize) -> bool {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return false;
    }
    let rest = &line[indent..];
    let run = rest.len() - rest.trim_start_matches(fence).len();
    run >= len && rest[run..].trim().is_empty()
}

#[derive(Clone, Copy)]
enum State {
    Normal,
    InlineCode(usize),
    Fenced(char, usize),
}

/// Replace escaped markers and lone tildes outside code with sentinels.
pub fn preprocess(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut state = State::Normal;
    let mut i = 0;
    let mut line_start = true;

    while i < chars.len() {
        if line_start {
            line_start = false;
            let line_end = chars[i..]
                .iter()
                .position(|c| *c == '\n')
                .map_or(chars.len(), |p| i + p);
            let line: String = chars[i..line_end].iter().collect();
            match state {
                State::Normal => {
                    if let Some((fence, len)) = fence_open(&line) {
                        state = State::Fenced(fence, len);
                        i = copy_line(&chars, i, line_end, &mut out, &mut line_start);
                        continue;
                    }
                }
                State::Fenced(fence, len) => {
                    if fence_closes(&line, fence, len) {
                        state = State::Normal;
                    }
                    i = copy_line(&chars, i, line_end, &mut out, &mut line_start);
                    continue;
                }
                State::InlineCode(_) => {}
            }
        }

        let c = chars[i];
        match state {
            State::InlineCode(len) => {
                if c == '`' {
                    let run = run_length(&chars, i, '`');
                    out.extend(std::iter::repeat('`').take(run));
                    i += run;
                    if run == len {
                        state = State::Normal;
                    }
                    continue;
                }
                if c == '\n' {
                    line_start = true;
                }
                out.push(c);
                i += 1;
            }
            State::Fenced(..) => {
                if c == '\n' {
                    line_start = true;
                }
                out.push(c);
                i += 1;
            }
            State::Normal => {
                if c == '\\' {
                    if let Some((sentinel, consumed)) = match_escape(&chars, i + 1) {
                        out.push(sentinel);
                        i += 1 + consumed;
                        continue;
                    }
                    // Any other escape is copied as a pair so the escaped
                    // character cannot start a code span or a fence.
                    out.push(c);
                    if let Some(&next) = chars.get(i + 1) {
                        if next == '\n' {
                            line_start = true;
                        }
                        out.push(next);
                    }
                    i += 2;
                    continue;
                }
                if c == '`' {
                    let run = run_length(&chars, i, '`');
                    out.extend(std::iter::repeat('`').take(run));
                    if has_closing_run(&chars, i + run, run) {
                        state = State::InlineCode(run);
                    }
                    i += run;
                    continue;
                }
                if c == '~' {
                    let run = run_length(&chars, i, '~');
                    if run == 1 {
                        out.push(TILDE_SHIELD);
                    } else {
                        out.extend(std::iter::repeat('~').take(run));
                    }
                    i += run;
                    continue;
                }
                if c == '\n' {
                    line_start = true;
                }
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

fn copy_line(
    chars: &[char],
    start: usize,
    line_end: usize,
    out: &mut String,
    line_start: &mut bool,
) -> usize {
    out.extend(&chars[start..line_end]);
    if line_end < chars.len() {
        out.push('\n');
        *line_start = true;
        line_end + 1
    } else {
        line_end
    }
}

fn run_length(chars: &[char], start: usize, c: char) -> usize {
    chars[start..].iter().take_while(|&&x| x == c).count()
}

fn match_escape(chars: &[char], at: usize) -> Option<(char, usize)> {
    ESCAPE_SEQUENCES.iter().find_map(|sequence| {
        let len = sequence.marker.chars().count();
        let candidate = chars.get(at..at + len)?;
        sequence
            .marker
            .chars()
            .eq(candidate.iter().copied())
            .then_some((sequence.sentinel, len))
    })
}

/// A backtick run of exactly `len` appears before the paragraph ends.
fn has_closing_run(chars: &[char], from: usize, len: usize) -> bool {
    let mut i = from;
    while i < chars.len() {
        match chars[i] {
            '`' => {
                let run = run_length(chars, i, '`');
                if run == len {
                    return true;
                }
                i += run;
            }
            '\n' => {
                let rest = &chars[i + 1..];
                let blank = rest
                    .iter()
                    .take_while(|c| **c != '\n')
                    .all(|c| c.is_whitespace());
                if blank {
                    return false;
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    false
}

/// Put lone tildes back so the mark tokenizer can see them.
pub fn restore_shield(value: &str) -> String {
    value.replace(TILDE_SHIELD, "~")
}

/// Sentinels become the literal marker, in prose.
pub fn restore_text(value: &str) -> String {
    restore_with(value, |sequence, out| out.push_str(sequence.marker))
}

/// Sentinels become the original backslash escape, in verbatim content.
pub fn restore_raw(value: &str) -> String {
    restore_with(value, |sequence, out| {
        out.push('\\');
        out.push_str(sequence.marker);
    })
}

/// Undo [`preprocess`] entirely.
pub fn restore_source(value: &str) -> String {
    restore_raw(value)
}

fn restore_with(value: &str, emit: impl Fn(&EscapeSequence, &mut String)) -> String {
    if !value.chars().any(is_sentinel) {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == TILDE_SHIELD {
            out.push('~');
        } else if let Some(sequence) = ESCAPE_SEQUENCES.iter().find(|s| s.sentinel == c) {
            emit(sequence, &mut out);
        } else {
            out.push(c);
        }
    }
    out
}

fn is_sentinel(c: char) -> bool {
    c == TILDE_SHIELD || ESCAPE_SEQUENCES.iter().any(|s| s.sentinel == c)
}

/// Restore lone tildes in every string of the tree.
pub fn restore_shield_in_tree(root: &mut Root) {
    visit_strings_mut(root, &mut |_, value| {
        if value.contains(TILDE_SHIELD) {
            *value = restore_shield(value);
        }
    });
}

/// Restore escaped markers in every string of the tree.
pub fn restore_escapes_in_tree(root: &mut Root) {
    visit_strings_mut(root, &mut |kind, value| {
        if value.chars().any(is_sentinel) {
            *value = match kind {
                StringKind::Text => restore_text(value),
                StringKind::Raw => restore_raw(value),
            };
        }
    });
}
