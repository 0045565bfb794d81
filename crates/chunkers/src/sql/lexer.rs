//! Statement splitting as an explicit lexical state machine.

use std::ops::Range;

/// Lexical context of the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LexState {
    Normal,
    /// Inside `'...'` or `"..."`; a doubled delimiter is an escaped literal.
    Quoted(char),
    /// `--` up to end of line.
    LineComment,
    /// `/* ... */`.
    BlockComment,
    /// `$tag$ ... $tag$`, holding the full tag including both `$`.
    DollarQuoted(String),
}

/// Outcome of one scanner step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Transition {
    pub next: LexState,
    /// Bytes consumed from the input, always > 0 for non-empty input.
    pub consumed: usize,
    /// The consumed bytes end a statement.
    pub terminates: bool,
}

impl Transition {
    fn stay(state: &LexState, consumed: usize) -> Self {
        Self {
            next: state.clone(),
            consumed,
            terminates: false,
        }
    }

    fn to(next: LexState, consumed: usize) -> Self {
        Self {
            next,
            consumed,
            terminates: false,
        }
    }
}

/// Pure transition from `state` over the start of `rest` (non-empty).
pub(crate) fn step(state: &LexState, rest: &str) -> Transition {
    let Some(ch) = rest.chars().next() else {
        return Transition::stay(state, 0);
    };
    let width = ch.len_utf8();

    match state {
        LexState::Normal => {
            if rest.starts_with("--") {
                Transition::to(LexState::LineComment, 2)
            } else if rest.starts_with("/*") {
                Transition::to(LexState::BlockComment, 2)
            } else if ch == '\'' || ch == '"' {
                Transition::to(LexState::Quoted(ch), 1)
            } else if ch == ';' {
                Transition {
                    next: LexState::Normal,
                    consumed: 1,
                    terminates: true,
                }
            } else if let Some(tag) = dollar_tag(rest) {
                let len = tag.len();
                Transition::to(LexState::DollarQuoted(tag.to_string()), len)
            } else {
                Transition::stay(state, width)
            }
        }
        LexState::Quoted(q) if ch == *q => {
            if rest[width..].starts_with(*q) {
                Transition::stay(state, width * 2)
            } else {
                Transition::to(LexState::Normal, width)
            }
        }
        LexState::Quoted(_) => Transition::stay(state, width),
        LexState::LineComment if ch == '\n' => Transition::to(LexState::Normal, 1),
        LexState::LineComment => Transition::stay(state, width),
        LexState::BlockComment if rest.starts_with("*/") => Transition::to(LexState::Normal, 2),
        LexState::BlockComment => Transition::stay(state, width),
        LexState::DollarQuoted(tag) if rest.starts_with(tag.as_str()) => {
            Transition::to(LexState::Normal, tag.len())
        }
        LexState::DollarQuoted(_) => Transition::stay(state, width),
    }
}

/// `$tag$` at the start of `rest`, tag being zero or more word characters.
pub(crate) fn dollar_tag(rest: &str) -> Option<&str> {
    let body = rest.strip_prefix('$')?;
    let end = body
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map(|(i, _)| i)?;
    body[end..].starts_with('$').then(|| &rest[..end + 2])
}

/// Statements found in a script.
#[derive(Debug, Default)]
pub(crate) struct Split {
    /// Byte ranges, contiguous from the start of the input. Text between a
    /// terminator and the next statement belongs to the next statement.
    pub statements: Vec<Range<usize>>,
    /// State still open at end of input with the offset where it opened.
    pub unterminated: Option<(LexState, usize)>,
}

/// Run the state machine over `text`.
pub(crate) fn split_statements(text: &str) -> Split {
    let mut split = Split::default();
    let mut state = LexState::Normal;
    let mut opened_at = 0;
    let mut start = 0;
    let mut pos = 0;

    while pos < text.len() {
        let t = step(&state, &text[pos..]);
        if state == LexState::Normal && t.next != LexState::Normal {
            opened_at = pos;
        }
        pos += t.consumed.max(1);
        state = t.next;
        if t.terminates {
            split.statements.push(start..pos);
            start = pos;
        }
    }

    if !text[start..].trim().is_empty() {
        split.statements.push(start..text.len());
    }
    match state {
        LexState::Normal | LexState::LineComment => {}
        open => split.unterminated = Some((open, opened_at)),
    }
    split
}
