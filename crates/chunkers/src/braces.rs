//! Line-oriented brace scanner shared by the schema-language segmenters.
//!
//! Records, for every physical line, the brace depth and literal state at
//! its start, so a segmenter can test boundary patterns only on lines that
//! begin at the top level. Comments and string literals are skipped
//! according to a per-language [`Syntax`].

use std::ops::Range;

use crate::nesting::NestingStack;
use crate::splitter::line_spans;

/// Comment and string delimiters of one language.
pub(crate) struct Syntax {
    pub line_comments: &'static [&'static str],
    pub block_comment: Option<(&'static str, &'static str)>,
    /// Single-line string quote bytes.
    pub quotes: &'static [u8],
    /// Multi-line string delimiter such as `"""`.
    pub block_string: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Literal {
    None,
    Str(u8),
    BlockString,
    BlockComment,
}

/// State at the first byte of a line.
#[derive(Debug, Clone)]
pub(crate) struct LineState {
    pub range: Range<usize>,
    pub depth: usize,
    /// The line starts inside a block comment or block string.
    pub in_literal: bool,
}

impl LineState {
    pub fn is_top_level(&self) -> bool {
        self.depth == 0 && !self.in_literal
    }
}

#[derive(Debug, Default)]
pub(crate) struct BraceScan {
    pub lines: Vec<LineState>,
    /// Offsets of unmatched `}` and of `{` never closed, with a message.
    pub errors: Vec<(usize, String)>,
}

pub(crate) fn scan(text: &str, syntax: &Syntax) -> BraceScan {
    let mut out = BraceScan::default();
    let mut open: NestingStack<usize> = NestingStack::new();
    let mut literal = Literal::None;
    let mut literal_start = 0;

    for line in line_spans(text) {
        out.lines.push(LineState {
            range: line.clone(),
            depth: open.depth(),
            in_literal: matches!(literal, Literal::BlockString | Literal::BlockComment),
        });

        let bytes = &text.as_bytes()[line.clone()];
        let mut i = 0;
        while i < bytes.len() {
            let rest = &bytes[i..];
            match literal {
                Literal::Str(q) => {
                    match bytes[i] {
                        b'\\' => i += 1,
                        b'\n' => literal = Literal::None,
                        b if b == q => literal = Literal::None,
                        _ => {}
                    }
                    i += 1;
                }
                Literal::BlockString => {
                    let delim = syntax.block_string.unwrap_or("\"\"\"").as_bytes();
                    if rest.starts_with(b"\\") && rest[1..].starts_with(delim) {
                        i += 1 + delim.len();
                    } else if rest.starts_with(delim) {
                        literal = Literal::None;
                        i += delim.len();
                    } else {
                        i += 1;
                    }
                }
                Literal::BlockComment => {
                    let close = syntax.block_comment.map_or("*/", |(_, c)| c).as_bytes();
                    if rest.starts_with(close) {
                        literal = Literal::None;
                        i += close.len();
                    } else {
                        i += 1;
                    }
                }
                Literal::None => {
                    if syntax
                        .line_comments
                        .iter()
                        .any(|c| rest.starts_with(c.as_bytes()))
                    {
                        break;
                    }
                    if let Some((opener, _)) = syntax.block_comment {
                        if rest.starts_with(opener.as_bytes()) {
                            literal = Literal::BlockComment;
                            literal_start = line.start + i;
                            i += opener.len();
                            continue;
                        }
                    }
                    if let Some(delim) = syntax.block_string {
                        if rest.starts_with(delim.as_bytes()) {
                            literal = Literal::BlockString;
                            literal_start = line.start + i;
                            i += delim.len();
                            continue;
                        }
                    }
                    match bytes[i] {
                        q if syntax.quotes.contains(&q) => literal = Literal::Str(q),
                        b'{' => open.push(line.start + i),
                        b'}' => {
                            if open.pop().is_none() {
                                out.errors.push((line.start + i, "unmatched '}'".to_string()));
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
            }
        }
    }

    match literal {
        Literal::BlockComment => out.errors.push((literal_start, "unclosed block comment".into())),
        Literal::BlockString => out.errors.push((literal_start, "unclosed block string".into())),
        Literal::None | Literal::Str(_) => {}
    }
    for at in open.iter() {
        out.errors.push((*at, "unclosed '{'".to_string()));
    }
    out
}

/// A top-level definition (or the text before the first one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Unit {
    pub range: Range<usize>,
    /// The boundary line; `None` for leading text.
    pub header: Option<Range<usize>>,
}

/// Partition `text` at top-level lines accepted by `is_boundary`. Each
/// boundary absorbs the annotation lines (comments, descriptions) directly
/// above it.
pub(crate) fn definition_units<B, A>(
    text: &str,
    scan: &BraceScan,
    is_boundary: B,
    is_annotation: A,
) -> Vec<Unit>
where
    B: Fn(&str) -> bool,
    A: Fn(&LineState, &str) -> bool,
{
    let mut starts: Vec<(usize, Range<usize>)> = Vec::new();
    let mut floor = 0;
    for (idx, line) in scan.lines.iter().enumerate() {
        if !line.is_top_level() || !is_boundary(&text[line.range.clone()]) {
            continue;
        }
        let mut first = idx;
        while first > floor {
            let above = &scan.lines[first - 1];
            let above_text = &text[above.range.clone()];
            if above.depth == 0 && is_annotation(above, above_text) {
                first -= 1;
            } else {
                break;
            }
        }
        starts.push((scan.lines[first].range.start, line.range.clone()));
        floor = idx + 1;
    }

    let mut units = Vec::new();
    let first_start = starts.first().map_or(text.len(), |(s, _)| *s);
    if !text[..first_start].trim().is_empty() || starts.is_empty() {
        units.push(Unit {
            range: 0..first_start,
            header: None,
        });
    }
    let ends: Vec<usize> = starts
        .iter()
        .skip(1)
        .map(|(s, _)| *s)
        .chain(std::iter::once(text.len()))
        .collect();
    for ((start, header), end) in starts.into_iter().zip(ends) {
        units.push(Unit {
            range: start..end,
            header: Some(header),
        });
    }
    units
}
