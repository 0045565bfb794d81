//! TOML segmentation by top-level table.
//!
//! `[table]` and `[[array]]` headers are only recognised outside multi-line
//! strings and multi-line arrays. Consecutive tables sharing a top-level key
//! (`[server]`, `[server.tls]`) form one unit; keys before the first header
//! form a preamble unit with an empty table path.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use schnitt_core::{
    ChunkError, ChunkMetadata, ChunkOptions, ChunkResult, ChunkType, ChunkWarning,
    StructuredMetadata, WarningCode,
};
use tokio_util::sync::CancellationToken;

use crate::chunker::{check_cancelled, Capabilities, Chunker, ResultBuilder};
use crate::splitter::{line_spans, SizeBoundedSplitter};

const NAME: &str = "toml";
const PRIORITY: i32 = 31;

const CAPABILITIES: Capabilities = Capabilities {
    mime_types: &["application/toml", "text/x-toml"],
    extensions: &[".toml"],
    names: &["toml"],
};

static HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[\[?\s*([^\[\]]+?)\s*\]\]?\s*(?:#.*)?$").expect("static TOML header pattern compiles")
});
static KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z0-9_-]+(?:\.[A-Za-z0-9_-]+)*)\s*=").expect("static TOML key pattern compiles")
});

#[derive(Debug, Default, Clone, Copy)]
pub struct TomlChunker;

impl TomlChunker {
    pub fn new() -> Self {
        Self
    }
}

impl Chunker for TomlChunker {
    fn name(&self) -> &str {
        NAME
    }

    fn can_handle(&self, mime_type: &str, language: &str) -> bool {
        CAPABILITIES.matches(mime_type, language)
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn chunk(
        &self,
        cancel: &CancellationToken,
        content: &str,
        opts: &ChunkOptions,
    ) -> Result<ChunkResult, ChunkError> {
        if content.is_empty() {
            return Ok(ChunkResult::empty(NAME));
        }
        let splitter = SizeBoundedSplitter::new(opts.effective_max_chunk_size());
        let mut out = ResultBuilder::new(NAME);

        let outline = scan(content);
        if let Some(offset) = outline.open_array {
            tracing::warn!(offset, "TOML array still open at end of input");
            out.warn(ChunkWarning::new(
                WarningCode::TomlUnbalancedArray,
                offset,
                "array is never closed",
            ));
        }

        for (range, table_path) in units(content.len(), &outline.headers) {
            check_cancelled(cancel)?;
            let key_names = direct_keys(&outline.keys, &range);
            let template = ChunkMetadata::with_detail(
                ChunkType::Structured,
                StructuredMetadata {
                    table_path,
                    key_names,
                },
            );
            let chunks = splitter.chunk_unit(
                cancel,
                &content[range.clone()],
                range.start,
                &template,
                out.warnings_mut(),
                line_spans,
            )?;
            out.extend(chunks);
        }
        Ok(out.finish(content.len()))
    }
}

// ── Scanning ────────────────────────────────────────────────────────

struct Header {
    start: usize,
    top_level: String,
}

#[derive(Default)]
struct Outline {
    headers: Vec<Header>,
    /// Every `key =` at the start of a logical line, with its offset.
    keys: Vec<(usize, String)>,
    /// Offset of the outermost `[` of an array left open at end of input.
    open_array: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Value {
    Code,
    /// `"""` or `'''` string spanning lines.
    MultiLine(u8),
}

fn scan(text: &str) -> Outline {
    let mut outline = Outline::default();
    let mut mode = Value::Code;
    let mut depth = 0usize;
    let mut array_start = 0usize;

    for line in line_spans(text) {
        let raw = &text[line.clone()];
        let at_top = mode == Value::Code && depth == 0;
        if at_top {
            let trimmed = raw.trim();
            if let Some(caps) = HEADER.captures(trimmed) {
                outline.headers.push(Header {
                    start: line.start,
                    top_level: top_level_key(&caps[1]),
                });
                continue;
            }
            if let Some(caps) = KEY.captures(raw) {
                outline.keys.push((line.start, caps[1].to_string()));
            }
        }

        let bytes = raw.as_bytes();
        let mut i = 0;
        let mut in_value = !at_top;
        while i < bytes.len() {
            if let Value::MultiLine(quote) = mode {
                if bytes[i..].starts_with(&[quote; 3]) {
                    mode = Value::Code;
                    i += 3;
                } else {
                    i += if bytes[i] == b'\\' && quote == b'"' { 2 } else { 1 };
                }
                continue;
            }
            match bytes[i] {
                b'#' => break,
                b'=' => in_value = true,
                q @ (b'"' | b'\'') if bytes[i..].starts_with(&[q; 3]) => {
                    mode = Value::MultiLine(q);
                    i += 3;
                    continue;
                }
                q @ (b'"' | b'\'') => {
                    i = skip_string(bytes, i, q);
                    continue;
                }
                b'[' if in_value => {
                    if depth == 0 {
                        array_start = line.start + i;
                    }
                    depth += 1;
                }
                b']' if in_value && depth > 0 => depth -= 1,
                _ => {}
            }
            i += 1;
        }
    }

    if depth > 0 {
        outline.open_array = Some(array_start);
    }
    outline
}

/// Index just past a single-line string starting at `start`.
fn skip_string(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if quote == b'"' => i += 2,
            b'\n' => return i,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn top_level_key(path: &str) -> String {
    path.split('.')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string()
}

/// Preamble (if any) followed by runs of consecutive tables that share a
/// top-level key.
fn units(len: usize, headers: &[Header]) -> Vec<(Range<usize>, String)> {
    let mut units = Vec::new();
    let first = headers.first().map_or(len, |h| h.start);
    if first > 0 {
        units.push((0..first, String::new()));
    }

    let mut i = 0;
    while i < headers.len() {
        let key = &headers[i].top_level;
        let mut j = i + 1;
        while j < headers.len() && headers[j].top_level == *key {
            j += 1;
        }
        let end = headers.get(j).map_or(len, |h| h.start);
        units.push((headers[i].start..end, key.clone()));
        i = j;
    }
    units
}

/// Undotted keys defined inside `range`, first occurrence wins.
fn direct_keys(keys: &[(usize, String)], range: &Range<usize>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for (_, key) in keys.iter().filter(|(at, _)| range.contains(at)) {
        if !key.contains('.') && !out.contains(key) {
            out.push(key.clone());
        }
    }
    out
}
