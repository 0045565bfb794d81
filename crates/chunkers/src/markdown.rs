//! Markdown segmentation by ATX heading.
//!
//! `#` to `######` headings open a new section unless they sit inside a
//! fenced code block or the leading `---` front matter. Oversized sections
//! fall back to blank-line paragraphs, never breaking a fence apart.

use std::mem;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use schnitt_core::{
    ChunkError, ChunkMetadata, ChunkOptions, ChunkResult, ChunkType, DocumentMetadata,
};
use tokio_util::sync::CancellationToken;

use crate::chunker::{check_cancelled, Capabilities, Chunker, ResultBuilder};
use crate::nesting::SectionPath;
use crate::splitter::{line_spans, paragraph_spans_with, SizeBoundedSplitter};

const NAME: &str = "markdown";
const PRIORITY: i32 = 50;

const CAPABILITIES: Capabilities = Capabilities {
    mime_types: &["text/markdown", "text/x-markdown"],
    extensions: &[".md", ".markdown"],
    names: &["markdown", "md"],
};

static HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ {0,3}(#{1,6})[ \t]+(.+?)(?:[ \t]+#+)?[ \t]*$")
        .expect("static Markdown heading pattern compiles")
});

#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownChunker;

impl MarkdownChunker {
    pub fn new() -> Self {
        Self
    }
}

impl Chunker for MarkdownChunker {
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

        for section in sections(content) {
            check_cancelled(cancel)?;
            let range = section.range.clone();
            let template = ChunkMetadata::with_detail(ChunkType::Markdown, section.metadata);
            let chunks = splitter.chunk_unit(
                cancel,
                &content[range.clone()],
                range.start,
                &template,
                out.warnings_mut(),
                paragraphs,
            )?;
            out.extend(chunks);
        }
        Ok(out.finish(content.len()))
    }
}

// ── Sectioning ──────────────────────────────────────────────────────

/// Open code fence: marker byte and run length.
#[derive(Debug, Default)]
struct Fence {
    open: Option<(u8, usize)>,
}

impl Fence {
    /// Feed one line; returns whether a fence is open after it.
    fn feed(&mut self, line: &str) -> bool {
        let trimmed = line.trim_end_matches(['\n', '\r']);
        let indent = trimmed.len() - trimmed.trim_start_matches(' ').len();
        if indent <= 3 {
            let rest = &trimmed[indent..];
            if let Some(marker) = rest.bytes().next().filter(|b| matches!(*b, b'`' | b'~')) {
                let run = rest.bytes().take_while(|b| *b == marker).count();
                match self.open {
                    None if run >= 3 => self.open = Some((marker, run)),
                    Some((m, n)) if m == marker && run >= n && rest[run..].trim().is_empty() => {
                        self.open = None
                    }
                    _ => {}
                }
            }
        }
        self.open.is_some()
    }

    fn is_open(&self) -> bool {
        self.open.is_some()
    }
}

struct Section {
    range: Range<usize>,
    metadata: DocumentMetadata,
}

/// Number of leading lines that form a `---` front matter block, if closed.
fn front_matter_lines(lines: &[Range<usize>], text: &str) -> usize {
    let is_marker = |r: &Range<usize>, closing: bool| {
        let line = text[r.clone()].trim_end();
        line == "---" || (closing && line == "...")
    };
    match lines.first() {
        Some(first) if is_marker(first, false) => lines[1..]
            .iter()
            .position(|l| is_marker(l, true))
            .map_or(0, |i| i + 2),
        _ => 0,
    }
}

fn sections(text: &str) -> Vec<Section> {
    let lines = line_spans(text);
    let skip = front_matter_lines(&lines, text);
    let mut fence = Fence::default();
    let mut path = SectionPath::new();
    let mut sections = Vec::new();
    // preamble: front matter and text before the first heading
    let mut current = Section {
        range: 0..0,
        metadata: DocumentMetadata::default(),
    };

    for (i, line) in lines.into_iter().enumerate() {
        let raw = &text[line.clone()];
        if i >= skip && !fence.is_open() {
            if let Some(caps) = HEADING.captures(raw.trim_end_matches(['\n', '\r'])) {
                let level = caps[1].len();
                let heading = caps[2].trim().to_string();
                path.enter(level, heading.as_str());
                let next = Section {
                    range: line.start..line.start,
                    metadata: DocumentMetadata {
                        heading,
                        heading_level: level,
                        section_path: path.joined(),
                    },
                };
                sections.push(mem::replace(&mut current, next));
            }
        }
        if i >= skip {
            fence.feed(raw);
        }
        current.range.end = line.end;
    }
    sections.push(current);
    sections
}

/// Blank-line paragraphs that keep fenced code blocks whole.
fn paragraphs(unit: &str) -> Vec<Range<usize>> {
    let mut fence = Fence::default();
    paragraph_spans_with(unit, |line| fence.feed(line))
}
