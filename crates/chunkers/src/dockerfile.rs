//! Dockerfile / Containerfile segmentation by `FROM` build stage.

use std::collections::VecDeque;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use schnitt_core::{
    BuildMetadata, ChunkError, ChunkMetadata, ChunkOptions, ChunkResult, ChunkType, ChunkWarning,
    WarningCode,
};
use tokio_util::sync::CancellationToken;

use crate::chunker::{basename, check_cancelled, Capabilities, Chunker, ResultBuilder};
use crate::splitter::{line_spans, SizeBoundedSplitter};

const NAME: &str = "dockerfile";
const PRIORITY: i32 = 45;

const CAPABILITIES: Capabilities = Capabilities {
    mime_types: &["text/x-dockerfile", "application/x-dockerfile"],
    extensions: &[".dockerfile"],
    names: &["dockerfile", "containerfile"],
};

static FROM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*FROM\s+(?:--\S+\s+)*(\S+)(?:\s+AS\s+(\S+))?")
        .expect("static FROM pattern compiles")
});
static HEREDOC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^<<-?["']?([A-Za-z_][A-Za-z0-9_]*)["']?"#).expect("static heredoc pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Instruction,
    Continuation,
    HeredocBody,
    Comment,
    Blank,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DockerfileChunker;

impl DockerfileChunker {
    pub fn new() -> Self {
        Self
    }
}

impl Chunker for DockerfileChunker {
    fn name(&self) -> &str {
        NAME
    }

    fn can_handle(&self, mime_type: &str, language: &str) -> bool {
        if CAPABILITIES.matches(mime_type, language) {
            return true;
        }
        let hint = language.trim().to_ascii_lowercase();
        let base = basename(&hint);
        base.starts_with("dockerfile.") || base.starts_with("containerfile.")
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

        let Lines { kinds: lines, unclosed } = classify(content);
        if !unclosed.is_empty() {
            tracing::warn!(heredocs = unclosed.len(), "unterminated heredoc in Dockerfile");
        }
        for offset in unclosed {
            out.warn(ChunkWarning::new(
                WarningCode::DockerfileUnclosedHeredoc,
                offset,
                "heredoc terminator not found; body rescanned as instructions",
            ));
        }
        let groups = instruction_groups(content, &lines);
        let stages = stages(content, &lines);

        if stages.is_empty() {
            check_cancelled(cancel)?;
            if lines.iter().any(|(_, kind)| *kind == LineKind::Instruction) {
                tracing::warn!("Dockerfile has instructions but no FROM");
                out.warn(ChunkWarning::new(
                    WarningCode::DockerfileNoStages,
                    0,
                    "no FROM instruction found",
                ));
            }
            let unknown = ChunkMetadata::with_detail(
                ChunkType::Structured,
                BuildMetadata {
                    stage_name: "unknown".to_string(),
                    ..Default::default()
                },
            );
            let chunks = splitter.chunk_unit(
                cancel,
                content,
                0,
                &unknown,
                out.warnings_mut(),
                |_| groups.clone(),
            )?;
            out.extend(chunks);
            return Ok(out.finish(content.len()));
        }

        for (range, build) in stages {
            check_cancelled(cancel)?;
            let template = ChunkMetadata::with_detail(ChunkType::Structured, build);
            let unit = &content[range.clone()];
            let chunks = splitter.chunk_unit(
                cancel,
                unit,
                range.start,
                &template,
                out.warnings_mut(),
                |_| relative_to(&groups, &range),
            )?;
            out.extend(chunks);
        }
        Ok(out.finish(content.len()))
    }
}

/// Physical lines tagged by kind, plus the offsets of heredoc openers whose
/// terminator never appeared.
struct Lines {
    kinds: Vec<(Range<usize>, LineKind)>,
    unclosed: Vec<usize>,
}

/// Classify until every heredoc closes. An opener left dangling at end of
/// input is ignored on the next pass, so its body lines become instructions
/// again instead of swallowing later stages.
fn classify(text: &str) -> Lines {
    let mut ignored: Vec<usize> = Vec::new();
    loop {
        let (kinds, dangling) = classify_lines(text, &ignored);
        match dangling {
            Some(idx) => ignored.push(idx),
            None => {
                let unclosed = ignored.iter().map(|&idx| kinds[idx].0.start).collect();
                return Lines { kinds, unclosed };
            }
        }
    }
}

/// Tag every physical line. Continuation lines and heredoc bodies never
/// start an instruction. Lines in `ignored` open no heredocs.
///
/// Also returns the index of the line that opened the first heredoc still
/// open at end of input.
fn classify_lines(
    text: &str,
    ignored: &[usize],
) -> (Vec<(Range<usize>, LineKind)>, Option<usize>) {
    let mut continuing = false;
    let mut heredocs: VecDeque<(String, usize)> = VecDeque::new();
    let mut out = Vec::new();

    for (idx, line) in line_spans(text).into_iter().enumerate() {
        let trimmed = text[line.clone()].trim();
        let opens = !ignored.contains(&idx);
        let kind = if let Some((tag, _)) = heredocs.front() {
            if trimmed == tag {
                heredocs.pop_front();
            }
            LineKind::HeredocBody
        } else if continuing {
            // blank and comment lines do not end a continuation
            if !trimmed.is_empty() && !trimmed.starts_with('#') {
                continuing = trimmed.ends_with('\\');
                if opens {
                    heredocs.extend(heredoc_tags(trimmed).into_iter().map(|t| (t, idx)));
                }
            }
            LineKind::Continuation
        } else if trimmed.is_empty() {
            LineKind::Blank
        } else if trimmed.starts_with('#') {
            LineKind::Comment
        } else {
            continuing = trimmed.ends_with('\\');
            if opens {
                heredocs.extend(heredoc_tags(trimmed).into_iter().map(|t| (t, idx)));
            }
            LineKind::Instruction
        };
        out.push((line, kind));
    }
    let dangling = heredocs.front().map(|(_, idx)| *idx);
    (out, dangling)
}

/// Heredoc terminators opened on `line`. `<<` inside a quoted string is
/// literal text.
fn heredoc_tags(line: &str) -> Vec<String> {
    let bytes = line.as_bytes();
    let mut tags = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            q @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != q {
                    if q == b'"' && bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            // `<<<` is a here-string, not a heredoc
            b'<' if bytes[i..].starts_with(b"<<<") => i += 3,
            b'<' => match HEREDOC.captures(&line[i..]) {
                Some(caps) => {
                    tags.push(caps[1].to_string());
                    i += caps[0].len();
                }
                None => i += 1,
            },
            _ => i += 1,
        }
    }
    tags
}

/// Start of every instruction, moved up over the comment lines directly
/// above it.
fn instruction_starts(lines: &[(Range<usize>, LineKind)]) -> Vec<(usize, Range<usize>)> {
    let mut starts = Vec::new();
    let mut comments: Option<usize> = None;
    for (line, kind) in lines {
        match kind {
            LineKind::Comment => {
                comments.get_or_insert(line.start);
            }
            LineKind::Instruction => {
                let start = comments.take().unwrap_or(line.start);
                starts.push((start, line.clone()));
            }
            LineKind::Blank | LineKind::Continuation | LineKind::HeredocBody => comments = None,
        }
    }
    starts
}

/// Partition of the whole input into instruction groups.
fn instruction_groups(text: &str, lines: &[(Range<usize>, LineKind)]) -> Vec<Range<usize>> {
    let mut bounds: Vec<usize> = instruction_starts(lines).into_iter().map(|(s, _)| s).collect();
    if bounds.first() != Some(&0) {
        bounds.insert(0, 0);
    }
    bounds.push(text.len());
    bounds.windows(2).map(|w| w[0]..w[1]).collect()
}

/// Stage ranges with their metadata. The text before the first `FROM`
/// belongs to the first stage.
fn stages(text: &str, lines: &[(Range<usize>, LineKind)]) -> Vec<(Range<usize>, BuildMetadata)> {
    let mut found: Vec<(usize, BuildMetadata)> = Vec::new();
    for (start, line) in instruction_starts(lines) {
        let Some(caps) = FROM.captures(&text[line]) else {
            continue;
        };
        let stage_index = found.len();
        let stage_name = caps
            .get(2)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| format!("stage{}", stage_index + 1));
        let start = if stage_index == 0 { 0 } else { start };
        found.push((
            start,
            BuildMetadata {
                stage_name,
                base_image: caps[1].to_string(),
                stage_index,
            },
        ));
    }

    let ends: Vec<usize> = found
        .iter()
        .skip(1)
        .map(|(start, _)| *start)
        .chain(std::iter::once(text.len()))
        .collect();
    found
        .into_iter()
        .zip(ends)
        .map(|((start, meta), end)| (start..end, meta))
        .collect()
}

/// The groups inside `range`, relative to its start.
fn relative_to(groups: &[Range<usize>], range: &Range<usize>) -> Vec<Range<usize>> {
    groups
        .iter()
        .filter(|g| g.start >= range.start && g.end <= range.end)
        .map(|g| g.start - range.start..g.end - range.start)
        .collect()
}
