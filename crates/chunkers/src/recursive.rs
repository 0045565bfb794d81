//! Plain-text segmentation by progressively finer separators.
//!
//! Text over the cap is split at section breaks, then paragraphs, lines,
//! sentence ends, clause punctuation and finally words; anything still too
//! long is cut at a char boundary. The pieces are then merged greedily back
//! up to the cap.

use std::ops::Range;

use schnitt_core::{ChunkError, ChunkMetadata, ChunkOptions, ChunkResult, ChunkType};
use tokio_util::sync::CancellationToken;

use crate::chunker::{check_cancelled, normalize_mime, Chunker, ResultBuilder};
use crate::splitter::SizeBoundedSplitter;

const NAME: &str = "recursive";
const PRIORITY: i32 = 10;

/// Largest boundary first. Each piece keeps its trailing separator.
const SEPARATORS: &[&str] = &["\n\n\n", "\n\n", "\n", ". ", "? ", "! ", "; ", ", ", " "];

#[derive(Debug, Default, Clone, Copy)]
pub struct RecursiveChunker;

impl RecursiveChunker {
    pub fn new() -> Self {
        Self
    }
}

impl Chunker for RecursiveChunker {
    fn name(&self) -> &str {
        NAME
    }

    /// Plain text, or input whose MIME type is unknown.
    fn can_handle(&self, mime_type: &str, _language: &str) -> bool {
        let mime = normalize_mime(mime_type);
        mime.is_empty() || mime == "text/plain"
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
        check_cancelled(cancel)?;
        let splitter = SizeBoundedSplitter::new(opts.effective_max_chunk_size());
        let mut out = ResultBuilder::new(NAME);

        let mut parts = Vec::new();
        pieces(content, 0..content.len(), SEPARATORS, splitter.max_size(), &mut parts);
        let chunks = splitter.split(
            cancel,
            content,
            &parts,
            0,
            &ChunkMetadata::new(ChunkType::Prose),
            out.warnings_mut(),
        )?;
        out.extend(chunks);
        Ok(out.finish(content.len()))
    }
}

/// Append to `out` ranges of `text` covering `range`, each no longer than
/// `max` bytes.
fn pieces(text: &str, range: Range<usize>, seps: &[&str], max: usize, out: &mut Vec<Range<usize>>) {
    if range.len() <= max {
        out.push(range);
        return;
    }
    let Some((sep, finer)) = seps.split_first() else {
        hard_cut(text, range, max, out);
        return;
    };

    let slice = &text[range.clone()];
    if !slice.contains(sep) {
        pieces(text, range, finer, max, out);
        return;
    }

    let mut start = range.start;
    for (idx, _) in slice.match_indices(sep) {
        let end = range.start + idx + sep.len();
        if end > start {
            pieces(text, start..end, finer, max, out);
        }
        start = end;
    }
    if start < range.end {
        pieces(text, start..range.end, finer, max, out);
    }
}

/// Fixed windows of at most `max` bytes, never splitting a character.
fn hard_cut(text: &str, range: Range<usize>, max: usize, out: &mut Vec<Range<usize>>) {
    let mut start = range.start;
    while start < range.end {
        let mut end = (start + max).min(range.end);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            // a single character wider than the cap
            end = start + 1;
            while !text.is_char_boundary(end) {
                end += 1;
            }
        }
        out.push(start..end);
        start = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str, max: usize) -> ChunkResult {
        RecursiveChunker::new()
            .chunk(
                &CancellationToken::new(),
                text,
                &ChunkOptions::default().with_max_chunk_size(max),
            )
            .unwrap()
    }

    #[test]
    fn small_text_is_one_chunk() {
        let result = run("Hello there.\n\nSecond paragraph.", 100);
        assert_eq!(result.total_chunks, 1);
        assert_eq!(result.chunks[0].metadata.chunk_type, ChunkType::Prose);
        assert!(result.chunks[0].metadata.detail.is_none());
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let text = "First paragraph is here.\n\nSecond paragraph is here.\n\nThird one.";
        let result = run(text, 30);
        let contents: Vec<&str> = result.chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["First paragraph is here.", "Second paragraph is here.", "Third one."]
        );
    }

    #[test]
    fn falls_through_to_words_and_hard_cuts() {
        let text = format!("{} tail", "x".repeat(25));
        let result = run(&text, 10);
        assert!(result.chunks.iter().all(|c| c.len() <= 10));
        assert!(result.warnings.is_empty());
        assert!(result.chunks.last().unwrap().content.ends_with("tail"));
        assert!(result.total_chunks >= 3);
    }

    #[test]
    fn offsets_reconstruct_input() {
        let text = "Lorem ipsum dolor sit amet. Consectetur adipiscing elit!\nSed do eiusmod; tempor, incididunt.";
        let result = run(text, 20);
        for c in &result.chunks {
            assert_eq!(&text[c.start_offset..c.end_offset], c.content);
            assert!(c.len() <= 20);
        }
        assert!(result
            .chunks
            .windows(2)
            .all(|w| w[0].end_offset <= w[1].start_offset));
    }

    #[test]
    fn never_cuts_inside_a_character() {
        let text = "ääääääääää";
        let result = run(text, 3);
        assert!(result.chunks.iter().all(|c| c.content.chars().all(|ch| ch == 'ä')));
        let total: usize = result.chunks.iter().map(|c| c.len()).sum();
        assert_eq!(total, text.len());
    }

    #[test]
    fn handles_plain_text_and_unknown_mime() {
        let c = RecursiveChunker::new();
        assert!(c.can_handle("text/plain", ""));
        assert!(c.can_handle("text/plain; charset=utf-8", ""));
        assert!(c.can_handle("", "notes"));
        assert!(!c.can_handle("application/sql", ""));
    }
}
