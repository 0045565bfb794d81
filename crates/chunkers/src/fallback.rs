//! Catch-all segmenter: fixed-size windows with overlap.

use schnitt_core::{Chunk, ChunkError, ChunkMetadata, ChunkOptions, ChunkResult, ChunkType};
use tokio_util::sync::CancellationToken;

use crate::chunker::{check_cancelled, Chunker, ResultBuilder};

const NAME: &str = "fallback";
const PRIORITY: i32 = 0;

/// How far back from a window end to look for whitespace.
const BREAK_SEARCH: usize = 100;

#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackChunker;

impl FallbackChunker {
    pub fn new() -> Self {
        Self
    }
}

impl Chunker for FallbackChunker {
    fn name(&self) -> &str {
        NAME
    }

    fn can_handle(&self, _mime_type: &str, _language: &str) -> bool {
        true
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
        let max = opts.effective_max_chunk_size().max(1);
        let overlap = if opts.overlap >= max { max / 4 } else { opts.overlap };
        let mut out = ResultBuilder::new(NAME);
        let len = content.len();

        let mut offset = 0;
        while offset < len {
            check_cancelled(cancel)?;
            let end = window_end(content, offset, max);
            out.push(Chunk::from_span(
                content,
                offset..end,
                0,
                ChunkMetadata::new(ChunkType::Unknown),
            ));
            if end >= len {
                break;
            }

            let mut next = end.saturating_sub(overlap);
            while !content.is_char_boundary(next) {
                next -= 1;
            }
            offset = if next > offset { next } else { end };
        }
        Ok(out.finish(len))
    }
}

/// End of the window starting at `offset`: at most `max` bytes, on a char
/// boundary, pulled back to just after whitespace when one is near the end.
fn window_end(text: &str, offset: usize, max: usize) -> usize {
    let len = text.len();
    let mut end = (offset + max).min(len);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    if end == offset {
        end = offset + 1;
        while !text.is_char_boundary(end) {
            end += 1;
        }
        return end;
    }
    if end < len && end - offset > BREAK_SEARCH {
        let floor = end - BREAK_SEARCH;
        if let Some(i) = text.as_bytes()[floor..end]
            .iter()
            .rposition(|b| matches!(b, b' ' | b'\n' | b'\r' | b'\t'))
        {
            end = floor + i + 1;
        }
    }
    end
}
