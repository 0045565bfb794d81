//! Size-bounded re-splitting of oversized structural units.
//!
//! Every segmenter hands units larger than `max_chunk_size` to
//! [`SizeBoundedSplitter`] together with the unit's next-finer components
//! (statements, lines, paragraphs, instruction groups). Components are
//! accumulated greedily and never cut, so a single component larger than the
//! cap is emitted whole and flagged with an `OVERSIZED_ATOMIC_COMPONENT`
//! warning.

use std::ops::Range;

use schnitt_core::{Chunk, ChunkError, ChunkMetadata, ChunkWarning, WarningCode};
use tokio_util::sync::CancellationToken;

use crate::chunker::check_cancelled;

#[derive(Debug, Clone, Copy)]
pub struct SizeBoundedSplitter {
    max_size: usize,
}

impl SizeBoundedSplitter {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.max(1),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Emit `unit` as one chunk when it fits, otherwise split it along the
    /// components produced by `components`.
    ///
    /// `unit` must start at `base_offset` in the coordinate space.
    pub fn chunk_unit<F>(
        &self,
        cancel: &CancellationToken,
        unit: &str,
        base_offset: usize,
        template: &ChunkMetadata,
        warnings: &mut Vec<ChunkWarning>,
        components: F,
    ) -> Result<Vec<Chunk>, ChunkError>
    where
        F: FnOnce(&str) -> Vec<Range<usize>>,
    {
        if unit.trim().len() <= self.max_size {
            return Ok(Chunk::from_span(unit, 0..unit.len(), base_offset, template.clone())
                .into_iter()
                .collect());
        }
        let parts = components(unit);
        self.split(cancel, unit, &parts, base_offset, template, warnings)
    }

    /// Greedy accumulation over `components` (ranges relative to `unit`, in
    /// order, non-overlapping).
    ///
    /// Each sub-chunk spans from its first component's start to its last
    /// component's end, so separators between components stay in place and
    /// offsets reconstruct the original bytes exactly.
    pub fn split(
        &self,
        cancel: &CancellationToken,
        unit: &str,
        components: &[Range<usize>],
        base_offset: usize,
        template: &ChunkMetadata,
        warnings: &mut Vec<ChunkWarning>,
    ) -> Result<Vec<Chunk>, ChunkError> {
        let mut out = Vec::new();
        let mut pending: Option<Range<usize>> = None;

        for comp in components {
            check_cancelled(cancel)?;
            if unit[comp.clone()].trim().is_empty() {
                continue;
            }
            pending = match pending.take() {
                Some(buf) if self.span_len(unit, buf.start..comp.end) > self.max_size => {
                    self.flush(unit, buf, base_offset, template, warnings, &mut out);
                    Some(comp.clone())
                }
                Some(buf) => Some(buf.start..comp.end),
                None => Some(comp.clone()),
            };
        }
        if let Some(buf) = pending {
            self.flush(unit, buf, base_offset, template, warnings, &mut out);
        }
        Ok(out)
    }

    fn span_len(&self, unit: &str, range: Range<usize>) -> usize {
        unit[range].trim().len()
    }

    fn flush(
        &self,
        unit: &str,
        range: Range<usize>,
        base_offset: usize,
        template: &ChunkMetadata,
        warnings: &mut Vec<ChunkWarning>,
        out: &mut Vec<Chunk>,
    ) {
        let Some(chunk) = Chunk::from_span(unit, range, base_offset, template.clone()) else {
            return;
        };
        if chunk.len() > self.max_size {
            tracing::debug!(
                size = chunk.len(),
                max_size = self.max_size,
                offset = chunk.start_offset,
                "emitting oversized atomic component"
            );
            warnings.push(ChunkWarning::new(
                WarningCode::OversizedAtomicComponent,
                chunk.start_offset,
                format!(
                    "atomic component of {} bytes exceeds max chunk size {}",
                    chunk.len(),
                    self.max_size
                ),
            ));
        }
        out.push(chunk);
    }
}

// ── Component helpers ───────────────────────────────────────────────

/// Every line of `text`, each range including its trailing `\n`.
pub fn line_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            spans.push(start..i + 1);
            start = i + 1;
        }
    }
    if start < text.len() {
        spans.push(start..text.len());
    }
    spans
}

/// Runs of non-blank lines separated by one or more blank lines.
pub fn paragraph_spans(text: &str) -> Vec<Range<usize>> {
    paragraph_spans_with(text, |_| false)
}

/// Like [`paragraph_spans`], but a blank line only breaks a paragraph when
/// `holds_open` has not reported an open region for the lines seen so far.
///
/// `holds_open` sees every line that does not end a paragraph, in order, and
/// returns whether a protected region is open after that line.
pub fn paragraph_spans_with<F>(text: &str, mut holds_open: F) -> Vec<Range<usize>>
where
    F: FnMut(&str) -> bool,
{
    let mut spans = Vec::new();
    let mut current: Option<Range<usize>> = None;
    let mut open = false;

    for line in line_spans(text) {
        let content = &text[line.clone()];
        if content.trim().is_empty() && !open {
            if let Some(p) = current.take() {
                spans.push(p);
            }
            continue;
        }
        open = holds_open(content);
        current = Some(match current {
            Some(p) => p.start..line.end,
            None => line,
        });
    }
    if let Some(p) = current {
        spans.push(p);
    }
    spans
}
