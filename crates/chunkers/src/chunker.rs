//! The segmenter capability contract and helpers shared by every segmenter.

use schnitt_core::{Chunk, ChunkError, ChunkOptions, ChunkResult, ChunkWarning};
use tokio_util::sync::CancellationToken;

/// A format-specific segmenter.
///
/// Implementations are stateless between calls, so one instance can serve
/// any number of concurrent callers.
pub trait Chunker: Send + Sync {
    /// Stable identifier reported as `chunker_used`.
    fn name(&self) -> &str;

    /// Pure, case-insensitive capability predicate.
    fn can_handle(&self, mime_type: &str, language: &str) -> bool;

    /// Higher wins when several segmenters claim the same input.
    fn priority(&self) -> i32;

    /// Segment `content`. Empty input yields [`ChunkResult::empty`].
    fn chunk(
        &self,
        cancel: &CancellationToken,
        content: &str,
        opts: &ChunkOptions,
    ) -> Result<ChunkResult, ChunkError>;
}

/// Bail out with [`ChunkError::Cancelled`] once the token fires.
pub(crate) fn check_cancelled(cancel: &CancellationToken) -> Result<(), ChunkError> {
    if cancel.is_cancelled() {
        Err(ChunkError::Cancelled)
    } else {
        Ok(())
    }
}

// ── Capability matching ─────────────────────────────────────────────

/// Static description of what a segmenter accepts.
pub(crate) struct Capabilities {
    /// Exact MIME types (parameters after `;` are ignored).
    pub mime_types: &'static [&'static str],
    /// File-extension suffixes including the dot.
    pub extensions: &'static [&'static str],
    /// Bare language names.
    pub names: &'static [&'static str],
}

impl Capabilities {
    /// Match the MIME type exactly, the hint and its final path segment
    /// against the extension suffixes and the bare names.
    pub fn matches(&self, mime_type: &str, language: &str) -> bool {
        let mime = normalize_mime(mime_type);
        if !mime.is_empty() && self.mime_types.iter().any(|m| *m == mime) {
            return true;
        }

        let hint = language.trim().to_ascii_lowercase();
        if hint.is_empty() {
            return false;
        }
        let base = basename(&hint);
        let found = [hint.as_str(), base].iter().any(|candidate| {
            self.names.iter().any(|n| n == candidate)
                || self.extensions.iter().any(|ext| {
                    candidate.ends_with(*ext) || ext.strip_prefix('.') == Some(*candidate)
                })
        });
        found
    }
}

/// Lower-case MIME type without parameters.
pub(crate) fn normalize_mime(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Final path segment of a hint, accepting both separators.
pub(crate) fn basename(hint: &str) -> &str {
    hint.rsplit(['/', '\\']).next().unwrap_or(hint)
}

// ── Result assembly ─────────────────────────────────────────────────

/// Collects chunks and warnings for one call and stamps the final result.
pub(crate) struct ResultBuilder {
    chunker: &'static str,
    chunks: Vec<Chunk>,
    warnings: Vec<ChunkWarning>,
}

impl ResultBuilder {
    pub fn new(chunker: &'static str) -> Self {
        Self {
            chunker,
            chunks: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn push(&mut self, chunk: Option<Chunk>) {
        if let Some(chunk) = chunk {
            self.chunks.push(chunk);
        }
    }

    pub fn extend(&mut self, chunks: impl IntoIterator<Item = Chunk>) {
        self.chunks.extend(chunks);
    }

    pub fn warn(&mut self, warning: ChunkWarning) {
        self.warnings.push(warning);
    }

    pub fn warnings_mut(&mut self) -> &mut Vec<ChunkWarning> {
        &mut self.warnings
    }

    /// Assign contiguous indices and build the result.
    pub fn finish(mut self, original_size: usize) -> ChunkResult {
        for (i, c) in self.chunks.iter_mut().enumerate() {
            c.index = i;
        }
        tracing::debug!(
            chunker = self.chunker,
            chunks = self.chunks.len(),
            warnings = self.warnings.len(),
            original_size,
            "segmentation finished"
        );
        ChunkResult {
            total_chunks: self.chunks.len(),
            chunks: self.chunks,
            warnings: self.warnings,
            chunker_used: self.chunker.to_string(),
            original_size,
        }
    }
}
