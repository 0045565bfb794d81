use serde::{Deserialize, Serialize};

/// Soft byte cap substituted when `max_chunk_size` is 0.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 8000;
/// ~2000 tokens at four bytes per token.
pub const DEFAULT_MAX_TOKENS: usize = 2000;
/// Window overlap used by the fixed-size fallback segmenter.
pub const DEFAULT_OVERLAP: usize = 200;

/// Per-call segmentation options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkOptions {
    /// Soft byte cap per chunk. 0 means "use the default".
    pub max_chunk_size: usize,
    /// Secondary cap, honoured only by some segmenters.
    pub max_tokens: usize,
    /// Overlap in bytes between fixed-size windows (fallback only).
    pub overlap: usize,
    pub mime_type: String,
    /// Bare language name, file extension or full path.
    pub language: String,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            max_tokens: DEFAULT_MAX_TOKENS,
            overlap: DEFAULT_OVERLAP,
            mime_type: String::new(),
            language: String::new(),
        }
    }
}

impl ChunkOptions {
    /// Options for a language/filename hint with default limits.
    pub fn for_language(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            ..Default::default()
        }
    }

    /// Options for a MIME type with default limits.
    pub fn for_mime(mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            ..Default::default()
        }
    }

    pub fn with_max_chunk_size(mut self, max_chunk_size: usize) -> Self {
        self.max_chunk_size = max_chunk_size;
        self
    }

    /// The byte cap to enforce, substituting the default for 0.
    pub fn effective_max_chunk_size(&self) -> usize {
        if self.max_chunk_size == 0 {
            DEFAULT_MAX_CHUNK_SIZE
        } else {
            self.max_chunk_size
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_cap_falls_back_to_default() {
        let opts = ChunkOptions::default().with_max_chunk_size(0);
        assert_eq!(opts.effective_max_chunk_size(), DEFAULT_MAX_CHUNK_SIZE);
    }

    #[test]
    fn explicit_cap_is_kept() {
        let opts = ChunkOptions::for_language("schema.sql").with_max_chunk_size(512);
        assert_eq!(opts.effective_max_chunk_size(), 512);
        assert_eq!(opts.language, "schema.sql");
        assert!(opts.mime_type.is_empty());
    }
}
