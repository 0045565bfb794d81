use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChunkError {
    /// Caller-triggered cancellation. Partial output is discarded.
    #[error("chunking cancelled")]
    Cancelled,

    /// No registered segmenter matched and no fallback is installed.
    #[error("no chunker available for mime={mime_type} lang={language}")]
    NoChunker { mime_type: String, language: String },

    #[error("chunking failed: {0}")]
    Failed(String),
}

impl ChunkError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ChunkError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_chunker_names_the_request() {
        let err = ChunkError::NoChunker {
            mime_type: "text/x-foo".into(),
            language: "foo".into(),
        };
        assert_eq!(err.to_string(), "no chunker available for mime=text/x-foo lang=foo");
        assert!(!err.is_cancelled());
    }

    #[test]
    fn cancelled_display() {
        assert_eq!(ChunkError::Cancelled.to_string(), "chunking cancelled");
        assert!(ChunkError::Cancelled.is_cancelled());
    }
}
