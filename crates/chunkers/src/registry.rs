use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use schnitt_core::{ChunkError, ChunkOptions, ChunkResult};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::chunker::Chunker;
use crate::{
    DockerfileChunker, FallbackChunker, GraphqlChunker, HclChunker, LatexChunker,
    MarkdownChunker, ProtobufChunker, RecursiveChunker, SqlChunker, StructuredChunker,
    TomlChunker,
};

/// Summary of a registered segmenter, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkerInfo {
    pub name: String,
    pub priority: i32,
    pub fallback: bool,
}

#[derive(Default)]
struct Inner {
    /// Kept sorted by priority, highest first.
    chunkers: Vec<Arc<dyn Chunker>>,
    fallback: Option<Arc<dyn Chunker>>,
}

/// Priority-ordered capability dispatch with an optional catch-all.
///
/// Registration takes the write lock and re-sorts; lookups share the read
/// lock, so one registry can serve many concurrent callers.
#[derive(Default)]
pub struct ChunkerRegistry {
    inner: RwLock<Inner>,
}

impl ChunkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in segmenter plus the fixed-size fallback.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(LatexChunker::new()));
        registry.register(Arc::new(MarkdownChunker::new()));
        registry.register(Arc::new(DockerfileChunker::new()));
        registry.register(Arc::new(HclChunker::new()));
        registry.register(Arc::new(ProtobufChunker::new()));
        registry.register(Arc::new(GraphqlChunker::new()));
        registry.register(Arc::new(StructuredChunker::new()));
        registry.register(Arc::new(SqlChunker::new()));
        registry.register(Arc::new(TomlChunker::new()));
        registry.register(Arc::new(RecursiveChunker::new()));
        registry.set_fallback(Arc::new(FallbackChunker::new()));
        registry
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a segmenter and re-sort by descending priority.
    ///
    /// The sort is stable: equal priorities keep registration order.
    pub fn register(&self, chunker: Arc<dyn Chunker>) {
        tracing::debug!(chunker = chunker.name(), priority = chunker.priority(), "registering chunker");
        let mut inner = self.write();
        inner.chunkers.push(chunker);
        inner.chunkers.sort_by_key(|c| std::cmp::Reverse(c.priority()));
    }

    pub fn register_boxed(&self, chunker: impl Chunker + 'static) {
        self.register(Arc::new(chunker));
    }

    /// Install the segmenter used when no registered predicate matches.
    pub fn set_fallback(&self, chunker: Arc<dyn Chunker>) {
        tracing::debug!(chunker = chunker.name(), "setting fallback chunker");
        self.write().fallback = Some(chunker);
    }

    /// First registered segmenter whose predicate matches, else the fallback.
    pub fn get(&self, mime_type: &str, language: &str) -> Option<Arc<dyn Chunker>> {
        let inner = self.read();
        let found = inner
            .chunkers
            .iter()
            .find(|c| c.can_handle(mime_type, language))
            .or(inner.fallback.as_ref())
            .cloned();
        tracing::trace!(
            mime_type,
            language,
            chunker = found.as_ref().map(|c| c.name()).unwrap_or("(none)"),
            "chunker lookup"
        );
        found
    }

    /// Resolve a segmenter from `opts.mime_type` / `opts.language` and run it.
    pub fn chunk(
        &self,
        cancel: &CancellationToken,
        content: &str,
        opts: &ChunkOptions,
    ) -> Result<ChunkResult, ChunkError> {
        let chunker = self
            .get(&opts.mime_type, &opts.language)
            .ok_or_else(|| ChunkError::NoChunker {
                mime_type: opts.mime_type.clone(),
                language: opts.language.clone(),
            })?;

        match chunker.chunk(cancel, content, opts) {
            Ok(result) => Ok(result),
            Err(ChunkError::Cancelled) => Err(ChunkError::Cancelled),
            Err(ChunkError::Failed(msg)) => Err(ChunkError::Failed(msg)),
            Err(e) => Err(ChunkError::Failed(e.to_string())),
        }
    }

    /// Snapshot of registered segmenters in dispatch order, fallback last.
    pub fn list(&self) -> Vec<ChunkerInfo> {
        let inner = self.read();
        inner
            .chunkers
            .iter()
            .map(|c| ChunkerInfo {
                name: c.name().to_string(),
                priority: c.priority(),
                fallback: false,
            })
            .chain(inner.fallback.iter().map(|c| ChunkerInfo {
                name: c.name().to_string(),
                priority: c.priority(),
                fallback: true,
            }))
            .collect()
    }

    /// Number of registered segmenters, not counting the fallback.
    pub fn len(&self) -> usize {
        self.read().chunkers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().chunkers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use schnitt_core::{Chunk, ChunkMetadata, ChunkType};

    use super::*;

    /// Minimal segmenter emitting the whole input as one chunk.
    struct Stub {
        name: &'static str,
        priority: i32,
        token: &'static str,
    }

    impl Chunker for Stub {
        fn name(&self) -> &str {
            self.name
        }

        fn can_handle(&self, _mime_type: &str, language: &str) -> bool {
            language == self.token
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn chunk(
            &self,
            _cancel: &CancellationToken,
            content: &str,
            _opts: &ChunkOptions,
        ) -> Result<ChunkResult, ChunkError> {
            let chunks: Vec<Chunk> = Chunk::from_span(
                content,
                0..content.len(),
                0,
                ChunkMetadata::new(ChunkType::Unknown),
            )
            .into_iter()
            .collect();
            Ok(ChunkResult {
                total_chunks: chunks.len(),
                chunks,
                warnings: Vec::new(),
                chunker_used: self.name.to_string(),
                original_size: content.len(),
            })
        }
    }

    struct Failing;

    impl Chunker for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn can_handle(&self, _mime_type: &str, language: &str) -> bool {
            language == "boom"
        }

        fn priority(&self) -> i32 {
            1
        }

        fn chunk(
            &self,
            _cancel: &CancellationToken,
            _content: &str,
            _opts: &ChunkOptions,
        ) -> Result<ChunkResult, ChunkError> {
            Err(ChunkError::NoChunker {
                mime_type: String::new(),
                language: "inner".into(),
            })
        }
    }

    fn stub(name: &'static str, priority: i32, token: &'static str) -> Arc<dyn Chunker> {
        Arc::new(Stub { name, priority, token })
    }

    #[test]
    fn highest_priority_match_wins() {
        let registry = ChunkerRegistry::new();
        registry.register(stub("low", 10, "x"));
        registry.register(stub("high", 50, "x"));
        assert_eq!(registry.get("", "x").unwrap().name(), "high");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn equal_priority_keeps_insertion_order() {
        let registry = ChunkerRegistry::new();
        registry.register(stub("first", 20, "x"));
        registry.register(stub("second", 20, "x"));
        registry.register(stub("other", 30, "y"));
        assert_eq!(registry.get("", "x").unwrap().name(), "first");
        let names: Vec<String> = registry.list().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["other", "first", "second"]);
    }

    #[test]
    fn fallback_used_when_nothing_matches() {
        let registry = ChunkerRegistry::new();
        registry.register(stub("x", 20, "x"));
        assert!(registry.get("", "zzz").is_none());
        registry.set_fallback(stub("catch-all", 0, "never"));
        let result = registry
            .chunk(&CancellationToken::new(), "hello", &ChunkOptions::for_language("zzz"))
            .unwrap();
        assert_eq!(result.chunker_used, "catch-all");
        let listing = registry.list();
        assert!(listing.last().unwrap().fallback);
    }

    #[test]
    fn missing_chunker_names_request() {
        let registry = ChunkerRegistry::new();
        let err = registry
            .chunk(&CancellationToken::new(), "x", &ChunkOptions::for_language("cobol"))
            .unwrap_err();
        assert!(matches!(err, ChunkError::NoChunker { ref language, .. } if language == "cobol"));
    }

    #[test]
    fn inner_errors_are_wrapped() {
        let registry = ChunkerRegistry::new();
        registry.register(Arc::new(Failing));
        let err = registry
            .chunk(&CancellationToken::new(), "x", &ChunkOptions::for_language("boom"))
            .unwrap_err();
        assert!(matches!(err, ChunkError::Failed(_)));
        assert!(err.to_string().starts_with("chunking failed: "));
    }

    #[test]
    fn defaults_cover_every_builtin() {
        let registry = ChunkerRegistry::with_defaults();
        assert_eq!(registry.len(), 10);
        let listing = registry.list();
        assert_eq!(listing.first().unwrap().name, "latex");
        assert_eq!(listing.last().unwrap().name, "fallback");
        assert_eq!(registry.get("", "main.tf").unwrap().name(), "hcl");
        assert_eq!(registry.get("", "schema.sql").unwrap().name(), "sql");
        assert_eq!(registry.get("", "docs/README.md").unwrap().name(), "markdown");
        assert_eq!(registry.get("application/json", "").unwrap().name(), "structured");
        assert_eq!(registry.get("", "compose.yaml").unwrap().name(), "structured");
        assert_eq!(registry.get("application/octet-stream", "blob.bin").unwrap().name(), "fallback");
    }
}
