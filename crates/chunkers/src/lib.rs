//! Format-aware segmenters and the registry that dispatches between them.
//!
//! # Architecture
//!
//! - **chunker**: the [`Chunker`] capability trait every segmenter implements
//! - **registry**: priority-ordered dispatch with a fallback
//! - **splitter**: [`SizeBoundedSplitter`], re-splitting of oversized units
//! - **nesting**: value-type stacks for bracket and section tracking
//! - one module per format: `sql`, `hcl`, `latex`, `markdown`, `dockerfile`,
//!   `toml`, `graphql`, `protobuf`, `structured` (JSON, YAML, CSV), plus
//!   `recursive` for plain text and `fallback`
//!
//! # Usage
//!
//! ```no_run
//! use schnitt_chunkers::ChunkerRegistry;
//! use schnitt_core::ChunkOptions;
//! use tokio_util::sync::CancellationToken;
//!
//! let registry = ChunkerRegistry::with_defaults();
//! let opts = ChunkOptions::for_language("schema.sql");
//! let result = registry
//!     .chunk(&CancellationToken::new(), "CREATE TABLE t (id INT);", &opts)
//!     .unwrap();
//! assert_eq!(result.chunker_used, "sql");
//! ```

mod braces;
pub mod chunker;
pub mod dockerfile;
pub mod fallback;
pub mod graphql;
pub mod hcl;
pub mod latex;
pub mod markdown;
pub mod nesting;
pub mod protobuf;
pub mod recursive;
pub mod registry;
pub mod splitter;
pub mod sql;
pub mod structured;
pub mod toml;

pub use chunker::Chunker;
pub use dockerfile::DockerfileChunker;
pub use fallback::FallbackChunker;
pub use graphql::GraphqlChunker;
pub use hcl::HclChunker;
pub use latex::LatexChunker;
pub use markdown::MarkdownChunker;
pub use nesting::{NestingStack, SectionPath};
pub use protobuf::ProtobufChunker;
pub use recursive::RecursiveChunker;
pub use registry::{ChunkerInfo, ChunkerRegistry};
pub use splitter::{line_spans, paragraph_spans, paragraph_spans_with, SizeBoundedSplitter};
pub use sql::SqlChunker;
pub use structured::StructuredChunker;
pub use toml::TomlChunker;
