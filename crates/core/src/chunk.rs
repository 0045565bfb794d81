use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::tokens::estimate_tokens;

/// Broad content category of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    Prose,
    Code,
    Markdown,
    Structured,
    /// No structure was recognised (fallback output).
    Unknown,
}

/// One emitted unit of segmented content.
///
/// `content` is always the exact slice `[start_offset, end_offset)` of the
/// coordinate space the chunk was cut from, with surrounding whitespace
/// already trimmed away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// 0-based position in the output sequence.
    pub index: usize,
    pub content: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Cut `source[range]`, trim it and shift the range by `base_offset`.
    ///
    /// Returns `None` when the span is empty or whitespace-only; such units
    /// are dropped, never emitted. The token estimate is recomputed from the
    /// trimmed content, the rest of `metadata` is taken as-is.
    pub fn from_span(
        source: &str,
        range: Range<usize>,
        base_offset: usize,
        mut metadata: ChunkMetadata,
    ) -> Option<Self> {
        let raw = &source[range.clone()];
        let leading = raw.len() - raw.trim_start().len();
        let content = raw.trim();
        if content.is_empty() {
            return None;
        }
        let start = base_offset + range.start + leading;
        metadata.token_estimate = estimate_tokens(content);
        Some(Self {
            index: 0,
            content: content.to_string(),
            start_offset: start,
            end_offset: start + content.len(),
            metadata,
        })
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Metadata shared by every chunk plus one optional format-specific detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub chunk_type: ChunkType,
    /// Always > 0 for non-empty content.
    pub token_estimate: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<ChunkDetail>,
}

impl ChunkMetadata {
    pub fn new(chunk_type: ChunkType) -> Self {
        Self {
            chunk_type,
            token_estimate: 0,
            detail: None,
        }
    }

    pub fn with_detail(chunk_type: ChunkType, detail: impl Into<ChunkDetail>) -> Self {
        Self {
            chunk_type,
            token_estimate: 0,
            detail: Some(detail.into()),
        }
    }

    pub fn sql(&self) -> Option<&SqlMetadata> {
        match &self.detail {
            Some(ChunkDetail::Sql(m)) => Some(m),
            _ => None,
        }
    }

    pub fn document(&self) -> Option<&DocumentMetadata> {
        match &self.detail {
            Some(ChunkDetail::Document(m)) => Some(m),
            _ => None,
        }
    }

    pub fn build(&self) -> Option<&BuildMetadata> {
        match &self.detail {
            Some(ChunkDetail::Build(m)) => Some(m),
            _ => None,
        }
    }

    pub fn infra(&self) -> Option<&InfraMetadata> {
        match &self.detail {
            Some(ChunkDetail::Infra(m)) => Some(m),
            _ => None,
        }
    }

    pub fn schema(&self) -> Option<&SchemaMetadata> {
        match &self.detail {
            Some(ChunkDetail::Schema(m)) => Some(m),
            _ => None,
        }
    }

    pub fn structured(&self) -> Option<&StructuredMetadata> {
        match &self.detail {
            Some(ChunkDetail::Structured(m)) => Some(m),
            _ => None,
        }
    }
}

/// Format-specific chunk detail. At most one is attached per chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChunkDetail {
    Sql(SqlMetadata),
    Document(DocumentMetadata),
    Build(BuildMetadata),
    Infra(InfraMetadata),
    Schema(SchemaMetadata),
    Structured(StructuredMetadata),
}

// ── Detail variants ─────────────────────────────────────────────────

/// SQL statement classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlMetadata {
    /// CREATE, ALTER, INSERT, SELECT, ...
    pub statement_type: String,
    /// TABLE, VIEW, INDEX, FUNCTION, PROCEDURE, TRIGGER, QUERY, ...
    pub object_type: String,
    pub table_name: String,
    pub procedure_name: String,
    /// postgresql, mysql, sqlite, sqlserver, oracle, or empty.
    pub dialect: String,
}

/// Sectioned documents (LaTeX and friends).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub heading: String,
    pub heading_level: usize,
    /// Ancestor headings joined with `" > "`.
    pub section_path: String,
}

/// Container build stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMetadata {
    pub stage_name: String,
    pub base_image: String,
    /// 0-based ordinal of the stage in the file.
    pub stage_index: usize,
}

/// HCL / Terraform blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfraMetadata {
    /// resource, data, variable, module, ... or "unknown".
    pub block_type: String,
    pub labels: Vec<String>,
    pub resource_type: String,
    pub resource_name: String,
    pub section_path: String,
}

/// Interface definition languages (Protobuf, GraphQL).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMetadata {
    /// message, enum, service, type, input, ... preamble, unknown.
    pub type_kind: String,
    pub type_name: String,
    pub message_name: String,
    pub service_name: String,
    pub rpc_names: Vec<String>,
}

/// Key/value configuration files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredMetadata {
    pub table_path: String,
    pub key_names: Vec<String>,
}

macro_rules! impl_into_detail {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for ChunkDetail {
                fn from(m: $ty) -> Self {
                    ChunkDetail::$variant(m)
                }
            }
        )*
    };
}

impl_into_detail! {
    SqlMetadata => Sql,
    DocumentMetadata => Document,
    BuildMetadata => Build,
    InfraMetadata => Infra,
    SchemaMetadata => Schema,
    StructuredMetadata => Structured,
}
