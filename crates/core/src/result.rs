use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chunk::Chunk;

/// Stable machine-readable warning codes.
///
/// Serialized as their SCREAMING_SNAKE string so callers can branch on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    HclParseError,
    ProtobufParseError,
    GraphqlUnbalancedBraces,
    LatexUnbalancedEnvironment,
    SqlUnterminatedStatement,
    TomlUnbalancedArray,
    DockerfileNoStages,
    /// A heredoc opener whose terminator never appears; its lines were
    /// rescanned as ordinary instructions.
    DockerfileUnclosedHeredoc,
    StructuredParseError,
    /// A single atomic component exceeded `max_chunk_size` and was emitted whole.
    OversizedAtomicComponent,
}

impl WarningCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningCode::HclParseError => "HCL_PARSE_ERROR",
            WarningCode::ProtobufParseError => "PROTOBUF_PARSE_ERROR",
            WarningCode::GraphqlUnbalancedBraces => "GRAPHQL_UNBALANCED_BRACES",
            WarningCode::LatexUnbalancedEnvironment => "LATEX_UNBALANCED_ENVIRONMENT",
            WarningCode::SqlUnterminatedStatement => "SQL_UNTERMINATED_STATEMENT",
            WarningCode::TomlUnbalancedArray => "TOML_UNBALANCED_ARRAY",
            WarningCode::DockerfileNoStages => "DOCKERFILE_NO_STAGES",
            WarningCode::DockerfileUnclosedHeredoc => "DOCKERFILE_UNCLOSED_HEREDOC",
            WarningCode::StructuredParseError => "STRUCTURED_PARSE_ERROR",
            WarningCode::OversizedAtomicComponent => "OVERSIZED_ATOMIC_COMPONENT",
        }
    }
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal issue found while segmenting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkWarning {
    /// Byte offset in the input the issue relates to.
    pub offset: usize,
    pub message: String,
    pub code: WarningCode,
}

impl ChunkWarning {
    pub fn new(code: WarningCode, offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
            code,
        }
    }
}

/// Output of one segmentation call. Built fresh per call, never mutated after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkResult {
    pub chunks: Vec<Chunk>,
    pub warnings: Vec<ChunkWarning>,
    pub total_chunks: usize,
    /// Name of the segmenter that actually produced the chunks.
    pub chunker_used: String,
    /// Input size in bytes.
    pub original_size: usize,
}

impl ChunkResult {
    /// The zero-chunk result every segmenter returns for empty input.
    pub fn empty(chunker_used: &str) -> Self {
        Self {
            chunks: Vec::new(),
            warnings: Vec::new(),
            total_chunks: 0,
            chunker_used: chunker_used.to_string(),
            original_size: 0,
        }
    }

    pub fn has_warning(&self, code: WarningCode) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_code_serializes_as_stable_string() {
        let w = ChunkWarning::new(WarningCode::HclParseError, 12, "unexpected '}'");
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["code"], "HCL_PARSE_ERROR");
        assert_eq!(json["offset"], 12);
    }

    #[test]
    fn as_str_matches_serde_name() {
        for code in [
            WarningCode::HclParseError,
            WarningCode::ProtobufParseError,
            WarningCode::GraphqlUnbalancedBraces,
            WarningCode::LatexUnbalancedEnvironment,
            WarningCode::SqlUnterminatedStatement,
            WarningCode::TomlUnbalancedArray,
            WarningCode::DockerfileNoStages,
            WarningCode::DockerfileUnclosedHeredoc,
            WarningCode::StructuredParseError,
            WarningCode::OversizedAtomicComponent,
        ] {
            let json = serde_json::to_value(code).unwrap();
            assert_eq!(json, code.as_str());
        }
    }

    #[test]
    fn empty_result_has_no_chunks() {
        let r = ChunkResult::empty("sql");
        assert_eq!(r.total_chunks, 0);
        assert_eq!(r.original_size, 0);
        assert_eq!(r.chunker_used, "sql");
        assert!(r.warnings.is_empty());
    }
}
