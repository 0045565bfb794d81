//! GraphQL SDL and executable-document segmentation by top-level definition.

use once_cell::sync::Lazy;
use regex::Regex;
use schnitt_core::{
    ChunkError, ChunkMetadata, ChunkOptions, ChunkResult, ChunkType, ChunkWarning, SchemaMetadata,
    WarningCode,
};
use tokio_util::sync::CancellationToken;

use crate::braces::{definition_units, scan, LineState, Syntax, Unit};
use crate::chunker::{check_cancelled, Capabilities, Chunker, ResultBuilder};
use crate::splitter::{line_spans, SizeBoundedSplitter};

const NAME: &str = "graphql";
const PRIORITY: i32 = 41;

const CAPABILITIES: Capabilities = Capabilities {
    mime_types: &[
        "application/graphql",
        "text/x-graphql",
        "application/x-graphql",
    ],
    extensions: &[".graphql", ".gql", ".graphqls"],
    names: &["graphql"],
};

const SYNTAX: Syntax = Syntax {
    line_comments: &["#"],
    block_comment: None,
    quotes: b"\"",
    block_string: Some("\"\"\""),
};

static DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:(extend)\s+)?(type|input|interface|enum|scalar|union|schema|directive|fragment|query|mutation|subscription)\b\s*(@?[_A-Za-z]\w*)?",
    )
    .expect("static GraphQL definition pattern compiles")
});

#[derive(Debug, Default, Clone, Copy)]
pub struct GraphqlChunker;

impl GraphqlChunker {
    pub fn new() -> Self {
        Self
    }
}

impl Chunker for GraphqlChunker {
    fn name(&self) -> &str {
        NAME
    }

    fn can_handle(&self, mime_type: &str, language: &str) -> bool {
        CAPABILITIES.matches(mime_type, language)
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
        let splitter = SizeBoundedSplitter::new(opts.effective_max_chunk_size());
        let mut out = ResultBuilder::new(NAME);

        let braces = scan(content, &SYNTAX);
        if !braces.errors.is_empty() {
            tracing::warn!(
                errors = braces.errors.len(),
                "unbalanced braces in GraphQL document"
            );
        }
        for (offset, message) in &braces.errors {
            out.warn(ChunkWarning::new(
                WarningCode::GraphqlUnbalancedBraces,
                *offset,
                message.clone(),
            ));
        }

        let units = definition_units(content, &braces, is_definition, is_description);
        let has_definitions = units.iter().any(|u| u.header.is_some());
        for unit in units {
            check_cancelled(cancel)?;
            let template = ChunkMetadata::with_detail(
                ChunkType::Structured,
                describe(content, &unit, has_definitions),
            );
            let chunks = splitter.chunk_unit(
                cancel,
                &content[unit.range.clone()],
                unit.range.start,
                &template,
                out.warnings_mut(),
                line_spans,
            )?;
            out.extend(chunks);
        }
        Ok(out.finish(content.len()))
    }
}

fn is_definition(line: &str) -> bool {
    DEFINITION.is_match(line) || line.trim_start().starts_with('{')
}

/// `#` comments and `"""` / `"` descriptions directly above a definition.
fn is_description(state: &LineState, line: &str) -> bool {
    let trimmed = line.trim();
    state.in_literal || trimmed.starts_with('#') || trimmed.starts_with('"')
}

fn describe(text: &str, unit: &Unit, has_definitions: bool) -> SchemaMetadata {
    let Some(header) = &unit.header else {
        let kind = if has_definitions { "preamble" } else { "unknown" };
        return SchemaMetadata {
            type_kind: kind.to_string(),
            ..Default::default()
        };
    };
    let line = &text[header.clone()];
    let Some(caps) = DEFINITION.captures(line) else {
        // anonymous `{ ... }` operation
        return SchemaMetadata {
            type_kind: "query".to_string(),
            ..Default::default()
        };
    };

    let keyword = &caps[2];
    let type_kind = match caps.get(1) {
        Some(_) => format!("extend {keyword}"),
        None => keyword.to_string(),
    };
    let type_name = match (keyword, caps.get(3)) {
        ("schema", _) => "schema".to_string(),
        (_, Some(name)) => name.as_str().to_string(),
        (_, None) => String::new(),
    };
    SchemaMetadata {
        type_kind,
        type_name,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> ChunkResult {
        GraphqlChunker::new()
            .chunk(&CancellationToken::new(), text, &ChunkOptions::for_language("schema.graphql"))
            .unwrap()
    }

    fn kinds(result: &ChunkResult) -> Vec<(String, String)> {
        result
            .chunks
            .iter()
            .map(|c| {
                let s = c.metadata.schema().unwrap();
                (s.type_kind.clone(), s.type_name.clone())
            })
            .collect()
    }

    const SCHEMA: &str = r#"schema {
  query: Query
}

"""
A registered user.

Created on sign-up.
"""
type User {
  id: ID!
  "display name"
  name: String
}

# lookup entry points
type Query {
  user(id: ID!): User
}

scalar DateTime

extend type User @key(fields: "id") {
  createdAt: DateTime
}

directive @auth(role: String) on FIELD_DEFINITION
"#;

    #[test]
    fn one_chunk_per_definition() {
        let result = run(SCHEMA);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        let expected: Vec<(String, String)> = [
            ("schema", "schema"),
            ("type", "User"),
            ("type", "Query"),
            ("scalar", "DateTime"),
            ("extend type", "User"),
            ("directive", "@auth"),
        ]
        .iter()
        .map(|(k, n)| (k.to_string(), n.to_string()))
        .collect();
        assert_eq!(kinds(&result), expected);
        for c in &result.chunks {
            assert_eq!(&SCHEMA[c.start_offset..c.end_offset], c.content);
        }
    }

    #[test]
    fn descriptions_and_comments_travel_with_definition() {
        let result = run(SCHEMA);
        assert!(result.chunks[1].content.starts_with("\"\"\"\nA registered user."));
        assert!(result.chunks[2].content.starts_with("# lookup entry points\ntype Query"));
        // field descriptions stay inside their type
        assert!(result.chunks[1].content.contains("\"display name\""));
    }

    #[test]
    fn operations_and_fragments() {
        let text = "query GetUser {\n  user { ...UserFields }\n}\n\nfragment UserFields on User {\n  id\n}\n\n{\n  ping\n}\n";
        let result = run(text);
        let names: Vec<(String, String)> = kinds(&result);
        assert_eq!(names[0], ("query".into(), "GetUser".into()));
        assert_eq!(names[1], ("fragment".into(), "UserFields".into()));
        assert_eq!(names[2], ("query".into(), String::new()));
    }

    #[test]
    fn unbalanced_braces_warn_and_continue() {
        let text = "type A {\n  id: ID\n\ntype B {\n  id: ID\n}\n";
        let result = run(text);
        assert!(result.total_chunks >= 1);
        assert!(result.has_warning(WarningCode::GraphqlUnbalancedBraces));
    }

    #[test]
    fn no_definitions_is_unknown() {
        let result = run("# only a comment\n");
        assert_eq!(kinds(&result), vec![("unknown".to_string(), String::new())]);
    }

    #[test]
    fn capability_matching() {
        let c = GraphqlChunker::new();
        assert!(c.can_handle("application/graphql", ""));
        assert!(c.can_handle("", "api/schema.graphqls"));
        assert!(c.can_handle("", "ops.GQL"));
        assert!(!c.can_handle("application/json", "schema.json"));
    }
}
