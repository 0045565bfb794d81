//! Protocol Buffers segmentation: a preamble unit (syntax, package, imports,
//! options) followed by one unit per top-level `message`, `enum`, `service`
//! and `extend`.
//!
//! Unbalanced braces mean the structure cannot be trusted; the whole file is
//! then re-split by lines and flagged with `PROTOBUF_PARSE_ERROR`.

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

const NAME: &str = "protobuf";
const PRIORITY: i32 = 42;

const CAPABILITIES: Capabilities = Capabilities {
    mime_types: &["text/x-protobuf", "application/x-protobuf", "text/protobuf"],
    extensions: &[".proto"],
    names: &["proto", "protobuf"],
};

const SYNTAX: Syntax = Syntax {
    line_comments: &["//"],
    block_comment: Some(("/*", "*/")),
    quotes: b"\"'",
    block_string: None,
};

static DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(message|enum|service|extend)\s+([\w.]+)")
        .expect("static protobuf definition pattern compiles")
});
static RPC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*rpc\s+(\w+)").expect("static protobuf rpc pattern compiles")
});

#[derive(Debug, Default, Clone, Copy)]
pub struct ProtobufChunker;

impl ProtobufChunker {
    pub fn new() -> Self {
        Self
    }
}

impl Chunker for ProtobufChunker {
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
                "protobuf structure could not be parsed, falling back to line splitting"
            );
            for (offset, message) in &braces.errors {
                out.warn(ChunkWarning::new(
                    WarningCode::ProtobufParseError,
                    *offset,
                    message.clone(),
                ));
            }
            let unknown = ChunkMetadata::with_detail(
                ChunkType::Structured,
                SchemaMetadata {
                    type_kind: "unknown".to_string(),
                    ..Default::default()
                },
            );
            let chunks = splitter.split(
                cancel,
                content,
                &line_spans(content),
                0,
                &unknown,
                out.warnings_mut(),
            )?;
            out.extend(chunks);
            return Ok(out.finish(content.len()));
        }

        let units = definition_units(content, &braces, |l| DEFINITION.is_match(l), is_comment);
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

fn is_comment(state: &LineState, line: &str) -> bool {
    let trimmed = line.trim();
    state.in_literal
        || trimmed.starts_with("//")
        || trimmed.starts_with("/*")
        || (!trimmed.is_empty() && trimmed.ends_with("*/"))
}

fn describe(text: &str, unit: &Unit, has_definitions: bool) -> SchemaMetadata {
    let caps = unit
        .header
        .as_ref()
        .and_then(|h| DEFINITION.captures(&text[h.clone()]));
    let Some(caps) = caps else {
        let kind = if has_definitions { "preamble" } else { "unknown" };
        return SchemaMetadata {
            type_kind: kind.to_string(),
            ..Default::default()
        };
    };

    let kind = caps[1].to_string();
    let name = caps[2].to_string();
    let mut meta = SchemaMetadata {
        type_kind: kind.clone(),
        type_name: name.clone(),
        ..Default::default()
    };
    match kind.as_str() {
        "message" | "enum" | "extend" => meta.message_name = name,
        "service" => {
            meta.rpc_names = RPC
                .captures_iter(&text[unit.range.clone()])
                .map(|c| c[1].to_string())
                .collect();
            meta.service_name = name;
        }
        _ => {}
    }
    meta
}
