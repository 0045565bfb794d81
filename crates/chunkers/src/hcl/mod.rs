//! HCL / Terraform segmentation by top-level block.

mod scanner;

use std::ops::Range;

use schnitt_core::{
    ChunkError, ChunkMetadata, ChunkOptions, ChunkResult, ChunkType, ChunkWarning, InfraMetadata,
    WarningCode,
};
use tokio_util::sync::CancellationToken;

use crate::chunker::{check_cancelled, Capabilities, Chunker, ResultBuilder};
use crate::nesting::SectionPath;
use crate::splitter::{line_spans, SizeBoundedSplitter};

use scanner::{scan, BlockSpan};

const NAME: &str = "hcl";
const PRIORITY: i32 = 43;

const CAPABILITIES: Capabilities = Capabilities {
    mime_types: &[
        "text/x-hcl",
        "application/x-hcl",
        "text/x-terraform",
        "application/x-terraform",
    ],
    extensions: &[".tf", ".tfvars", ".hcl"],
    names: &["hcl", "terraform"],
};

#[derive(Debug, Default, Clone, Copy)]
pub struct HclChunker;

impl HclChunker {
    pub fn new() -> Self {
        Self
    }
}

impl Chunker for HclChunker {
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
        let outline = scan(content);

        if !outline.errors.is_empty() {
            tracing::warn!(
                errors = outline.errors.len(),
                "HCL structure could not be parsed, falling back to line splitting"
            );
            for err in &outline.errors {
                out.warn(ChunkWarning::new(
                    WarningCode::HclParseError,
                    err.offset,
                    err.message.clone(),
                ));
            }
            let chunks = splitter.split(
                cancel,
                content,
                &line_spans(content),
                0,
                &unknown_metadata(),
                out.warnings_mut(),
            )?;
            out.extend(chunks);
            return Ok(out.finish(content.len()));
        }

        for (range, meta) in units(content, &outline.blocks) {
            check_cancelled(cancel)?;
            let chunks = splitter.chunk_unit(
                cancel,
                &content[range.clone()],
                range.start,
                &meta,
                out.warnings_mut(),
                line_spans,
            )?;
            out.extend(chunks);
        }
        Ok(out.finish(content.len()))
    }
}

fn unknown_metadata() -> ChunkMetadata {
    ChunkMetadata::with_detail(
        ChunkType::Structured,
        InfraMetadata {
            block_type: "unknown".to_string(),
            ..Default::default()
        },
    )
}

fn block_metadata(block: &BlockSpan) -> ChunkMetadata {
    let mut infra = InfraMetadata {
        block_type: block.block_type.clone(),
        labels: block.labels.clone(),
        ..Default::default()
    };
    match (block.block_type.as_str(), block.labels.as_slice()) {
        ("resource" | "data", [kind, name, ..]) => {
            infra.resource_type = kind.clone();
            infra.resource_name = name.clone();
        }
        ("resource" | "data", [kind]) => infra.resource_type = kind.clone(),
        (_, [name]) => infra.resource_name = name.clone(),
        _ => {}
    }

    let mut path = SectionPath::new();
    path.enter(0, block.block_type.as_str());
    for (depth, label) in block.labels.iter().enumerate() {
        path.enter(depth + 1, label.as_str());
    }
    infra.section_path = path.joined();

    ChunkMetadata::with_detail(ChunkType::Structured, infra)
}

/// Partition the input into block units (with their leading comments) and
/// the unknown text between them.
fn units(text: &str, blocks: &[BlockSpan]) -> Vec<(Range<usize>, ChunkMetadata)> {
    if blocks.is_empty() {
        return vec![(0..text.len(), unknown_metadata())];
    }

    let mut units = Vec::new();
    let mut cursor = 0;
    for block in blocks {
        let start = attach_leading_comments(text, block.start, cursor);
        if !text[cursor..start].trim().is_empty() {
            units.push((cursor..start, unknown_metadata()));
        }
        units.push((start..block.end, block_metadata(block)));
        cursor = block.end;
    }
    if !text[cursor..].trim().is_empty() {
        units.push((cursor..text.len(), unknown_metadata()));
    }
    units
}

/// Extend `start` upward over comment lines directly above it, never past
/// `floor` and never across a blank line.
fn attach_leading_comments(text: &str, start: usize, floor: usize) -> usize {
    let line_start = text[..start].rfind('\n').map_or(0, |i| i + 1);
    if line_start < floor || !text[line_start..start].trim().is_empty() {
        return start;
    }

    let mut start = start;
    let mut cursor = line_start;
    while cursor > floor {
        let prev_end = cursor - 1;
        let prev_start = text[..prev_end].rfind('\n').map_or(0, |i| i + 1);
        if prev_start < floor {
            break;
        }
        let line = text[prev_start..prev_end].trim();
        if line.starts_with('#') || line.starts_with("//") || (line.starts_with("/*") && line.ends_with("*/")) {
            start = prev_start;
            cursor = prev_start;
        } else {
            break;
        }
    }
    start
}
