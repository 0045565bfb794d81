//! SQL segmentation: statements grouped by the table they touch.
//!
//! Scripts are split into statements with an explicit lexical state machine
//! (quotes, comments, dollar-quoting), each statement is classified, and
//! statements sharing a table are emitted together. Functions and procedures
//! are always standalone. Because groups reorder statements, chunk offsets
//! address the grouped layout: groups laid end to end in output order.

mod classify;
mod lexer;

use std::ops::Range;

use schnitt_core::{
    ChunkError, ChunkMetadata, ChunkOptions, ChunkResult, ChunkType, ChunkWarning, WarningCode,
};
use tokio_util::sync::CancellationToken;

use crate::chunker::{check_cancelled, Capabilities, Chunker, ResultBuilder};
use crate::splitter::SizeBoundedSplitter;

use classify::{classify, detect_dialect, Classified};
use lexer::{split_statements, LexState};

const NAME: &str = "sql";
const PRIORITY: i32 = 32;

const CAPABILITIES: Capabilities = Capabilities {
    mime_types: &["application/sql", "text/x-sql", "application/x-sql"],
    extensions: &[".sql", ".ddl", ".dml"],
    names: &["sql", "plsql", "plpgsql"],
};

/// A classified statement and its byte range in the input.
struct Statement {
    range: Range<usize>,
    class: Classified,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SqlChunker;

impl SqlChunker {
    pub fn new() -> Self {
        Self
    }
}

impl Chunker for SqlChunker {
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

        let split = split_statements(content);
        if let Some((state, offset)) = &split.unterminated {
            tracing::warn!(offset, state = ?state, "unterminated SQL statement at end of input");
            out.warn(ChunkWarning::new(
                WarningCode::SqlUnterminatedStatement,
                *offset,
                format!("statement still open at end of input ({})", describe(state)),
            ));
        }

        let statements: Vec<Statement> = split
            .statements
            .into_iter()
            .map(|range| Statement {
                class: classify(&content[range.clone()]),
                range,
            })
            .collect();
        let dialect = detect_dialect(content);

        let mut cursor = 0;
        for group in group_statements(&statements) {
            check_cancelled(cancel)?;

            let mut text = String::new();
            let mut components = Vec::with_capacity(group.len());
            for stmt in &group {
                let start = text.len();
                text.push_str(&content[stmt.range.clone()]);
                components.push(start..text.len());
            }

            let template = ChunkMetadata::with_detail(
                ChunkType::Structured,
                group[0].class.to_metadata(dialect),
            );
            let chunks = splitter.chunk_unit(
                cancel,
                &text,
                cursor,
                &template,
                out.warnings_mut(),
                |_| components,
            )?;
            out.extend(chunks);
            cursor += text.len();
        }

        Ok(out.finish(content.len()))
    }
}

/// Table groups in first-seen order, then standalone statements in input
/// order.
fn group_statements(statements: &[Statement]) -> Vec<Vec<&Statement>> {
    let mut tables: Vec<(&str, Vec<&Statement>)> = Vec::new();
    let mut standalone: Vec<Vec<&Statement>> = Vec::new();

    for stmt in statements {
        let table = stmt.class.table_name.as_str();
        if stmt.class.is_routine() || table.is_empty() {
            standalone.push(vec![stmt]);
            continue;
        }
        match tables.iter_mut().find(|(name, _)| *name == table) {
            Some((_, members)) => members.push(stmt),
            None => tables.push((table, vec![stmt])),
        }
    }

    tables
        .into_iter()
        .map(|(_, members)| members)
        .chain(standalone)
        .collect()
}

fn describe(state: &LexState) -> &'static str {
    match state {
        LexState::Quoted(_) => "quoted string",
        LexState::BlockComment => "block comment",
        LexState::DollarQuoted(_) => "dollar-quoted string",
        LexState::Normal | LexState::LineComment => "statement",
    }
}
