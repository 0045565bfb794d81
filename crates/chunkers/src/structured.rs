//! Record-oriented segmentation of JSON, YAML and CSV data.
//!
//! Documents are validated first (`serde_json` / `serde_yaml`); a document
//! that fails to parse yields a `STRUCTURED_PARSE_ERROR` warning and is split
//! by lines. Valid documents are kept whole when they fit, otherwise split
//! between top-level records: JSON array elements or object members, YAML
//! top-level entries (each `---` document is its own unit) and CSV rows.
//! Chunks are exact slices of the input, so a JSON chunk cut from the middle
//! of an array is a run of elements, not a standalone document.

use std::mem;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use schnitt_core::{
    Chunk, ChunkDetail, ChunkError, ChunkMetadata, ChunkOptions, ChunkResult, ChunkType,
    ChunkWarning, StructuredMetadata, WarningCode,
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::chunker::{
    basename, check_cancelled, normalize_mime, Capabilities, Chunker, ResultBuilder,
};
use crate::splitter::{line_spans, SizeBoundedSplitter};

const NAME: &str = "structured";
const PRIORITY: i32 = 40;

const CAPABILITIES: Capabilities = Capabilities {
    mime_types: &[
        "application/json",
        "text/json",
        "application/x-yaml",
        "application/yaml",
        "text/yaml",
        "text/x-yaml",
        "text/csv",
    ],
    extensions: &[".json", ".yaml", ".yml", ".csv"],
    names: &["json", "yaml", "csv"],
};

static YAML_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^("(?:[^"\\]|\\.)*"|'[^']*'|[^\s#'"?:\-\[{][^#]*?)\s*:(?:\s|$)"#)
        .expect("static YAML key pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
    Csv,
    /// Claimed but not recognised: plain line splitting.
    Lines,
}

fn format_of(token: &str) -> Option<Format> {
    match token {
        "json" => Some(Format::Json),
        "yaml" | "yml" => Some(Format::Yaml),
        "csv" => Some(Format::Csv),
        _ => None,
    }
}

/// The MIME subtype decides; otherwise the hint's extension or bare name.
fn detect_format(mime_type: &str, language: &str) -> Format {
    let mime = normalize_mime(mime_type);
    let from_mime = mime
        .rsplit(['/', '+'])
        .next()
        .map(|subtype| subtype.trim_start_matches("x-"))
        .and_then(format_of);
    let hint = language.trim().to_ascii_lowercase();
    let from_hint = basename(&hint).rsplit('.').next().and_then(format_of);
    from_mime.or(from_hint).unwrap_or(Format::Lines)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredChunker;

impl StructuredChunker {
    pub fn new() -> Self {
        Self
    }
}

impl Chunker for StructuredChunker {
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

        let format = detect_format(&opts.mime_type, &opts.language);
        let Plan {
            units,
            keys,
            columns,
            warning,
        } = match format {
            Format::Json => json_plan(content),
            Format::Yaml => yaml_plan(content),
            Format::Csv => csv_plan(content),
            Format::Lines => Plan::lines(content, None),
        };
        if let Some(warning) = warning {
            tracing::warn!(
                ?format,
                offset = warning.offset,
                "structured document failed to parse, splitting by lines"
            );
            out.warn(warning);
        }

        for Unit { range, components } in units {
            check_cancelled(cancel)?;
            let template = ChunkMetadata::with_detail(
                ChunkType::Structured,
                StructuredMetadata {
                    table_path: String::new(),
                    key_names: columns.clone(),
                },
            );
            let mut chunks = splitter.chunk_unit(
                cancel,
                &content[range.clone()],
                range.start,
                &template,
                out.warnings_mut(),
                move |_| components,
            )?;
            if !keys.is_empty() {
                assign_keys(&mut chunks, &keys);
            }
            out.extend(chunks);
        }
        Ok(out.finish(content.len()))
    }
}

// ── Plans ───────────────────────────────────────────────────────────

/// A unit and its record components (relative to the unit).
struct Unit {
    range: Range<usize>,
    components: Vec<Range<usize>>,
}

struct Plan {
    units: Vec<Unit>,
    /// Record keys with the absolute offset they appear at.
    keys: Vec<(usize, String)>,
    /// Names stamped on every chunk (the CSV header).
    columns: Vec<String>,
    warning: Option<ChunkWarning>,
}

impl Plan {
    fn lines(text: &str, warning: Option<ChunkWarning>) -> Self {
        Self {
            units: vec![Unit {
                range: 0..text.len(),
                components: line_spans(text),
            }],
            keys: Vec::new(),
            columns: Vec::new(),
            warning,
        }
    }
}

/// Cut `range` at every offset in `cuts` that falls strictly inside it.
fn partition(range: Range<usize>, cuts: &[usize]) -> Unit {
    let mut bounds = vec![range.start];
    bounds.extend(cuts.iter().copied().filter(|c| *c > range.start && *c < range.end));
    bounds.push(range.end);
    let components = bounds
        .windows(2)
        .map(|w| w[0] - range.start..w[1] - range.start)
        .collect();
    Unit { range, components }
}

fn parse_warning(offset: usize, message: String) -> ChunkWarning {
    ChunkWarning::new(WarningCode::StructuredParseError, offset, message)
}

fn clamp_to_char(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Every chunk lists the keys that start inside it, first occurrence first.
fn assign_keys(chunks: &mut [Chunk], keys: &[(usize, String)]) {
    for chunk in chunks {
        let span = chunk.start_offset..chunk.end_offset;
        let mut names: Vec<String> = Vec::new();
        for (_, name) in keys.iter().filter(|(at, _)| span.contains(at)) {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        if let Some(ChunkDetail::Structured(meta)) = chunk.metadata.detail.as_mut() {
            meta.key_names = names;
        }
    }
}

// ── JSON ────────────────────────────────────────────────────────────

fn json_plan(text: &str) -> Plan {
    if let Err(err) = serde_json::from_str::<serde_json::Value>(text) {
        let line_start = line_spans(text)
            .get(err.line().saturating_sub(1))
            .map_or(text.len(), |l| l.start);
        let offset = clamp_to_char(text, line_start + err.column().saturating_sub(1));
        return Plan::lines(text, Some(parse_warning(offset, format!("invalid JSON: {err}"))));
    }
    let (cuts, keys) = scan_json(text);
    Plan {
        units: vec![partition(0..text.len(), &cuts)],
        keys,
        columns: Vec::new(),
        warning: None,
    }
}

/// Offsets just past each top-level separator comma, and the keys of the
/// top-level object or of objects directly inside a top-level array.
fn scan_json(text: &str) -> (Vec<usize>, Vec<(usize, String)>) {
    let mut cuts = Vec::new();
    let mut keys = Vec::new();
    let mut stack: Vec<u8> = Vec::new();
    let mut expect_key = false;
    let mut in_string = false;
    let mut escaped = false;
    let mut key_start: Option<usize> = None;

    for (i, b) in text.bytes().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
                if let Some(start) = key_start.take() {
                    keys.push((start, json_key(&text[start..=i])));
                }
            }
            continue;
        }
        match b {
            b'"' => {
                in_string = true;
                let record = matches!(stack.as_slice(), [b'{'] | [b'[', b'{']);
                if expect_key && record {
                    key_start = Some(i);
                }
                expect_key = false;
            }
            b'{' => {
                stack.push(b);
                expect_key = true;
            }
            b'[' => {
                stack.push(b);
                expect_key = false;
            }
            b'}' | b']' => {
                stack.pop();
                expect_key = false;
            }
            b',' => {
                if stack.len() == 1 {
                    cuts.push(i + 1);
                }
                expect_key = stack.last() == Some(&b'{');
            }
            _ => {}
        }
    }
    (cuts, keys)
}

fn json_key(quoted: &str) -> String {
    serde_json::from_str::<String>(quoted).unwrap_or_else(|_| quoted.trim_matches('"').to_string())
}

// ── YAML ────────────────────────────────────────────────────────────

fn yaml_plan(text: &str) -> Plan {
    for document in serde_yaml::Deserializer::from_str(text) {
        if let Err(err) = serde_yaml::Value::deserialize(document) {
            let offset = err.location().map_or(0, |l| clamp_to_char(text, l.index()));
            return Plan::lines(text, Some(parse_warning(offset, format!("invalid YAML: {err}"))));
        }
    }

    let mut units = Vec::new();
    let mut keys = Vec::new();
    let mut entries: Vec<usize> = Vec::new();
    let mut doc_start = 0;
    // comment lines directly above an entry travel with it
    let mut comments: Option<usize> = None;

    for line in line_spans(text) {
        let body = text[line.clone()].trim_end_matches(['\n', '\r']);
        if body == "---" || body.starts_with("--- ") || body.starts_with("---\t") {
            if line.start > doc_start {
                units.push(partition(doc_start..line.start, &entries));
            }
            doc_start = line.start;
            entries.clear();
            comments = None;
            continue;
        }
        if body.starts_with('#') {
            comments.get_or_insert(line.start);
            continue;
        }
        if body.trim().is_empty() || body.starts_with([' ', '\t']) {
            comments = None;
            continue;
        }
        let start = comments.take().unwrap_or(line.start);
        if let Some(caps) = YAML_KEY.captures(body) {
            keys.push((line.start, yaml_key(&caps[1])));
            entries.push(start);
        } else if body == "-" || body.starts_with("- ") {
            entries.push(start);
        }
    }
    units.push(partition(doc_start..text.len(), &entries));

    Plan {
        units,
        keys,
        columns: Vec::new(),
        warning: None,
    }
}

fn yaml_key(raw: &str) -> String {
    let raw = raw.trim();
    let quoted = (raw.starts_with('"') && raw.ends_with('"'))
        || (raw.starts_with('\'') && raw.ends_with('\''));
    if quoted && raw.len() >= 2 {
        raw[1..raw.len() - 1].to_string()
    } else {
        raw.to_string()
    }
}

// ── CSV ─────────────────────────────────────────────────────────────

fn csv_plan(text: &str) -> Plan {
    let (records, open_quote) = csv_records(text);
    let columns = records
        .iter()
        .map(|r| &text[r.clone()])
        .find(|r| !r.trim().is_empty())
        .map(header_columns)
        .unwrap_or_default();
    let cuts: Vec<usize> = records.iter().map(|r| r.start).collect();
    Plan {
        units: vec![partition(0..text.len(), &cuts)],
        keys: Vec::new(),
        columns,
        warning: open_quote
            .map(|offset| parse_warning(offset, "quoted CSV field is never closed".to_string())),
    }
}

/// Record spans (newlines inside quoted fields do not end a record) and the
/// offset of a quote still open at end of input.
fn csv_records(text: &str) -> (Vec<Range<usize>>, Option<usize>) {
    let mut records = Vec::new();
    let mut start = 0;
    let mut quote: Option<usize> = None;
    for (i, b) in text.bytes().enumerate() {
        match b {
            b'"' => quote = if quote.is_some() { None } else { Some(i) },
            b'\n' if quote.is_none() => {
                records.push(start..i + 1);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < text.len() {
        records.push(start..text.len());
    }
    (records, quote)
}

fn header_columns(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    for c in line.trim_end_matches(['\n', '\r']).chars() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
        .into_iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect()
}
