//! LaTeX segmentation by sectioning command.
//!
//! Lines are scanned after stripping unescaped `%` comments. `\begin{..}` /
//! `\end{..}` maintain an environment stack; a sectioning command only opens
//! a new unit while no environment other than the document-level wrappers
//! (`document`, `appendices` and its variants) is open. Protected
//! environments (`verbatim` and friends) are opaque until their matching
//! `\end`.

use std::mem;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use schnitt_core::{
    ChunkError, ChunkMetadata, ChunkOptions, ChunkResult, ChunkType, ChunkWarning,
    DocumentMetadata, WarningCode,
};
use tokio_util::sync::CancellationToken;

use crate::chunker::{check_cancelled, Capabilities, Chunker, ResultBuilder};
use crate::nesting::{NestingStack, SectionPath};
use crate::splitter::{line_spans, paragraph_spans_with, SizeBoundedSplitter};

const NAME: &str = "latex";
const PRIORITY: i32 = 53;

const CAPABILITIES: Capabilities = Capabilities {
    mime_types: &[
        "text/x-latex",
        "text/x-tex",
        "application/x-latex",
        "application/x-tex",
    ],
    extensions: &[".tex", ".latex", ".ltx"],
    names: &["latex", "tex"],
};

/// Document-level wrappers; being inside them does not count as nesting.
const TRANSPARENT_ENVS: &[&str] = &["document", "appendices", "appendix", "subappendices"];

const PROTECTED_ENVS: &[&str] = &["verbatim", "Verbatim", "lstlisting", "minted", "comment"];

const MATH_ENVS: &[&str] = &[
    "equation",
    "equation*",
    "align",
    "align*",
    "gather",
    "gather*",
    "multline",
    "multline*",
    "eqnarray",
    "eqnarray*",
    "displaymath",
    "math",
];

static SECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\\(part|chapter|section|subsection|subsubsection|paragraph|subparagraph)\*?\s*(?:\[[^\]]*\])?\s*\{([^}]*)\}",
    )
    .expect("static LaTeX section pattern compiles")
});
static ENVIRONMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(begin|end)\{([^}]+)\}").expect("static LaTeX environment pattern compiles")
});

/// Hierarchy level of a sectioning command: part=0 ... subparagraph=6.
fn section_level(command: &str) -> usize {
    match command {
        "part" => 0,
        "chapter" => 1,
        "section" => 2,
        "subsection" => 3,
        "subsubsection" => 4,
        "paragraph" => 5,
        _ => 6,
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LatexChunker;

impl LatexChunker {
    pub fn new() -> Self {
        Self
    }
}

impl Chunker for LatexChunker {
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

        let outline = outline(content);
        if !outline.warnings.is_empty() {
            tracing::warn!(
                warnings = outline.warnings.len(),
                "unbalanced LaTeX environments, keeping detected sections"
            );
        }
        for warning in outline.warnings {
            out.warn(warning);
        }

        for section in outline.sections {
            check_cancelled(cancel)?;
            let range = section.range.clone();
            let template = ChunkMetadata::with_detail(ChunkType::Prose, section.metadata);
            let chunks = splitter.chunk_unit(
                cancel,
                &content[range.clone()],
                range.start,
                &template,
                out.warnings_mut(),
                paragraphs,
            )?;
            out.extend(chunks);
        }
        Ok(out.finish(content.len()))
    }
}

// ── Sectioning ──────────────────────────────────────────────────────

/// An open environment. Environments compare by name only, so closing
/// matches regardless of where the `\begin` was.
#[derive(Debug, Clone)]
struct Env {
    name: String,
    at: usize,
}

impl PartialEq for Env {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

struct Section {
    range: Range<usize>,
    metadata: DocumentMetadata,
}

struct Outline {
    sections: Vec<Section>,
    warnings: Vec<ChunkWarning>,
}

fn outline(text: &str) -> Outline {
    let mut envs: NestingStack<Env> = NestingStack::new();
    let mut path = SectionPath::new();
    let mut sections = Vec::new();
    let mut warnings = Vec::new();
    // preamble: everything before the first sectioning command
    let mut current = Section {
        range: 0..0,
        metadata: DocumentMetadata::default(),
    };

    for line in line_spans(text) {
        let raw = &text[line.clone()];
        if protected(&envs).is_none() && depth(&envs) == 0 {
            if let Some(caps) = SECTION.captures(strip_comment(raw)) {
                let level = section_level(&caps[1]);
                let heading = caps[2].trim().to_string();
                path.enter(level, heading.as_str());
                let next = Section {
                    range: line.start..line.start,
                    metadata: DocumentMetadata {
                        heading,
                        heading_level: level + 1,
                        section_path: path.joined(),
                    },
                };
                sections.push(mem::replace(&mut current, next));
            }
        }
        track_environments(raw, line.start, &mut envs, &mut warnings);
        current.range.end = line.end;
    }
    sections.push(current);

    for env in envs.iter() {
        warnings.push(ChunkWarning::new(
            WarningCode::LatexUnbalancedEnvironment,
            env.at,
            format!("environment '{}' is never closed", env.name),
        ));
    }
    Outline { sections, warnings }
}

fn track_environments(
    line: &str,
    base: usize,
    envs: &mut NestingStack<Env>,
    warnings: &mut Vec<ChunkWarning>,
) {
    let comment = comment_start(line);
    for caps in ENVIRONMENT.captures_iter(line) {
        let Some(whole) = caps.get(0) else { continue };
        let name = &caps[2];
        let is_begin = &caps[1] == "begin";

        if let Some(open) = protected(envs).map(str::to_owned) {
            if !is_begin && name == open {
                envs.pop();
            }
            continue;
        }
        if comment.is_some_and(|c| whole.start() >= c) {
            break;
        }

        let env = Env {
            name: name.to_string(),
            at: base + whole.start(),
        };
        if is_begin {
            envs.push(env);
        } else if !envs.close(&env) {
            warnings.push(ChunkWarning::new(
                WarningCode::LatexUnbalancedEnvironment,
                env.at,
                format!("\\end{{{name}}} without matching \\begin"),
            ));
        }
    }
}

/// Name of the protected environment currently open, if any.
fn protected(envs: &NestingStack<Env>) -> Option<&str> {
    envs.top()
        .filter(|e| PROTECTED_ENVS.contains(&e.name.as_str()))
        .map(|e| e.name.as_str())
}

fn depth(envs: &NestingStack<Env>) -> usize {
    envs.iter()
        .filter(|e| !TRANSPARENT_ENVS.contains(&e.name.as_str()))
        .count()
}

/// Byte position of the first `%` not escaped by a backslash.
fn comment_start(line: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, b) in line.bytes().enumerate() {
        match b {
            b'\\' => escaped = !escaped,
            b'%' if !escaped => return Some(i),
            _ => escaped = false,
        }
    }
    None
}

fn strip_comment(line: &str) -> &str {
    &line[..comment_start(line).unwrap_or(line.len())]
}

// ── Oversized sections ──────────────────────────────────────────────

/// Blank-line paragraphs, except that math and verbatim-like environments
/// are never broken apart.
fn paragraphs(unit: &str) -> Vec<Range<usize>> {
    let mut open: NestingStack<String> = NestingStack::new();
    paragraph_spans_with(unit, |line| {
        for caps in ENVIRONMENT.captures_iter(strip_comment(line)) {
            let name = &caps[2];
            if !MATH_ENVS.contains(&name) && !PROTECTED_ENVS.contains(&name) {
                continue;
            }
            if &caps[1] == "begin" {
                open.push(name.to_string());
            } else {
                open.close(&name.to_string());
            }
        }
        !open.is_empty()
    })
}
