//! Character-level structure scanner for HCL.
//!
//! Tracks brackets on a value stack, string literals with escapes and
//! `${...}` / `%{...}` templates, `#` `//` `/* */` comments and `<<EOF` /
//! `<<-EOF` heredocs. Only ASCII bytes carry structure, so scanning bytes is
//! safe for UTF-8 input and every recorded offset is a char boundary.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::nesting::NestingStack;

static HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^([A-Za-z_][\w-]*)((?:\s+(?:"[^"\n]*"|[A-Za-z_][\w-]*))*)\s*$"#)
        .expect("static HCL header pattern compiles")
});
static LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""([^"\n]*)"|([A-Za-z_][\w-]*)"#).expect("static HCL label pattern compiles")
});

/// A top-level block from its header to its closing brace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BlockSpan {
    /// First byte of the header.
    pub start: usize,
    /// One past the closing `}`.
    pub end: usize,
    pub block_type: String,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScanError {
    pub offset: usize,
    pub message: String,
}

#[derive(Debug, Default)]
pub(crate) struct Outline {
    pub blocks: Vec<BlockSpan>,
    pub errors: Vec<ScanError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Open {
    Brace,
    Bracket,
    Paren,
    /// `${` or `%{` inside a string; closing it resumes the string.
    Template,
}

impl Open {
    fn closer(self) -> char {
        match self {
            Open::Brace | Open::Template => '}',
            Open::Bracket => ']',
            Open::Paren => ')',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Opener {
    kind: Open,
    at: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    Str { start: usize },
    LineComment,
    BlockComment { start: usize },
}

struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    mode: Mode,
    stack: NestingStack<Opener>,
    /// First significant byte of the current top-level statement.
    stmt_start: Option<usize>,
    /// Header of the top-level block currently open.
    open_block: Option<(usize, String, Vec<String>)>,
    outline: Outline,
}

/// Find every top-level block and every structural error in `text`.
pub(crate) fn scan(text: &str) -> Outline {
    let mut s = Scanner {
        text,
        bytes: text.as_bytes(),
        pos: 0,
        mode: Mode::Code,
        stack: NestingStack::new(),
        stmt_start: None,
        open_block: None,
        outline: Outline::default(),
    };
    while s.pos < s.bytes.len() {
        match s.mode {
            Mode::Code => s.code(),
            Mode::Str { start } => s.string(start),
            Mode::LineComment => s.line_comment(),
            Mode::BlockComment { .. } => s.block_comment(),
        }
    }
    s.finish()
}

impl<'a> Scanner<'a> {
    fn at(&self, prefix: &str) -> bool {
        self.bytes[self.pos..].starts_with(prefix.as_bytes())
    }

    fn error(&mut self, offset: usize, message: impl Into<String>) {
        self.outline.errors.push(ScanError {
            offset,
            message: message.into(),
        });
    }

    fn mark_statement(&mut self) {
        if self.stack.is_empty() && self.stmt_start.is_none() {
            self.stmt_start = Some(self.pos);
        }
    }

    fn code(&mut self) {
        let b = self.bytes[self.pos];
        match b {
            b'#' => {
                self.mode = Mode::LineComment;
                self.pos += 1;
            }
            b'/' if self.at("//") => {
                self.mode = Mode::LineComment;
                self.pos += 2;
            }
            b'/' if self.at("/*") => {
                self.mode = Mode::BlockComment { start: self.pos };
                self.pos += 2;
            }
            b'"' => {
                self.mark_statement();
                self.mode = Mode::Str { start: self.pos };
                self.pos += 1;
            }
            b'<' if self.at("<<") => {
                self.mark_statement();
                self.heredoc();
            }
            b'{' => {
                if self.stack.is_empty() {
                    let start = self.stmt_start.unwrap_or(self.pos);
                    if let Some((block_type, labels)) = parse_header(&self.text[start..self.pos]) {
                        self.open_block = Some((start, block_type, labels));
                    }
                }
                self.open(Open::Brace);
            }
            b'[' => self.open(Open::Bracket),
            b'(' => self.open(Open::Paren),
            b'}' | b']' | b')' => self.close(b as char),
            b'\n' => {
                if self.stack.is_empty() {
                    self.stmt_start = None;
                }
                self.pos += 1;
            }
            _ if b.is_ascii_whitespace() => self.pos += 1,
            _ => {
                self.mark_statement();
                self.pos += 1;
            }
        }
    }

    fn open(&mut self, kind: Open) {
        self.mark_statement();
        self.stack.push(Opener { kind, at: self.pos });
        self.pos += 1;
    }

    fn close(&mut self, closer: char) {
        let at = self.pos;
        self.pos += 1;
        match self.stack.top().copied() {
            Some(top) if top.kind.closer() == closer => {
                self.stack.pop();
                if top.kind == Open::Template {
                    // resume the enclosing string
                    self.mode = Mode::Str { start: top.at };
                    return;
                }
                if self.stack.is_empty() && closer == '}' {
                    if let Some((start, block_type, labels)) = self.open_block.take() {
                        self.outline.blocks.push(BlockSpan {
                            start,
                            end: self.pos,
                            block_type,
                            labels,
                        });
                    }
                    self.stmt_start = None;
                }
            }
            Some(top) => {
                let expected = top.kind.closer();
                self.error(at, format!("unexpected '{closer}', expected '{expected}'"));
            }
            None => self.error(at, format!("unexpected '{closer}' at top level")),
        }
    }

    fn string(&mut self, start: usize) {
        match self.bytes[self.pos] {
            b'\\' => self.pos = (self.pos + 2).min(self.bytes.len()),
            b'"' => {
                self.mode = Mode::Code;
                self.pos += 1;
            }
            b'$' | b'%' if self.bytes.get(self.pos + 1) == Some(&b'{') => {
                self.stack.push(Opener {
                    kind: Open::Template,
                    at: start,
                });
                self.mode = Mode::Code;
                self.pos += 2;
            }
            b'\n' => {
                self.error(start, "unterminated string literal");
                self.mode = Mode::Code;
            }
            _ => self.pos += 1,
        }
    }

    fn line_comment(&mut self) {
        if self.bytes[self.pos] == b'\n' {
            // let code mode see the newline
            self.mode = Mode::Code;
        } else {
            self.pos += 1;
        }
    }

    fn block_comment(&mut self) {
        if self.at("*/") {
            self.mode = Mode::Code;
            self.pos += 2;
        } else {
            self.pos += 1;
        }
    }

    /// `<<TAG` / `<<-TAG`: skip the body up to and including the line whose
    /// trimmed text equals the tag.
    fn heredoc(&mut self) {
        let start = self.pos;
        let rest = &self.text[start + 2..];
        let rest = rest.strip_prefix('-').unwrap_or(rest);
        let tag_len = rest
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
            .count();
        if tag_len == 0 {
            self.pos += 2;
            return;
        }
        let tag = &rest[..tag_len];

        let Some(nl) = self.text[start..].find('\n') else {
            self.error(start, format!("heredoc <<{tag} has no body"));
            self.pos = self.bytes.len();
            return;
        };
        let mut line_start = start + nl + 1;
        while line_start < self.bytes.len() {
            let line_end = self.text[line_start..]
                .find('\n')
                .map_or(self.bytes.len(), |i| line_start + i);
            if self.text[line_start..line_end].trim() == tag {
                self.pos = line_end;
                return;
            }
            line_start = line_end + 1;
        }
        self.error(start, format!("unclosed heredoc <<{tag}"));
        self.pos = self.bytes.len();
    }

    fn finish(mut self) -> Outline {
        match self.mode {
            Mode::Str { start } => self.error(start, "unterminated string literal"),
            Mode::BlockComment { start } => self.error(start, "unclosed block comment"),
            Mode::Code | Mode::LineComment => {}
        }
        let unclosed: Vec<Opener> = self.stack.iter().copied().collect();
        for opener in unclosed {
            let message = match opener.kind {
                Open::Template => "unclosed template interpolation".to_string(),
                kind => format!("unclosed '{}'", opening_char(kind)),
            };
            self.error(opener.at, message);
        }
        self.outline
    }
}

fn opening_char(kind: Open) -> char {
    match kind {
        Open::Brace | Open::Template => '{',
        Open::Bracket => '[',
        Open::Paren => '(',
    }
}

/// `ident (label)*` immediately before a top-level `{`.
fn parse_header(header: &str) -> Option<(String, Vec<String>)> {
    let caps = HEADER.captures(header.trim())?;
    let labels = LABEL
        .captures_iter(&caps[2])
        .filter_map(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().to_string())
        .collect();
    Some((caps[1].to_string(), labels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_top_level_blocks_with_labels() {
        let text = r#"
resource "aws_s3_bucket" "logs" {
  bucket = "logs-${var.env}"
  tags = { team = "ops" }
}

variable region {
  default = "eu-west-1"
}
"#;
        let outline = scan(text);
        assert!(outline.errors.is_empty(), "{:?}", outline.errors);
        assert_eq!(outline.blocks.len(), 2);
        assert_eq!(outline.blocks[0].block_type, "resource");
        assert_eq!(outline.blocks[0].labels, vec!["aws_s3_bucket", "logs"]);
        assert_eq!(outline.blocks[1].labels, vec!["region"]);
        assert!(text[outline.blocks[0].start..outline.blocks[0].end].ends_with('}'));
    }

    #[test]
    fn braces_in_strings_comments_and_heredocs_are_ignored() {
        let text = "locals {\n  a = \"}\" # }\n  b = <<-EOT\n  } not code {\n  EOT\n  /* } */\n}\n";
        let outline = scan(text);
        assert!(outline.errors.is_empty(), "{:?}", outline.errors);
        assert_eq!(outline.blocks.len(), 1);
        assert_eq!(outline.blocks[0].end, text.len() - 1);
    }

    #[test]
    fn nested_template_strings() {
        let text = "output x {\n  value = \"${join(\",\", [\"}\"])}\"\n}\n";
        let outline = scan(text);
        assert!(outline.errors.is_empty(), "{:?}", outline.errors);
        assert_eq!(outline.blocks.len(), 1);
    }

    #[test]
    fn top_level_map_attribute_is_not_a_block() {
        let outline = scan("tags = {\n  a = 1\n}\n");
        assert!(outline.blocks.is_empty());
        assert!(outline.errors.is_empty());
    }

    #[test]
    fn unmatched_closer_is_an_error() {
        let outline = scan("a {\n}\n}\n");
        assert_eq!(outline.errors.len(), 1);
        assert_eq!(outline.errors[0].offset, 6);
    }

    #[test]
    fn unclosed_block_is_an_error() {
        let outline = scan("resource \"x\" \"y\" {\n  a = [1, 2\n");
        assert_eq!(outline.errors.len(), 2);
        assert!(outline.blocks.is_empty());
    }
}
