//! Statement classification and dialect detection.

use once_cell::sync::Lazy;
use regex::Regex;
use schnitt_core::SqlMetadata;

/// Optionally quoted, optionally schema-qualified identifier.
const IDENT: &str = r#"((?:["`\[]?\w+["`\]]?\.)*["`\[]?\w+["`\]]?)"#;

fn pattern(template: &str) -> Regex {
    Regex::new(&template.replace("{ident}", IDENT)).expect("static SQL pattern compiles")
}

static CREATE_TABLE: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^\s*CREATE\s+(?:OR\s+REPLACE\s+)?(?:TEMP(?:ORARY)?\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?{ident}")
});
static ALTER_TABLE: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)^\s*ALTER\s+TABLE\s+(?:IF\s+EXISTS\s+)?(?:ONLY\s+)?{ident}"));
static DROP_TABLE: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)^\s*DROP\s+TABLE\s+(?:IF\s+EXISTS\s+)?{ident}"));
static CREATE_INDEX: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^\s*CREATE\s+(?:UNIQUE\s+)?INDEX\s+(?:CONCURRENTLY\s+)?(?:IF\s+NOT\s+EXISTS\s+)?{ident}\s+ON\s+(?:ONLY\s+)?{ident}")
});
static CREATE_VIEW: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^\s*CREATE\s+(?:OR\s+REPLACE\s+)?(?:TEMP(?:ORARY)?\s+)?(?:MATERIALIZED\s+)?VIEW\s+(?:IF\s+NOT\s+EXISTS\s+)?{ident}")
});
static CREATE_TRIGGER: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?is)^\s*CREATE\s+(?:OR\s+REPLACE\s+)?TRIGGER\s+{ident}\s+(?:BEFORE|AFTER|INSTEAD\s+OF)\b.*?\bON\s+{ident}")
});
static CREATE_FUNCTION: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)^\s*CREATE\s+(?:OR\s+REPLACE\s+)?FUNCTION\s+{ident}"));
static CREATE_PROCEDURE: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)^\s*CREATE\s+(?:OR\s+REPLACE\s+)?PROCEDURE\s+{ident}"));
static INSERT: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)^\s*INSERT\s+INTO\s+{ident}"));
static UPDATE: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)^\s*UPDATE\s+{ident}"));
static DELETE: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)^\s*DELETE\s+FROM\s+{ident}"));
static SELECT: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)^\s*SELECT\b"));

/// Classification of one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Classified {
    pub statement_type: String,
    pub object_type: String,
    pub table_name: String,
    pub procedure_name: String,
}

impl Classified {
    fn new(statement_type: &str, object_type: &str) -> Self {
        Self {
            statement_type: statement_type.to_string(),
            object_type: object_type.to_string(),
            ..Default::default()
        }
    }

    fn table(mut self, name: &str) -> Self {
        self.table_name = clean_identifier(name);
        self
    }

    fn procedure(mut self, name: &str) -> Self {
        self.procedure_name = clean_identifier(name);
        self
    }

    /// Functions and procedures never join a table group.
    pub fn is_routine(&self) -> bool {
        self.object_type == "FUNCTION" || self.object_type == "PROCEDURE"
    }

    pub fn to_metadata(&self, dialect: &str) -> SqlMetadata {
        SqlMetadata {
            statement_type: self.statement_type.clone(),
            object_type: self.object_type.clone(),
            table_name: self.table_name.clone(),
            procedure_name: self.procedure_name.clone(),
            dialect: dialect.to_string(),
        }
    }
}

/// Classify a full statement by its leading keywords.
pub(crate) fn classify(statement: &str) -> Classified {
    let text = skip_leading_comments(statement);

    if let Some(c) = CREATE_TABLE.captures(text) {
        return Classified::new("CREATE", "TABLE").table(&c[1]);
    }
    if let Some(c) = ALTER_TABLE.captures(text) {
        return Classified::new("ALTER", "TABLE").table(&c[1]);
    }
    if let Some(c) = DROP_TABLE.captures(text) {
        return Classified::new("DROP", "TABLE").table(&c[1]);
    }
    if let Some(c) = CREATE_INDEX.captures(text) {
        return Classified::new("CREATE", "INDEX").table(&c[2]);
    }
    if let Some(c) = CREATE_VIEW.captures(text) {
        return Classified::new("CREATE", "VIEW").table(&c[1]);
    }
    if let Some(c) = CREATE_TRIGGER.captures(text) {
        return Classified::new("CREATE", "TRIGGER").table(&c[2]).procedure(&c[1]);
    }
    if let Some(c) = CREATE_FUNCTION.captures(text) {
        return Classified::new("CREATE", "FUNCTION").procedure(&c[1]);
    }
    if let Some(c) = CREATE_PROCEDURE.captures(text) {
        return Classified::new("CREATE", "PROCEDURE").procedure(&c[1]);
    }
    if let Some(c) = INSERT.captures(text) {
        return Classified::new("INSERT", "TABLE").table(&c[1]);
    }
    if let Some(c) = UPDATE.captures(text) {
        return Classified::new("UPDATE", "TABLE").table(&c[1]);
    }
    if let Some(c) = DELETE.captures(text) {
        return Classified::new("DELETE", "TABLE").table(&c[1]);
    }
    if SELECT.is_match(text) {
        return Classified::new("SELECT", "QUERY");
    }

    let keyword = first_keyword(text);
    match keyword.as_str() {
        "BEGIN" | "COMMIT" | "ROLLBACK" => Classified::new(&keyword, "TRANSACTION"),
        "GRANT" | "REVOKE" => Classified::new(&keyword, "PERMISSION"),
        _ => Classified::new(&keyword, ""),
    }
}

/// Strip quoting and schema qualification: `"public"."Users"` -> `Users`.
pub(crate) fn clean_identifier(id: &str) -> String {
    let stripped: String = id
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '`' | '[' | ']'))
        .collect();
    stripped.rsplit('.').next().unwrap_or_default().to_string()
}

fn skip_leading_comments(text: &str) -> &str {
    let mut rest = text.trim_start();
    loop {
        if let Some(after) = rest.strip_prefix("--") {
            rest = after.split_once('\n').map(|(_, r)| r).unwrap_or("").trim_start();
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.split_once("*/").map(|(_, r)| r).unwrap_or("").trim_start();
        } else {
            return rest;
        }
    }
}

fn first_keyword(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == ';' || c == '(')
        .find(|w| !w.is_empty())
        .unwrap_or_default()
        .to_ascii_uppercase()
}

// ── Dialect detection ───────────────────────────────────────────────

/// Dialect markers in fixed priority order.
const DIALECTS: &[(&str, &[&str])] = &[
    ("postgresql", &["SERIAL", "RETURNING", "::", "PLPGSQL"]),
    ("mysql", &["AUTO_INCREMENT", "ENGINE=", "CHARSET="]),
    ("sqlite", &["AUTOINCREMENT", "INTEGER PRIMARY KEY"]),
    ("sqlserver", &["IDENTITY(", "NVARCHAR", "TOP ", "WITH (NOLOCK)"]),
    ("oracle", &["NUMBER(", "VARCHAR2", "NVL(", "DECODE("]),
];

/// Score each dialect by case-insensitive marker occurrences across the
/// whole script. The strictly highest nonzero score wins; ties and zero
/// scores yield an empty dialect.
pub(crate) fn detect_dialect(text: &str) -> &'static str {
    let upper = text.to_uppercase();
    let scores: Vec<(&'static str, usize)> = DIALECTS
        .iter()
        .map(|(name, markers)| (*name, markers.iter().map(|m| upper.matches(m).count()).sum()))
        .collect();

    let best = scores.iter().map(|(_, s)| *s).max().unwrap_or(0);
    if best == 0 {
        return "";
    }
    let mut leaders = scores.iter().filter(|(_, s)| *s == best);
    match (leaders.next(), leaders.next()) {
        (Some((name, _)), None) => *name,
        _ => "",
    }
}
