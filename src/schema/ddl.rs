//! DDL parsing for schema import.
//!
//! Parses the statements a schema editor needs to rebuild a logical model:
//! - `CREATE TABLE` column definitions, inline flags and table constraints
//! - `ALTER TABLE ... ADD [CONSTRAINT] FOREIGN KEY / PRIMARY KEY`
//! - `USE db` (sets the schema name)
//!
//! Everything else (`CREATE DATABASE`, `INSERT`, `SET`, ...) is skipped.

use super::{Column, DatabaseSchema, ForeignKey, Table};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Regex to extract table name from CREATE TABLE
/// Supports: `table` (MySQL), "table" (PostgreSQL), [table] (MSSQL), table (SQLite/unquoted), schema.table
static CREATE_TABLE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)CREATE\s+(?:TEMPORARY\s+|TEMP\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(?:[\[\]`"\w]+\s*\.\s*)*[\[`"]?([^\[\]`"\s(]+)[\]`"]?"#)
        .unwrap()
});

/// Regex to extract table name from ALTER TABLE
static ALTER_TABLE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)ALTER\s+TABLE\s+(?:ONLY\s+)?(?:IF\s+EXISTS\s+)?(?:[\[\]`"\w]+\s*\.\s*)*[\[`"]?([^\[\]`"\s]+)[\]`"]?"#).unwrap()
});

/// Regex for USE statement
static USE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^\s*USE\s+[\[`"]?([^\[\]`"\s;]+)[\]`"]?"#).unwrap());

/// Regex for column definition: name followed by a type with optional arguments
static COLUMN_DEF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*[\[`"]?([^\[\]`"\s,]+)[\]`"]?\s+(\w+(?i:\s+varying)?(?:\s*\([^)]+\))?(?i:\s+unsigned)?)"#)
        .unwrap()
});

/// Regex for PRIMARY KEY constraint
static PRIMARY_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)PRIMARY\s+KEY\s*(?:CLUSTERED\s+|NONCLUSTERED\s+)?\(([^)]+)\)").unwrap()
});

/// Regex for table-level UNIQUE constraint
static UNIQUE_CONSTRAINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)UNIQUE\s*(?:KEY\s+|INDEX\s+)?(?:[\[`"]?\w+[\]`"]?\s*)?\(([^)]+)\)"#).unwrap()
});

/// Regex for inline PRIMARY KEY on column
static INLINE_PRIMARY_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bPRIMARY\s+KEY\b").unwrap());

/// Regex for inline UNIQUE on column
static INLINE_UNIQUE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bUNIQUE\b").unwrap());

/// Regex for the auto-increment spellings of MySQL, SQLite and MSSQL
static AUTO_INCREMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:AUTO_INCREMENT|AUTOINCREMENT|IDENTITY)\b").unwrap());

/// Regex for inline `REFERENCES table (column)` on a column definition
static INLINE_REFERENCES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bREFERENCES\s+(?:[\[\]`"\w]+\s*\.\s*)*[\[`"]?([^\[\]`"\s(]+)[\]`"]?\s*\(([^)]+)\)"#)
        .unwrap()
});

/// Regex for FOREIGN KEY constraint with optional constraint name
static FOREIGN_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)(?:CONSTRAINT\s+[\[`"]?([^\[\]`"\s]+)[\]`"]?\s+)?FOREIGN\s+KEY\s*(?:[\[`"]?\w+[\]`"]?\s*)?\(([^)]+)\)\s*REFERENCES\s+(?:[\[\]`"\w]+\s*\.\s*)*[\[`"]?([^\[\]`"\s(]+)[\]`"]?\s*\(([^)]+)\)"#,
    )
    .unwrap()
});

/// Regex to detect NOT NULL constraint
static NOT_NULL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bNOT\s+NULL\b").unwrap());

/// Builder for constructing a schema from DDL statements
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    schema: DatabaseSchema,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new() -> Self {
        Self {
            schema: DatabaseSchema::default(),
        }
    }

    /// Dispatch a single statement. Returns `true` when it changed the schema.
    pub fn parse_statement(&mut self, stmt: &str) -> bool {
        let trimmed = stmt.trim();
        if trimmed.is_empty() {
            return false;
        }

        if let Some(caps) = USE_RE.captures(trimmed) {
            self.schema.set_name(&caps[1]);
            return true;
        }

        let upper: String = trimmed
            .chars()
            .take(48)
            .collect::<String>()
            .to_uppercase();
        let head: Vec<&str> = upper.split_whitespace().collect();

        match head.as_slice() {
            ["CREATE", "TABLE", ..]
            | ["CREATE", "TEMPORARY", "TABLE", ..]
            | ["CREATE", "TEMP", "TABLE", ..] => self.parse_create_table(trimmed).is_some(),
            ["ALTER", "TABLE", ..] => self.parse_alter_table(trimmed).is_some(),
            _ => {
                debug!(statement = %preview(trimmed), "skipping statement");
                false
            }
        }
    }

    /// Parse a CREATE TABLE statement and add it to the schema.
    ///
    /// A table that already exists is replaced, matching `add_table`.
    pub fn parse_create_table(&mut self, stmt: &str) -> Option<String> {
        let table_name = extract_create_table_name(stmt)?;
        let body = extract_table_body(stmt)?;

        let mut table = Table::new(table_name.clone());
        parse_table_body(&body, &mut table);

        debug!(
            table = %table.name,
            columns = table.columns.len(),
            foreign_keys = table.foreign_keys.len(),
            "parsed CREATE TABLE"
        );
        self.schema.add_table(table);
        Some(table_name)
    }

    /// Parse an ALTER TABLE statement and update an existing table
    pub fn parse_alter_table(&mut self, stmt: &str) -> Option<String> {
        let table_name = extract_alter_table_name(stmt)?;
        let table = self.schema.get_table_mut(&table_name)?;

        for fk in parse_foreign_keys(stmt, &table_name) {
            table.add_foreign_key(fk);
        }

        if let Some(pk_cols) = parse_primary_key_constraint(stmt) {
            mark_primary_key(table, &pk_cols);
        }

        Some(table_name)
    }

    /// Finalize the schema
    pub fn build(self) -> DatabaseSchema {
        self.schema
    }
}

/// Parse a whole DDL script into a schema
pub fn parse_ddl(sql: &str) -> DatabaseSchema {
    let mut builder = SchemaBuilder::new();
    for stmt in split_statements(sql) {
        builder.parse_statement(&stmt);
    }
    builder.build()
}

/// Split a script on `;`, ignoring semicolons inside quotes and comments.
/// Comments are dropped from the returned statements.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == '\\' && q == '\'' {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            '\'' | '"' | '`' => {
                quote = Some(ch);
                current.push(ch);
            }
            '-' if chars.peek() == Some(&'-') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        current.push('\n');
                        break;
                    }
                }
            }
            '#' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        current.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                current.push(' ');
            }
            ';' => {
                if !current.trim().is_empty() {
                    statements.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        statements.push(current.trim().to_string());
    }

    statements
}

/// Extract table name from CREATE TABLE statement
pub fn extract_create_table_name(stmt: &str) -> Option<String> {
    CREATE_TABLE_NAME_RE
        .captures(stmt)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract table name from ALTER TABLE statement
pub fn extract_alter_table_name(stmt: &str) -> Option<String> {
    ALTER_TABLE_NAME_RE
        .captures(stmt)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract the body of a CREATE TABLE statement (between first ( and matching ))
fn extract_table_body(stmt: &str) -> Option<String> {
    let bytes = stmt.as_bytes();
    let mut depth = 0;
    let mut start = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, &b) in bytes.iter().enumerate() {
        if escape_next {
            escape_next = false;
            continue;
        }

        if b == b'\\' && in_string {
            escape_next = true;
            continue;
        }

        if b == b'\'' {
            in_string = !in_string;
            continue;
        }

        if in_string {
            continue;
        }

        if b == b'(' {
            if depth == 0 {
                start = Some(i + 1);
            }
            depth += 1;
        } else if b == b')' {
            depth -= 1;
            if depth == 0 {
                if let Some(s) = start {
                    return Some(stmt[s..i].to_string());
                }
            }
        }
    }

    None
}

/// Parse the body of a CREATE TABLE to extract columns and constraints
fn parse_table_body(body: &str, table: &mut Table) {
    let mut pending_pk: Vec<String> = Vec::new();
    let mut pending_unique: Vec<Vec<String>> = Vec::new();

    for part in split_table_body(body) {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            continue;
        }

        let upper = trimmed.to_uppercase();
        if upper.starts_with("PRIMARY KEY")
            || upper.starts_with("CONSTRAINT ")
            || upper.starts_with("FOREIGN KEY")
            || upper.starts_with("KEY ")
            || upper.starts_with("INDEX ")
            || upper.starts_with("UNIQUE ")
            || upper.starts_with("UNIQUE(")
            || upper.starts_with("FULLTEXT ")
            || upper.starts_with("SPATIAL ")
            || upper.starts_with("CHECK ")
            || upper.starts_with("CHECK(")
        {
            // Constraints may precede the columns they name, so defer flagging
            if let Some(pk_cols) = parse_primary_key_constraint(trimmed) {
                pending_pk.extend(pk_cols);
            }

            for fk in parse_foreign_keys(trimmed, &table.name) {
                table.add_foreign_key(fk);
            }

            if !upper.contains("FOREIGN KEY") && !upper.contains("PRIMARY KEY") {
                if let Some(caps) = UNIQUE_CONSTRAINT_RE.captures(trimmed) {
                    pending_unique.push(parse_column_list(&caps[1]));
                }
            }
        } else if let Some(col) = parse_column_def(trimmed) {
            if let Some(caps) = INLINE_REFERENCES_RE.captures(trimmed) {
                let referenced_column = parse_column_list(&caps[2])
                    .into_iter()
                    .next()
                    .unwrap_or_default();
                table.add_foreign_key(ForeignKey::new(
                    default_fk_name(&table.name, &col.name),
                    col.name.clone(),
                    caps[1].to_string(),
                    referenced_column,
                ));
            }
            table.add_column(col);
        }
    }

    mark_primary_key(table, &pending_pk);

    // Single-column UNIQUE constraints map onto the column flag; composite
    // ones have no column-level equivalent.
    for cols in pending_unique {
        if let [only] = cols.as_slice() {
            if let Some(col) = table.get_column_mut(only) {
                col.unique = true;
            }
        }
    }
}

fn mark_primary_key(table: &mut Table, pk_cols: &[String]) {
    for col_name in pk_cols {
        if let Some(col) = table.get_column_mut(col_name) {
            col.primary_key = true;
            col.not_null = true;
        }
    }
}

/// Split table body by commas, respecting nested parentheses
pub fn split_table_body(body: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for ch in body.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        if ch == '\\' && in_string {
            current.push(ch);
            escape_next = true;
            continue;
        }

        if ch == '\'' {
            in_string = !in_string;
            current.push(ch);
            continue;
        }

        if in_string {
            current.push(ch);
            continue;
        }

        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current = String::new();
            }
            _ => {
                current.push(ch);
            }
        }
    }

    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }

    parts
}

/// Parse a column definition with its inline flags
fn parse_column_def(def: &str) -> Option<Column> {
    let caps = COLUMN_DEF_RE.captures(def)?;
    let name = caps.get(1)?.as_str().to_string();
    let type_str = caps.get(2)?.as_str().trim();

    // The type keyword is followed by the flags; don't let a DEFAULT 'UNIQUE'
    // literal or the type itself trip the flag regexes.
    let rest = strip_string_literals(&def[caps.get(0)?.end()..]);

    let base_type = type_str
        .split(|c: char| c == '(' || c.is_whitespace())
        .next()
        .unwrap_or(type_str)
        .to_lowercase();
    let serial = matches!(base_type.as_str(), "serial" | "smallserial" | "bigserial");

    let mut col = Column::new(name, type_str);
    col.primary_key = INLINE_PRIMARY_KEY_RE.is_match(&rest);
    col.not_null = col.primary_key || serial || NOT_NULL_RE.is_match(&rest);
    col.unique = INLINE_UNIQUE_RE.is_match(&rest);
    col.auto_increment = serial || AUTO_INCREMENT_RE.is_match(&rest);
    Some(col)
}

fn strip_string_literals(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_string = false;
    for ch in s.chars() {
        if ch == '\'' {
            in_string = !in_string;
            continue;
        }
        if !in_string {
            out.push(ch);
        }
    }
    out
}

/// Parse PRIMARY KEY constraint, returns column names
fn parse_primary_key_constraint(constraint: &str) -> Option<Vec<String>> {
    let caps = PRIMARY_KEY_RE.captures(constraint)?;
    let cols_str = caps.get(1)?.as_str();
    Some(parse_column_list(cols_str))
}

/// Parse FOREIGN KEY constraints from a statement.
///
/// Composite keys are split into one single-column foreign key per column pair,
/// all sharing the constraint name.
fn parse_foreign_keys(stmt: &str, owner: &str) -> Vec<ForeignKey> {
    let mut fks = Vec::new();

    for caps in FOREIGN_KEY_RE.captures_iter(stmt) {
        let local_cols = caps
            .get(2)
            .map(|m| parse_column_list(m.as_str()))
            .unwrap_or_default();
        let ref_table = caps
            .get(3)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let ref_cols = caps
            .get(4)
            .map(|m| parse_column_list(m.as_str()))
            .unwrap_or_default();

        if local_cols.is_empty() || ref_table.is_empty() || ref_cols.is_empty() {
            continue;
        }

        let name = caps
            .get(1)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| default_fk_name(owner, &local_cols[0]));

        for (local, referenced) in local_cols.iter().zip(ref_cols.iter()) {
            fks.push(ForeignKey::new(
                name.clone(),
                local.clone(),
                ref_table.clone(),
                referenced.clone(),
            ));
        }
    }

    fks
}

/// Constraint name given to foreign keys declared without one
pub fn default_fk_name(table: &str, column: &str) -> String {
    format!("fk_{}_{}", table, column)
}

/// Parse a comma-separated column list, stripping quotes (backticks, double quotes, brackets)
pub fn parse_column_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|c| {
            c.trim()
                .trim_matches('`')
                .trim_matches('"')
                .trim_matches('[')
                .trim_matches(']')
                .to_string()
        })
        .filter(|c| !c.is_empty())
        .collect()
}

fn preview(stmt: &str) -> String {
    let line = stmt.lines().next().unwrap_or_default();
    if line.chars().count() > 60 {
        format!("{}...", line.chars().take(60).collect::<String>())
    } else {
        line.to_string()
    }
}
