//! Query Execution and Safe Statement Building
//!
//! # Classification
//! A statement returns rows when its leading keyword (after whitespace and
//! comments, case-insensitive) is one of [`ROW_RETURNING_KEYWORDS`]. Rows
//! are fetched eagerly into a [`ResultSet`]; anything else runs as a command
//! and yields a [`CommandOutcome`].
//!
//! # Statement building
//! Identifiers and literals that arrive as free-form user input are always
//! escaped ([`quote_identifier`], [`quote_literal`]); limits are embedded as
//! integer literals. Nothing here parses or rewrites SQL beyond that.

use std::fmt;

use tracing::debug;

use crate::engine::{CommandOutcome, QueryOutput, ResultSet, Session, Value};
use crate::error::{AssistantError, Result};

/// Leading keywords of statements that return rows
pub const ROW_RETURNING_KEYWORDS: &[&str] = &["SELECT", "WITH", "VALUES", "TABLE", "SHOW", "EXPLAIN"];

/// Schemas hidden from table listings unless explicitly requested
pub const SYSTEM_SCHEMAS: &[&str] = &["pg_catalog", "information_schema"];

pub const DEFAULT_PREVIEW_SCHEMA: &str = "public";

/// A SQL statement assembled from escaped parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStatement(String);

impl SqlStatement {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SqlStatement {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Strip SQL comments from query
///
/// Handles:
/// - Line comments: -- comment
/// - Block comments: /* comment */
fn strip_comments(sql: &str) -> String {
    let mut result = String::new();
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '-' if chars.peek() == Some(&'-') => {
                chars.next();
                for ch in chars.by_ref() {
                    if ch == '\n' {
                        result.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for ch in chars.by_ref() {
                    if prev == '*' && ch == '/' {
                        break;
                    }
                    prev = ch;
                }
                result.push(' ');
            }
            _ => result.push(ch),
        }
    }

    result
}

/// Uppercased leading keyword of a statement, ignoring whitespace and comments
///
/// A leading `(` is skipped so `(select ...)` classifies as `SELECT`.
#[must_use]
pub fn leading_keyword(sql: &str) -> Option<String> {
    let stripped = strip_comments(sql);
    let body = stripped.trim_start().trim_start_matches(|c: char| c == '(' || c.is_whitespace());

    let keyword: String = body.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    if keyword.is_empty() {
        None
    } else {
        Some(keyword.to_ascii_uppercase())
    }
}

/// Whether a statement is expected to return rows
#[must_use]
pub fn returns_rows(sql: &str) -> bool {
    leading_keyword(sql).is_some_and(|kw| ROW_RETURNING_KEYWORDS.contains(&kw.as_str()))
}

/// Words between `CREATE`/`DROP` and the object kind that the engine's tag omits
const KIND_MODIFIERS: &[&str] = &[
    "OR", "REPLACE", "UNIQUE", "TEMP", "TEMPORARY", "UNLOGGED", "GLOBAL", "LOCAL", "RECURSIVE", "TRUSTED",
    "PROCEDURAL", "CONSTRAINT",
];

/// Kind words that only make sense together with the next one
const KIND_PREFIXES: &[&str] = &["MATERIALIZED", "FOREIGN", "EVENT"];

/// Command status text, e.g. `INSERT 3` or `CREATE TABLE 0`
///
/// `CREATE`, `DROP` and `ALTER` keep the object kind that follows them, so
/// `create or replace view` reports `CREATE VIEW` like the engine does.
fn command_status(sql: &str, affected: u64) -> String {
    let stripped = strip_comments(sql);
    let mut words = stripped
        .split_whitespace()
        .map(|w| w.trim_end_matches(';').to_ascii_uppercase())
        .peekable();

    let is_word = |w: &String| !w.is_empty() && w.chars().all(|c| c.is_ascii_alphabetic());

    let verb = match words.next() {
        Some(first) if matches!(first.as_str(), "CREATE" | "DROP" | "ALTER") => {
            while words.next_if(|w| KIND_MODIFIERS.contains(&w.as_str())).is_some() {}

            match words.next().filter(is_word) {
                Some(kind) if KIND_PREFIXES.contains(&kind.as_str()) => match words.next().filter(is_word) {
                    Some(rest) => format!("{first} {kind} {rest}"),
                    None => format!("{first} {kind}"),
                },
                Some(kind) => format!("{first} {kind}"),
                None => first,
            }
        }
        Some(first) if !first.is_empty() => first,
        _ => "OK".to_string(),
    };

    format!("{verb} {affected}")
}

/// Execute one statement and normalize its output
///
/// Failures are `QueryFailed` carrying the engine's message unmodified.
pub async fn execute<S: Session>(session: &mut S, sql: &str) -> Result<QueryOutput> {
    if sql.trim().is_empty() {
        return Err(AssistantError::invalid_input("Query cannot be empty"));
    }

    if returns_rows(sql) {
        let set = session.fetch_rows(sql).await?;
        debug!(rows = set.row_count(), "query returned rows");
        Ok(QueryOutput::Rows(set))
    } else {
        let affected = session.run_command(sql).await?;
        let outcome = CommandOutcome::new(command_status(sql, affected));
        debug!(status = %outcome.status, "command completed");
        Ok(QueryOutput::Command(outcome))
    }
}

fn require_positive_limit(limit: i64) -> Result<()> {
    if limit <= 0 {
        return Err(AssistantError::invalid_input(format!("limit must be positive, got {limit}")));
    }
    Ok(())
}

/// Wrap a statement as a subquery with a row limit
///
/// Trailing terminators are dropped first; nothing else is rewritten.
pub fn wrap_with_row_limit(sql: &str, limit: i64) -> Result<SqlStatement> {
    require_positive_limit(limit)?;

    let inner = sql.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    if inner.is_empty() {
        return Err(AssistantError::invalid_input("Query cannot be empty"));
    }

    Ok(SqlStatement(format!("select * from ({inner}) as subquery limit {limit}")))
}

/// Execute a statement wrapped with a row limit
///
/// Fails like [`execute`] when the wrapped text is not valid SQL, e.g. when
/// the original statement is not a single query expression.
pub async fn execute_with_row_limit<S: Session>(
    session: &mut S,
    sql: &str,
    limit: i64,
) -> Result<QueryOutput> {
    let wrapped = wrap_with_row_limit(sql, limit)?;
    execute(session, wrapped.as_str()).await
}

/// Quote an identifier: wrap in double quotes and double any embedded quote
pub fn quote_identifier(ident: &str) -> Result<String> {
    if ident.is_empty() {
        return Err(AssistantError::invalid_input("identifier cannot be empty"));
    }
    if ident.contains('\0') {
        return Err(AssistantError::invalid_input("identifier cannot contain NUL bytes"));
    }
    Ok(format!("\"{}\"", ident.replace('"', "\"\"")))
}

/// Quote a string literal the way `PostgreSQL`'s `quote_literal` does
///
/// Single quotes are doubled; values containing backslashes use the `E''`
/// form with backslashes doubled so the result is independent of
/// `standard_conforming_strings`.
pub fn quote_literal(value: &str) -> Result<String> {
    if value.contains('\0') {
        return Err(AssistantError::invalid_input("string literal cannot contain NUL bytes"));
    }
    let escaped = value.replace('\'', "''");
    if escaped.contains('\\') {
        Ok(format!("E'{}'", escaped.replace('\\', "\\\\")))
    } else {
        Ok(format!("'{escaped}'"))
    }
}

/// `select * from "<schema>"."<table>" limit <n>` with both identifiers escaped
pub fn build_preview_query(schema: &str, table: &str, limit: i64) -> Result<SqlStatement> {
    require_positive_limit(limit)?;
    let schema = quote_identifier(schema)?;
    let table = quote_identifier(table)?;

    Ok(SqlStatement(format!("select * from {schema}.{table} limit {limit}")))
}

/// Base-table listing over `information_schema.tables`
///
/// A named schema filters to that schema (system or not); otherwise system
/// schemas are hidden unless `include_system` is set.
pub fn build_list_tables_query(include_system: bool, schema: Option<&str>) -> Result<SqlStatement> {
    let filter = match schema {
        Some(name) => format!("and t.table_schema = {}", quote_literal(name)?),
        None if include_system => String::new(),
        None => {
            let hidden: Vec<String> = SYSTEM_SCHEMAS
                .iter()
                .map(|s| quote_literal(s))
                .collect::<Result<_>>()?;
            format!("and t.table_schema not in ({})", hidden.join(", "))
        }
    };

    Ok(SqlStatement(format!(
        "select t.table_schema, t.table_name \
         from information_schema.tables t \
         where t.table_type = 'BASE TABLE' {filter} \
         order by t.table_schema, t.table_name"
    )))
}

/// A (schema, table) pair from a table listing
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
}

/// List base tables visible to the session
pub async fn list_tables<S: Session>(
    session: &mut S,
    include_system: bool,
    schema: Option<&str>,
) -> Result<Vec<TableRef>> {
    let stmt = build_list_tables_query(include_system, schema)?;
    let set = session.fetch_rows(stmt.as_str()).await?;

    set.rows
        .into_iter()
        .map(|row| match row.as_slice() {
            [Value::Text(schema), Value::Text(table)] => {
                Ok(TableRef { schema: schema.clone(), table: table.clone() })
            }
            other => Err(AssistantError::internal(format!(
                "unexpected table listing row: {other:?}"
            ))),
        })
        .collect()
}

/// Run `select 1 as ok` and check the answer
///
/// `Ok(false)` means the session works but answered something unexpected.
pub async fn probe_connection<S: Session>(session: &mut S) -> Result<bool> {
    let set = session.fetch_rows("select 1 as ok").await?;
    let answered_one = set
        .columns
        .iter()
        .position(|c| c == "ok")
        .and_then(|idx| set.rows.first().map(|row| row[idx] == Value::Integer(1)))
        .unwrap_or(false);
    Ok(answered_one)
}
