//! SQL value rendering shared by every statement the benchmark builds.
//!
//! Postgres statements bind [`SqlValue`]s as parameters. Trino has no bind
//! protocol, so the same values are rendered as literals through
//! [`SqlValue::to_literal`] and spliced into the statement by [`inline_params`].
//! All quoting and escaping lives here.

pub mod generate;

use crate::error::BenchError;
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt::Write;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A typed value that can be bound as a parameter or rendered as a literal.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Int(i64),
    Bool(bool),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    /// Render as a SQL literal accepted by both Postgres and Trino.
    pub fn to_literal(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Text(s) => quote_literal(s),
            SqlValue::Int(i) => i.to_string(),
            SqlValue::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            SqlValue::Date(d) => format!("DATE '{}'", d.format(DATE_FORMAT)),
            SqlValue::Timestamp(ts) => format!("TIMESTAMP '{}'", ts.format(TIMESTAMP_FORMAT)),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        SqlValue::Int(i)
    }
}

impl From<i32> for SqlValue {
    fn from(i: i32) -> Self {
        SqlValue::Int(i64::from(i))
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        SqlValue::Bool(b)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(d: NaiveDate) -> Self {
        SqlValue::Date(d)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(ts: NaiveDateTime) -> Self {
        SqlValue::Timestamp(ts)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// Quote a string literal, doubling embedded single quotes.
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Quote an identifier, doubling embedded double quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `"schema"."table"`, optionally prefixed by a catalog.
pub fn qualified_name(catalog: Option<&str>, schema: &str, table: &str) -> String {
    match catalog {
        Some(c) => format!(
            "{}.{}.{}",
            quote_ident(c),
            quote_ident(schema),
            quote_ident(table)
        ),
        None => format!("{}.{}", quote_ident(schema), quote_ident(table)),
    }
}

/// Replace `$1..$n` placeholders with rendered literals.
///
/// Placeholders inside quoted literals or identifiers are left alone. A
/// placeholder with no matching parameter is an error.
pub fn inline_params(sql: &str, params: &[SqlValue]) -> Result<String, BenchError> {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                out.push(c);
            }
            '$' if chars.peek().is_some_and(|n| n.is_ascii_digit()) => {
                let mut digits = String::new();
                while let Some(d) = chars.peek().copied().filter(|d| d.is_ascii_digit()) {
                    digits.push(d);
                    chars.next();
                }
                let index: usize = digits
                    .parse()
                    .map_err(|_| BenchError::Config(format!("bad placeholder ${}", digits)))?;
                let value = index
                    .checked_sub(1)
                    .and_then(|i| params.get(i))
                    .ok_or_else(|| {
                        BenchError::Config(format!(
                            "placeholder ${} has no parameter ({} given)",
                            index,
                            params.len()
                        ))
                    })?;
                let _ = write!(out, "{}", value.to_literal());
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}
