//! Merging a partial JSON payload over a generated row.

use super::{column, ColumnDef, Row, SqlType};
use crate::error::BenchError;
use crate::sql::{SqlValue, DATE_FORMAT, TIMESTAMP_FORMAT};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

/// Which payload keys were applied and which were not columns.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OverlayReport {
    pub applied: Vec<String>,
    pub ignored: Vec<String>,
}

impl Row {
    /// Overwrite fields with the known columns present in `partial`.
    ///
    /// Unknown keys are skipped and listed in the report. A value that cannot
    /// be coerced to its column type, or a NULL for a required column, fails
    /// the whole overlay and leaves the row untouched.
    pub fn overlay(&mut self, partial: &Map<String, Value>) -> Result<OverlayReport, BenchError> {
        let mut report = OverlayReport::default();
        let mut coerced = Vec::with_capacity(partial.len());

        for (key, raw) in partial {
            match column(key) {
                Some(def) => coerced.push((def, coerce(def, raw)?)),
                None => report.ignored.push(key.clone()),
            }
        }

        let mut next = self.clone();
        for (def, value) in coerced {
            if !next.set(def.name, value) {
                return Err(BenchError::InvalidRow(format!(
                    "column {} rejected its value",
                    def.name
                )));
            }
            report.applied.push(def.name.to_string());
        }
        *self = next;

        Ok(report)
    }
}

/// Convert a JSON value to the SQL type of `def`.
pub fn coerce(def: &ColumnDef, raw: &Value) -> Result<SqlValue, BenchError> {
    if raw.is_null() {
        if def.required {
            return Err(BenchError::InvalidRow(format!(
                "column {} is required",
                def.name
            )));
        }
        return Ok(SqlValue::Null);
    }

    let invalid = || {
        BenchError::InvalidRow(format!(
            "column {} expects {:?}, got {}",
            def.name, def.sql_type, raw
        ))
    };

    match def.sql_type {
        SqlType::Text => match raw {
            Value::String(s) => Ok(SqlValue::Text(s.clone())),
            Value::Number(n) => Ok(SqlValue::Text(n.to_string())),
            _ => Err(invalid()),
        },
        SqlType::Int => {
            let parsed = match raw {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            parsed
                .filter(|i| i32::try_from(*i).is_ok())
                .map(SqlValue::Int)
                .ok_or_else(invalid)
        }
        SqlType::Bool => match raw {
            Value::Bool(b) => Ok(SqlValue::Bool(*b)),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(SqlValue::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(SqlValue::Bool(false)),
            _ => Err(invalid()),
        },
        SqlType::Date => raw
            .as_str()
            .and_then(parse_date)
            .map(SqlValue::Date)
            .ok_or_else(invalid),
        SqlType::Timestamp => raw
            .as_str()
            .and_then(parse_timestamp)
            .map(SqlValue::Timestamp)
            .ok_or_else(invalid),
    }
}

/// Accepts `YYYY-MM-DD` or any timestamp form [`parse_timestamp`] accepts.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .or_else(|| parse_timestamp(s).map(|ts| ts.date()))
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.fff]`, `YYYY-MM-DDTHH:MM:SS[.fff]` or a bare date.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for format in [
        TIMESTAMP_FORMAT,
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
