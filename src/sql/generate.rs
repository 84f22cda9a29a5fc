//! Postgres expressions that synthesize rows inside the database.
//!
//! A chunk is a single `INSERT ... SELECT <exprs> FROM generate_series(1, $1)`,
//! so the number of rows per statement is bounded only by the series length,
//! never by the bind-parameter limit.

use super::quote_literal;
use crate::rows::{column_list, ColumnDef, Domain, Span, COLUMNS, FUTURE_SPAN_DAYS};

const EPOCH_START: &str = "TIMESTAMP '2020-01-01 00:00:00'";

/// Wrap `expr` so it yields NULL with the given probability.
pub fn nullable(expr: &str, probability: f64) -> String {
    if probability <= 0.0 {
        expr.to_string()
    } else if probability >= 1.0 {
        "NULL".to_string()
    } else {
        format!("CASE WHEN random() < {} THEN NULL ELSE ({}) END", probability, expr)
    }
}

/// Pick uniformly from a fixed vocabulary.
pub fn choice(options: &[&str]) -> String {
    let items = options
        .iter()
        .map(|o| quote_literal(o))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "(ARRAY[{}]::varchar[])[floor(random() * {} + 1)::int]",
        items,
        options.len()
    )
}

/// Uniform integer in `min..=max`.
pub fn int_range(min: i32, max: i32) -> String {
    let width = i64::from(max) - i64::from(min) + 1;
    format!("(floor(random() * {} + {})::int)", width, min)
}

/// Random hex text with a length in `min..=max`.
pub fn text_range(min: usize, max: usize) -> String {
    format!(
        "substr(replace(gen_random_uuid()::text, '-', ''), 1, {})",
        int_range(min as i32, max as i32)
    )
}

pub fn timestamp_in(span: Span) -> String {
    match span {
        Span::Past => format!(
            "(LOCALTIMESTAMP - random() * (LOCALTIMESTAMP - {}))",
            EPOCH_START
        ),
        Span::Future => format!(
            "(LOCALTIMESTAMP + random() * INTERVAL '{} days')",
            FUTURE_SPAN_DAYS
        ),
    }
}

/// Generation expression for one column, honouring its null probability.
pub fn column_expr(def: &ColumnDef) -> String {
    let base = match def.domain {
        Domain::Uuid => "gen_random_uuid()::text".to_string(),
        Domain::Choice(options) => choice(options),
        Domain::Text { min, max } => text_range(min, max),
        Domain::Int { min, max } => int_range(min, max),
        Domain::Bool => "(random() < 0.5)".to_string(),
        Domain::Date(span) => format!("({})::date", timestamp_in(span)),
        Domain::Timestamp(span) => format!("date_trunc('second', {})", timestamp_in(span)),
        Domain::Now => "LOCALTIMESTAMP".to_string(),
    };
    if def.required {
        base
    } else {
        nullable(&base, def.null_probability)
    }
}

/// `INSERT INTO <table> (...) SELECT ... FROM generate_series(1, $1)`.
///
/// The row count is bound as `$1` (BIGINT).
pub fn insert_select(qualified_table: &str) -> String {
    let exprs = COLUMNS
        .iter()
        .map(column_expr)
        .collect::<Vec<_>>()
        .join(",\n    ");
    format!(
        "INSERT INTO {} ({})\nSELECT\n    {}\nFROM generate_series(1, $1::bigint) AS n",
        qualified_table,
        column_list(),
        exprs
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::column;

    #[test]
    fn test_nullable_bounds() {
        assert_eq!(nullable("x", 0.0), "x");
        assert_eq!(nullable("x", 1.0), "NULL");
        assert_eq!(
            nullable("x", 0.25),
            "CASE WHEN random() < 0.25 THEN NULL ELSE (x) END"
        );
    }

    #[test]
    fn test_choice_escapes_and_indexes() {
        assert_eq!(
            choice(&["a", "it's"]),
            "(ARRAY['a', 'it''s']::varchar[])[floor(random() * 2 + 1)::int]"
        );
    }

    #[test]
    fn test_int_range_covers_negative_bounds() {
        assert_eq!(int_range(-1000, 10000), "(floor(random() * 11001 + -1000)::int)");
    }

    #[test]
    fn test_required_columns_never_wrapped() {
        let amount = column("amount").unwrap();
        assert!(!column_expr(amount).contains("NULL"));
        let carrier = column("carrier_id").unwrap();
        assert!(column_expr(carrier).starts_with("CASE WHEN random() < 0.6"));
    }

    #[test]
    fn test_flag_columns_never_null() {
        let cancelled = column("cancelled").unwrap();
        assert_eq!(column_expr(cancelled), "(random() < 0.5)");
        let merged = column("is_merged").unwrap();
        assert!(!column_expr(merged).contains("NULL"));
    }

    #[test]
    fn test_insert_select_shape() {
        let sql = insert_select("\"bench\".\"bonus_registry_plain\"");
        assert!(sql.starts_with("INSERT INTO \"bench\".\"bonus_registry_plain\" (\"id\", \"date\""));
        assert!(sql.ends_with("FROM generate_series(1, $1::bigint) AS n"));
        assert!(sql.matches("gen_random_uuid()::text").count() >= 4);
        assert!(!sql.contains("$2"));
    }
}
