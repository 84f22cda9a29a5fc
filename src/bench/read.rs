//! Read benchmark: point lookups on sampled partition-key values.
//!
//! Sampling is two-tier. `TABLESAMPLE BERNOULLI` is cheap but may return
//! nothing on small tables, so an exact `ORDER BY random()` scan is the
//! fallback.

use super::stats::LatencyStats;
use crate::backend::{parse_count, BackendSession, QueryBackend};
use crate::error::BenchError;
use crate::sql::{quote_ident, SqlValue};
use crate::variant::{TableVariant, PARTITION_COLUMN};
use std::time::Instant;
use tracing::debug;

/// Oversampling factor applied to the Bernoulli rate.
const OVERSAMPLE: f64 = 1.5;
const MIN_SAMPLE_PERCENT: f64 = 0.5;
const MAX_SAMPLE_PERCENT: f64 = 100.0;

/// Bernoulli sampling rate in percent that should yield `samples` rows.
pub fn sample_percent(samples: u64, total_rows: u64) -> f64 {
    if total_rows == 0 {
        return MAX_SAMPLE_PERCENT;
    }
    let pct = samples as f64 / total_rows as f64 * 100.0 * OVERSAMPLE;
    pct.clamp(MIN_SAMPLE_PERCENT, MAX_SAMPLE_PERCENT)
}

pub fn count_sql(table: &str) -> String {
    format!("SELECT CAST(COUNT(*) AS VARCHAR) FROM {}", table)
}

fn bernoulli_sql(table: &str, percent: f64, samples: u64) -> String {
    format!(
        "SELECT CAST({col} AS VARCHAR) FROM {table} TABLESAMPLE BERNOULLI ({percent}) LIMIT {samples}",
        col = quote_ident(PARTITION_COLUMN),
    )
}

fn random_scan_sql(table: &str, samples: u64) -> String {
    format!(
        "SELECT CAST({col} AS VARCHAR) FROM {table} ORDER BY random() LIMIT {samples}",
        col = quote_ident(PARTITION_COLUMN),
    )
}

pub fn lookup_sql(table: &str) -> String {
    format!(
        "SELECT * FROM {} WHERE {} = $1 LIMIT 1",
        table,
        quote_ident(PARTITION_COLUMN)
    )
}

async fn sample_keys(
    session: &mut dyn BackendSession,
    table: &str,
    samples: u64,
    total_rows: u64,
) -> Result<Vec<String>, BenchError> {
    let percent = sample_percent(samples, total_rows);
    let rows = session
        .fetch_text(&bernoulli_sql(table, percent, samples), &[])
        .await?;
    let mut keys: Vec<String> = rows.into_iter().filter_map(|r| r.into_iter().next().flatten()).collect();

    if keys.is_empty() {
        debug!(percent, "Bernoulli sample empty, falling back to random scan");
        let rows = session
            .fetch_text(&random_scan_sql(table, samples), &[])
            .await?;
        keys = rows.into_iter().filter_map(|r| r.into_iter().next().flatten()).collect();
    }
    Ok(keys)
}

/// Time one point lookup per sampled key.
pub async fn run_read(
    backend: &dyn QueryBackend,
    variant: TableVariant,
    samples: u64,
) -> Result<LatencyStats, BenchError> {
    let table = backend.qualified_table(variant);
    let mut session = backend.session().await?;

    let total_rows = parse_count(&session.fetch_text(&count_sql(&table), &[]).await?)?;
    if total_rows == 0 {
        return Err(BenchError::EmptyTable { table });
    }

    let keys = sample_keys(session.as_mut(), &table, samples, total_rows).await?;
    let lookup = lookup_sql(&table);
    let mut timings = Vec::with_capacity(keys.len());
    for key in keys {
        let started = Instant::now();
        session.fetch_discard(&lookup, &[SqlValue::Text(key)]).await?;
        timings.push(started.elapsed());
    }
    session.close().await?;

    LatencyStats::from_durations(&timings).ok_or(BenchError::NoSamples { table })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{text_rows, MockBackend};

    #[test]
    fn test_sample_percent_bounds() {
        assert_eq!(sample_percent(100, 1_000_000_000), 0.5);
        assert_eq!(sample_percent(100, 50), 100.0);
        assert!((sample_percent(100, 20_000) - 0.75).abs() < 1e-9);
        assert_eq!(sample_percent(100, 0), 100.0);
    }

    #[tokio::test]
    async fn test_single_row_engages_fallback() {
        let backend = MockBackend::new(|sql, _| {
            if sql.contains("COUNT(*)") {
                Ok(text_rows(&["1"]))
            } else if sql.contains("TABLESAMPLE") {
                Ok(vec![])
            } else if sql.contains("ORDER BY random()") {
                Ok(text_rows(&["profile-1"]))
            } else {
                Ok(vec![vec![Some("row".to_string())]])
            }
        });

        let stats = run_read(&backend, TableVariant::Plain, 100).await.unwrap();
        assert_eq!(stats.n, 1);

        let statements = backend.statements();
        assert!(statements[1].0.contains("TABLESAMPLE BERNOULLI (100) LIMIT 100"));
        let (lookup, params) = statements.last().unwrap();
        assert_eq!(lookup, &lookup_sql("\"bench\".\"bonus_registry_plain\""));
        assert_eq!(params, &vec![SqlValue::Text("profile-1".to_string())]);
    }

    #[tokio::test]
    async fn test_empty_table_fails_fast() {
        let backend = MockBackend::new(|_, _| Ok(text_rows(&["0"])));
        let err = run_read(&backend, TableVariant::Idx, 10).await.unwrap_err();
        assert!(matches!(err, BenchError::EmptyTable { .. }));
        assert_eq!(backend.statements().len(), 1);
    }

    #[tokio::test]
    async fn test_no_samples_at_all() {
        let backend = MockBackend::new(|sql, _| {
            if sql.contains("COUNT(*)") {
                Ok(text_rows(&["5"]))
            } else {
                Ok(vec![vec![None]])
            }
        });
        let err = run_read(&backend, TableVariant::Part, 10).await.unwrap_err();
        assert!(matches!(err, BenchError::NoSamples { .. }));
    }
}
