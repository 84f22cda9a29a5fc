//! Bulk loader.
//!
//! Postgres generates every chunk server-side with a single
//! `INSERT ... SELECT ... FROM generate_series`, so chunk size is not limited
//! by bind parameters or client memory. Trino has no such path and receives
//! client-generated rows as literal `VALUES` lists.

use crate::backend::{BackendSession, FillStrategy, QueryBackend};
use crate::error::BenchError;
use crate::rows::{column_list, Row, RowGenerator};
use crate::runlog::RunLog;
use crate::sql::generate::insert_select;
use crate::sql::SqlValue;
use crate::variant::TableVariant;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillSummary {
    pub rows_inserted: u64,
    pub elapsed: Duration,
}

impl FillSummary {
    pub fn rows_per_sec(&self) -> u64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.rows_inserted as f64 / secs).round() as u64
        } else {
            self.rows_inserted
        }
    }

    pub fn summary_line(&self) -> String {
        format!(
            "totalRows={} totalMs={} rowsPerSec={}",
            self.rows_inserted,
            self.elapsed.as_millis(),
            self.rows_per_sec()
        )
    }
}

/// Rows per statement for the given strategy.
pub fn chunk_size(strategy: FillStrategy, batch_size: u64) -> u64 {
    match strategy {
        FillStrategy::ServerSide => batch_size.max(1),
        FillStrategy::LiteralValues { max_rows } => batch_size.min(max_rows).max(1),
    }
}

/// `INSERT INTO <table> (...) VALUES (...), (...)` with every value inlined.
pub fn literal_insert(qualified_table: &str, rows: &[Row]) -> String {
    let values = rows
        .iter()
        .map(|row| {
            let cells = row
                .values()
                .iter()
                .map(SqlValue::to_literal)
                .collect::<Vec<_>>()
                .join(", ");
            format!("({})", cells)
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES {}",
        qualified_table,
        column_list(),
        values
    )
}

fn progress_line(
    variant: TableVariant,
    batch: u64,
    batch_elapsed: Duration,
    total_elapsed: Duration,
    inserted: u64,
) -> String {
    format!(
        "variant={} batchSize={} batchMs={} cumulativeMs={} cumulativeRows={}",
        variant.table_name(),
        batch,
        batch_elapsed.as_millis(),
        total_elapsed.as_millis(),
        inserted
    )
}

/// Insert `count` synthetic rows in chunks of at most `batch_size`.
///
/// One session serves every chunk. The first failing chunk aborts the fill.
pub async fn fill(
    backend: &dyn QueryBackend,
    variant: TableVariant,
    count: u64,
    batch_size: u64,
    log: &RunLog,
) -> Result<FillSummary, BenchError> {
    let table = backend.qualified_table(variant);
    let strategy = backend.fill_strategy();
    let chunk = chunk_size(strategy, batch_size);

    let mut session = backend.session().await?;
    let started = Instant::now();
    let mut inserted = 0u64;

    while inserted < count {
        let batch = chunk.min(count - inserted);
        let batch_started = Instant::now();
        insert_chunk(session.as_mut(), strategy, &table, batch).await?;
        inserted += batch;

        log.line(progress_line(
            variant,
            batch,
            batch_started.elapsed(),
            started.elapsed(),
            inserted,
        ));
    }

    let summary = FillSummary {
        rows_inserted: inserted,
        elapsed: started.elapsed(),
    };
    log.line(summary.summary_line());
    session.close().await?;

    Ok(summary)
}

async fn insert_chunk(
    session: &mut dyn BackendSession,
    strategy: FillStrategy,
    table: &str,
    batch: u64,
) -> Result<(), BenchError> {
    match strategy {
        FillStrategy::ServerSide => {
            let rows = i64::try_from(batch)
                .map_err(|_| BenchError::Config(format!("batch of {} rows is too large", batch)))?;
            let affected = session
                .execute(&insert_select(table), &[SqlValue::Int(rows)])
                .await?;
            debug!(affected, "Server-side chunk inserted");
        }
        FillStrategy::LiteralValues { .. } => {
            let rows = RowGenerator::new().generate_batch(batch as usize);
            let sql = literal_insert(table, &rows);
            session.execute(&sql, &[]).await?;
        }
    }
    Ok(())
}
