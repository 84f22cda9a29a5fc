//! Engines the fill, read and query benchmarks run statements through.

#[cfg(test)]
pub mod mock;
mod postgres;
mod trino;

pub use postgres::{connect_with_ssl_retry, PostgresBackend};
pub use trino::{TrinoBackend, TrinoPage};

use crate::config::{AppConfig, BenchMode};
use crate::error::BenchError;
use crate::sql::SqlValue;
use crate::variant::TableVariant;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// Result rows with every column rendered as text.
pub type TextRows = Vec<Vec<Option<String>>>;

/// How the bulk loader should produce rows for this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStrategy {
    /// `INSERT ... SELECT ... FROM generate_series(1, $1)` inside the database.
    ServerSide,
    /// Client-generated rows sent as literal `VALUES` lists of at most `max_rows`.
    LiteralValues { max_rows: u64 },
}

/// A statement engine. Sessions are opened per operation.
#[async_trait]
pub trait QueryBackend: Debug + Send + Sync {
    /// Short engine name for log lines.
    fn name(&self) -> &'static str;

    /// Fully qualified, quoted name of the variant's table on this engine.
    fn qualified_table(&self, variant: TableVariant) -> String;

    fn fill_strategy(&self) -> FillStrategy;

    /// Whether statement text is attached to debug events.
    fn logs_sql(&self) -> bool {
        false
    }

    /// Open a session that serves every statement of one fill or benchmark call.
    async fn session(&self) -> Result<Box<dyn BackendSession>, BenchError>;
}

/// One connection's worth of statements. `$n` placeholders refer to `params`.
#[async_trait]
pub trait BackendSession: Send {
    /// Run a statement and return the number of affected rows.
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, BenchError>;

    /// Run a query whose columns are all text (use `CAST(.. AS VARCHAR)`).
    async fn fetch_text(&mut self, sql: &str, params: &[SqlValue])
        -> Result<TextRows, BenchError>;

    /// Run a query to completion, discarding values. Returns the row count.
    async fn fetch_discard(&mut self, sql: &str, params: &[SqlValue])
        -> Result<usize, BenchError>;

    async fn close(self: Box<Self>) -> Result<(), BenchError> {
        Ok(())
    }
}

/// Emit the statement text at debug level when `enabled`.
fn log_statement(enabled: bool, engine: &'static str, sql: &str) {
    if enabled {
        tracing::debug!(engine, sql, "Executing statement");
    }
}

/// Build the backend selected by `bench.mode`.
pub fn from_config(config: &AppConfig) -> Result<Arc<dyn QueryBackend>, BenchError> {
    let log_sql = config.logging.log_sql;
    match config.bench.mode {
        BenchMode::Postgres => Ok(Arc::new(
            PostgresBackend::new(config.postgres.clone()).with_sql_logging(log_sql),
        )),
        BenchMode::Trino => Ok(Arc::new(
            TrinoBackend::new(config.trino.clone())?.with_sql_logging(log_sql),
        )),
    }
}

/// First column of the first row parsed as a count.
pub fn parse_count(rows: &TextRows) -> Result<u64, BenchError> {
    rows.first()
        .and_then(|row| row.first())
        .and_then(|cell| cell.as_deref())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .ok_or_else(|| BenchError::InvalidRow("count query returned no value".to_string()))
}
