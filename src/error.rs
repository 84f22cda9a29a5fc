//! Error types for benchmark operations

use thiserror::Error;

/// Postgres SQLSTATE for `undefined_table`.
const UNDEFINED_TABLE: &str = "42P01";

/// Errors that can occur while preparing or running a benchmark
#[derive(Debug, Error)]
pub enum BenchError {
    /// Invalid configuration or command-line argument
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Table variant name is not one of plain, part, idx, idx_part
    #[error("unknown table variant '{0}' (expected plain, part, idx or idx_part)")]
    UnknownVariant(String),

    /// The benchmark table does not exist
    #[error("table {table} does not exist")]
    TableMissing { table: String },

    /// The benchmark table has no rows to read
    #[error("table {table} is empty")]
    EmptyTable { table: String },

    /// Sampling returned no partition key values
    #[error("no partition key values sampled from {table}")]
    NoSamples { table: String },

    /// Statement failed in Postgres
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    /// Error reported inside a Trino result page
    #[error("trino: {0}")]
    Trino(String),

    /// Transport failure talking to Trino
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Log, results or state file I/O failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Run state could not be serialized or parsed
    #[error("state serialization failed: {0}")]
    State(#[from] serde_json::Error),

    /// Row payload did not match the column contract
    #[error("invalid row: {0}")]
    InvalidRow(String),
}

impl BenchError {
    /// Map a sqlx error, recognising a missing relation so callers can self-heal.
    pub fn from_sqlx(e: sqlx::Error, table: &str) -> Self {
        if is_undefined_table(&e) {
            BenchError::TableMissing {
                table: table.to_string(),
            }
        } else {
            BenchError::Database(e)
        }
    }

    pub fn is_table_missing(&self) -> bool {
        matches!(self, BenchError::TableMissing { .. })
    }
}

impl From<sqlx::Error> for BenchError {
    fn from(e: sqlx::Error) -> Self {
        match missing_relation(&e) {
            Some(table) => BenchError::TableMissing { table },
            None => BenchError::Database(e),
        }
    }
}

fn is_undefined_table(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(UNDEFINED_TABLE),
        _ => false,
    }
}

/// Relation name from an `undefined_table` error message.
fn missing_relation(e: &sqlx::Error) -> Option<String> {
    if !is_undefined_table(e) {
        return None;
    }
    let message = match e {
        sqlx::Error::Database(db) => db.message().to_string(),
        _ => return None,
    };
    let name = message
        .split('"')
        .nth(1)
        .map(str::to_string)
        .unwrap_or(message);
    Some(name)
}
