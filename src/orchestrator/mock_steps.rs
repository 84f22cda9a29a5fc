//! In-memory `BenchSteps` for exercising the orchestrator.
//!
//! Keeps a row count per variant, records every call in order and can be
//! told to fail a named step once.

use super::BenchSteps;
use crate::bench::{FillSummary, LatencyStats, QueryResult};
use crate::error::BenchError;
use crate::runlog::RunLog;
use crate::variant::TableVariant;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct MockSteps {
    tables: Mutex<HashMap<TableVariant, u64>>,
    calls: Mutex<Vec<String>>,
    fail_once: Mutex<Option<String>>,
    /// Rows each fill really adds, when it should differ from the request
    fill_override: Mutex<Option<u64>>,
}

impl MockSteps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call to `step` (e.g. "read", "fill") fail.
    pub fn fail_next(&self, step: &str) {
        *self.fail_once.lock().unwrap() = Some(step.to_string());
    }

    /// Make every fill insert `rows` regardless of the requested count.
    pub fn fill_inserts(&self, rows: u64) {
        *self.fill_override.lock().unwrap() = Some(rows);
    }

    /// Drop the table as if done externally.
    pub fn drop_table(&self, variant: TableVariant) {
        self.tables.lock().unwrap().remove(&variant);
    }

    pub fn set_rows(&self, variant: TableVariant, rows: u64) {
        self.tables.lock().unwrap().insert(variant, rows);
    }

    pub fn rows(&self, variant: TableVariant) -> Option<u64> {
        self.tables.lock().unwrap().get(&variant).copied()
    }

    /// Calls made so far, e.g. `["create", "count", "fill 1000", ...]`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: impl Into<String>) -> Result<(), BenchError> {
        let call = call.into();
        let step = call.split_whitespace().next().unwrap_or_default().to_string();
        self.calls.lock().unwrap().push(call);

        let mut fail = self.fail_once.lock().unwrap();
        if fail.as_deref() == Some(step.as_str()) {
            *fail = None;
            return Err(BenchError::Io(std::io::Error::other(format!(
                "injected failure in {}",
                step
            ))));
        }
        Ok(())
    }

    fn require_table(&self, variant: TableVariant) -> Result<u64, BenchError> {
        self.rows(variant).ok_or_else(|| BenchError::TableMissing {
            table: variant.table_name(),
        })
    }

    fn stats() -> LatencyStats {
        LatencyStats {
            min: 1.0,
            max: 1.0,
            avg: 1.0,
            median: 1.0,
            n: 1,
        }
    }
}

#[async_trait]
impl BenchSteps for MockSteps {
    async fn create_table(&self, variant: TableVariant) -> Result<(), BenchError> {
        self.record("create")?;
        self.tables.lock().unwrap().entry(variant).or_insert(0);
        Ok(())
    }

    async fn row_count(&self, variant: TableVariant) -> Result<u64, BenchError> {
        self.record("count")?;
        self.require_table(variant)
    }

    async fn drop_index(&self, variant: TableVariant) -> Result<(), BenchError> {
        self.record("drop_index")?;
        self.require_table(variant).map(|_| ())
    }

    async fn create_index(&self, variant: TableVariant) -> Result<Duration, BenchError> {
        self.record("create_index")?;
        self.require_table(variant)?;
        Ok(Duration::from_millis(1))
    }

    async fn set_logged(&self, variant: TableVariant, logged: bool) -> Result<(), BenchError> {
        self.record(if logged { "logged" } else { "unlogged" })?;
        self.require_table(variant).map(|_| ())
    }

    async fn analyze(&self, variant: TableVariant) -> Result<(), BenchError> {
        self.record("analyze")?;
        self.require_table(variant).map(|_| ())
    }

    async fn fill(
        &self,
        variant: TableVariant,
        count: u64,
        _fill_batch: u64,
        log: &RunLog,
    ) -> Result<FillSummary, BenchError> {
        self.record(format!("fill {}", count))?;
        self.require_table(variant)?;
        let added = self.fill_override.lock().unwrap().unwrap_or(count);
        if let Some(rows) = self.tables.lock().unwrap().get_mut(&variant) {
            *rows += added;
        }
        let summary = FillSummary {
            rows_inserted: added,
            elapsed: Duration::from_millis(1),
        };
        log.line(summary.summary_line());
        Ok(summary)
    }

    async fn read(&self, variant: TableVariant, _log: &RunLog) -> Result<LatencyStats, BenchError> {
        self.record("read")?;
        self.require_table(variant)?;
        Ok(Self::stats())
    }

    async fn queries(
        &self,
        variant: TableVariant,
        _log: &RunLog,
    ) -> Result<Vec<QueryResult>, BenchError> {
        self.record("queries")?;
        self.require_table(variant)?;
        Ok(vec![QueryResult {
            id: 9,
            name: "General pagination".to_string(),
            stats: Self::stats(),
        }])
    }
}
