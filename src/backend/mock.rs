//! Scripted backend for exercising the runners without a database.

use super::{BackendSession, FillStrategy, QueryBackend, TextRows};
use crate::error::BenchError;
use crate::sql::{qualified_name, SqlValue};
use crate::variant::TableVariant;
use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, Mutex};

type Responder = dyn Fn(&str, &[SqlValue]) -> Result<TextRows, BenchError> + Send + Sync;

/// Every statement is recorded and answered by the responder closure.
#[derive(Clone)]
pub struct MockBackend {
    responder: Arc<Responder>,
    statements: Arc<Mutex<Vec<(String, Vec<SqlValue>)>>>,
}

impl fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockBackend").finish_non_exhaustive()
    }
}

impl MockBackend {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, &[SqlValue]) -> Result<TextRows, BenchError> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            statements: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn statements(&self) -> Vec<(String, Vec<SqlValue>)> {
        self.statements.lock().unwrap().clone()
    }

    fn answer(&self, sql: &str, params: &[SqlValue]) -> Result<TextRows, BenchError> {
        self.statements
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        (self.responder)(sql, params)
    }
}

/// Shorthand for a single-column result.
pub fn text_rows(values: &[&str]) -> TextRows {
    values.iter().map(|v| vec![Some(v.to_string())]).collect()
}

#[async_trait]
impl QueryBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn qualified_table(&self, variant: TableVariant) -> String {
        qualified_name(None, "bench", &variant.table_name())
    }

    fn fill_strategy(&self) -> FillStrategy {
        FillStrategy::ServerSide
    }

    async fn session(&self) -> Result<Box<dyn BackendSession>, BenchError> {
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl BackendSession for MockBackend {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, BenchError> {
        Ok(self.answer(sql, params)?.len() as u64)
    }

    async fn fetch_text(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<TextRows, BenchError> {
        self.answer(sql, params)
    }

    async fn fetch_discard(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<usize, BenchError> {
        Ok(self.answer(sql, params)?.len())
    }
}
