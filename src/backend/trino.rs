//! Trino backend over the REST statement protocol.
//!
//! A statement is POSTed to `/v1/statement`; results arrive in pages linked
//! by `nextUri`. Failures are reported inside a page rather than as an HTTP
//! status, so every page is checked for an `error` object.

use super::{log_statement, BackendSession, FillStrategy, QueryBackend, TextRows};
use crate::config::TrinoConfig;
use crate::error::BenchError;
use crate::sql::{inline_params, qualified_name, SqlValue};
use crate::variant::TableVariant;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

/// Literal `VALUES` batches above this size exceed Trino's query text limits.
const MAX_LITERAL_ROWS: u64 = 1000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrinoPage {
    pub id: Option<String>,
    pub next_uri: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<Vec<Value>>>,
    pub error: Option<TrinoQueryError>,
    pub update_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrinoQueryError {
    pub message: String,
    pub error_name: Option<String>,
}

impl TrinoPage {
    /// Append this page's rows to `out`, or surface its embedded error.
    fn collect_into(self, out: &mut TextRows) -> Result<(), BenchError> {
        if let Some(err) = self.error {
            return Err(BenchError::Trino(match err.error_name {
                Some(name) => format!("{}: {}", name, err.message),
                None => err.message,
            }));
        }
        if let Some(data) = self.data {
            out.extend(
                data.into_iter()
                    .map(|row| row.into_iter().map(value_to_text).collect()),
            );
        }
        Ok(())
    }
}

fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone)]
pub struct TrinoBackend {
    config: TrinoConfig,
    client: Client,
    log_sql: bool,
}

impl TrinoBackend {
    pub fn new(config: TrinoConfig) -> Result<Self, BenchError> {
        let client = Client::builder().build()?;
        Ok(Self {
            config,
            client,
            log_sql: false,
        })
    }

    pub fn with_sql_logging(mut self, enabled: bool) -> Self {
        self.log_sql = enabled;
        self
    }

    /// Run one statement to completion, following `nextUri`.
    async fn run(&self, sql: &str) -> Result<(TextRows, u64), BenchError> {
        log_statement(self.log_sql, "trino", sql);
        let mut rows = Vec::new();
        let mut update_count = 0;

        let mut page: TrinoPage = self
            .client
            .post(format!("{}/v1/statement", self.config.server_url()))
            .header("X-Trino-User", &self.config.user)
            .header("X-Trino-Catalog", &self.config.catalog)
            .header("X-Trino-Schema", &self.config.schema)
            .body(sql.to_string())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        loop {
            let next = page.next_uri.take();
            if let Some(count) = page.update_count {
                update_count = count;
            }
            page.collect_into(&mut rows)?;

            match next {
                Some(uri) => {
                    page = self
                        .client
                        .get(uri)
                        .header("X-Trino-User", &self.config.user)
                        .send()
                        .await?
                        .error_for_status()?
                        .json()
                        .await?;
                }
                None => break,
            }
        }

        Ok((rows, update_count))
    }
}

#[async_trait]
impl QueryBackend for TrinoBackend {
    fn name(&self) -> &'static str {
        "trino"
    }

    fn qualified_table(&self, variant: TableVariant) -> String {
        qualified_name(
            Some(&self.config.catalog),
            &self.config.schema,
            &variant.table_name(),
        )
    }

    fn fill_strategy(&self) -> FillStrategy {
        FillStrategy::LiteralValues {
            max_rows: MAX_LITERAL_ROWS,
        }
    }

    fn logs_sql(&self) -> bool {
        self.log_sql
    }

    async fn session(&self) -> Result<Box<dyn BackendSession>, BenchError> {
        Ok(Box::new(TrinoSession {
            backend: self.clone(),
        }))
    }
}

pub struct TrinoSession {
    backend: TrinoBackend,
}

#[async_trait]
impl BackendSession for TrinoSession {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, BenchError> {
        let sql = inline_params(sql, params)?;
        let (_, count) = self.backend.run(&sql).await?;
        Ok(count)
    }

    async fn fetch_text(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<TextRows, BenchError> {
        let sql = inline_params(sql, params)?;
        let (rows, _) = self.backend.run(&sql).await?;
        Ok(rows)
    }

    async fn fetch_discard(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<usize, BenchError> {
        let sql = inline_params(sql, params)?;
        let (rows, _) = self.backend.run(&sql).await?;
        Ok(rows.len())
    }
}
