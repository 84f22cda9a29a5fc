//! PostgreSQL backend using sqlx

use super::{log_statement, BackendSession, FillStrategy, QueryBackend, TextRows};
use crate::config::PostgresConfig;
use crate::error::BenchError;
use crate::sql::{qualified_name, SqlValue};
use crate::variant::TableVariant;
use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgConnection};
use sqlx::query::Query;
use sqlx::{Connection, Postgres, Row};

/// Connect to PostgreSQL with automatic SSL retry.
/// If the initial connection fails with an "insecure connection" error,
/// automatically retries with `sslmode=require` appended to the connection string.
pub async fn connect_with_ssl_retry(connection_string: &str) -> Result<PgConnection, sqlx::Error> {
    match PgConnection::connect(connection_string).await {
        Ok(conn) => Ok(conn),
        Err(e) => {
            let error_msg = e.to_string();
            if error_msg.contains("connection is insecure")
                || error_msg.contains("sslmode=require")
            {
                let ssl_connection_string = if connection_string.contains('?') {
                    format!("{}&sslmode=require", connection_string)
                } else {
                    format!("{}?sslmode=require", connection_string)
                };
                PgConnection::connect(&ssl_connection_string).await
            } else {
                Err(e)
            }
        }
    }
}

/// Bind every value in order as `$1..$n`.
fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[SqlValue],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Date(d) => query.bind(*d),
            SqlValue::Timestamp(ts) => query.bind(*ts),
        };
    }
    query
}

#[derive(Debug, Clone)]
pub struct PostgresBackend {
    config: PostgresConfig,
    log_sql: bool,
}

impl PostgresBackend {
    pub fn new(config: PostgresConfig) -> Self {
        Self {
            config,
            log_sql: false,
        }
    }

    pub fn with_sql_logging(mut self, enabled: bool) -> Self {
        self.log_sql = enabled;
        self
    }
}

#[async_trait]
impl QueryBackend for PostgresBackend {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn qualified_table(&self, variant: TableVariant) -> String {
        qualified_name(None, &self.config.schema, &variant.table_name())
    }

    fn fill_strategy(&self) -> FillStrategy {
        FillStrategy::ServerSide
    }

    fn logs_sql(&self) -> bool {
        self.log_sql
    }

    async fn session(&self) -> Result<Box<dyn BackendSession>, BenchError> {
        let conn = connect_with_ssl_retry(&self.config.connection_string()).await?;
        Ok(Box::new(PostgresSession {
            conn,
            log_sql: self.log_sql,
        }))
    }
}

pub struct PostgresSession {
    conn: PgConnection,
    log_sql: bool,
}

#[async_trait]
impl BackendSession for PostgresSession {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, BenchError> {
        log_statement(self.log_sql, "postgres", sql);
        let result = bind_params(sqlx::query(sql), params)
            .execute(&mut self.conn)
            .await?;
        Ok(result.rows_affected())
    }

    async fn fetch_text(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<TextRows, BenchError> {
        log_statement(self.log_sql, "postgres", sql);
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&mut self.conn)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut cells = Vec::with_capacity(row.len());
            for i in 0..row.len() {
                cells.push(row.try_get::<Option<String>, _>(i)?);
            }
            out.push(cells);
        }
        Ok(out)
    }

    async fn fetch_discard(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<usize, BenchError> {
        log_statement(self.log_sql, "postgres", sql);
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&mut self.conn)
            .await?;
        Ok(rows.len())
    }

    async fn close(self: Box<Self>) -> Result<(), BenchError> {
        self.conn.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_table_uses_schema() {
        let backend = PostgresBackend::new(PostgresConfig {
            schema: "perf".to_string(),
            ..Default::default()
        });
        assert_eq!(
            backend.qualified_table(TableVariant::IdxPart),
            "\"perf\".\"bonus_registry_idx_part\""
        );
        assert_eq!(backend.fill_strategy(), FillStrategy::ServerSide);
    }
}
