use crate::backend::QueryBackend;
use crate::error::BenchError;
use crate::rows::{column_list, Row, COLUMNS};
use crate::variant::TableVariant;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// Writes single rows for the insert endpoint.
#[async_trait]
pub trait Inserter: Debug + Send + Sync {
    async fn insert_row(&self, variant: TableVariant, row: &Row) -> Result<(), BenchError>;
}

/// `INSERT ... VALUES (CAST($1 AS ..), ...)`, typed so NULLs bind to any column.
pub fn single_insert_sql(qualified_table: &str) -> String {
    let placeholders = COLUMNS
        .iter()
        .enumerate()
        .map(|(i, c)| format!("CAST(${} AS {})", i + 1, c.sql_type.ddl()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        qualified_table,
        column_list(),
        placeholders
    )
}

/// Inserts through the configured benchmark backend.
#[derive(Debug)]
pub struct BackendInserter {
    backend: Arc<dyn QueryBackend>,
}

impl BackendInserter {
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Inserter for BackendInserter {
    async fn insert_row(&self, variant: TableVariant, row: &Row) -> Result<(), BenchError> {
        let sql = single_insert_sql(&self.backend.qualified_table(variant));
        let mut session = self.backend.session().await?;
        session.execute(&sql, &row.values()).await?;
        session.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::{inline_params, SqlValue};

    #[test]
    fn test_single_insert_has_typed_placeholder_per_column() {
        let sql = single_insert_sql("\"bench\".\"bonus_registry_plain\"");
        assert!(sql.contains("VALUES (CAST($1 AS VARCHAR(255)), CAST($2 AS TIMESTAMP)"));
        assert!(sql.ends_with(&format!("CAST(${} AS TIMESTAMP))", COLUMNS.len())));
    }

    #[test]
    fn test_single_insert_inlines_for_literal_engines() {
        let sql = single_insert_sql("t");
        let row = Row {
            id: "r-1".to_string(),
            amount: 7,
            ..Default::default()
        };
        let inlined = inline_params(&sql, &row.values()).unwrap();
        assert!(inlined.contains("VALUES (CAST('r-1' AS VARCHAR(255)), CAST(NULL AS TIMESTAMP)"));
        assert!(!inlined.contains('$'));
        assert_eq!(row.values()[0], SqlValue::Text("r-1".to_string()));
    }
}
