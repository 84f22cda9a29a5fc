//! Table lifecycle for the four layout variants.
//!
//! Tables always live in Postgres, whichever engine the benchmarks run
//! through. Every operation opens its own connection.

use crate::backend::connect_with_ssl_retry;
use crate::config::PostgresConfig;
use crate::error::BenchError;
use crate::rows::COLUMNS;
use crate::sql::{qualified_name, quote_ident, quote_literal};
use crate::variant::{TableVariant, PARTITION_COLUMN, PARTITION_COUNT};
use sqlx::postgres::PgConnection;
use sqlx::{Connection, Row};
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct SchemaManager {
    config: PostgresConfig,
}

impl SchemaManager {
    pub fn new(config: PostgresConfig) -> Self {
        Self { config }
    }

    pub fn schema(&self) -> &str {
        &self.config.schema
    }

    pub fn qualified_table(&self, variant: TableVariant) -> String {
        qualified_name(None, &self.config.schema, &variant.table_name())
    }

    fn qualified_partition(&self, variant: TableVariant, remainder: u32) -> String {
        qualified_name(None, &self.config.schema, &variant.partition_name(remainder))
    }

    async fn connect(&self) -> Result<PgConnection, BenchError> {
        Ok(connect_with_ssl_retry(&self.config.connection_string()).await?)
    }

    /// `CREATE TABLE IF NOT EXISTS` for the variant's parent table.
    pub fn create_table_sql(&self, variant: TableVariant) -> String {
        let mut lines: Vec<String> = COLUMNS
            .iter()
            .map(|c| {
                let not_null = if c.required { " NOT NULL" } else { "" };
                format!("    {} {}{}", quote_ident(c.name), c.sql_type.ddl(), not_null)
            })
            .collect();

        // Partitioned tables need the partition key in every unique constraint.
        let key = if variant.is_partitioned() {
            format!("{}, {}", quote_ident("id"), quote_ident(PARTITION_COLUMN))
        } else {
            quote_ident("id")
        };
        lines.push(format!("    PRIMARY KEY ({})", key));

        let partition_clause = if variant.is_partitioned() {
            format!(" PARTITION BY HASH ({})", quote_ident(PARTITION_COLUMN))
        } else {
            String::new()
        };

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n){}",
            self.qualified_table(variant),
            lines.join(",\n"),
            partition_clause
        )
    }

    /// One `CREATE TABLE ... PARTITION OF` per hash bucket.
    pub fn create_partitions_sql(&self, variant: TableVariant) -> Vec<String> {
        if !variant.is_partitioned() {
            return Vec::new();
        }
        let parent = self.qualified_table(variant);
        (0..PARTITION_COUNT)
            .map(|r| {
                format!(
                    "CREATE TABLE IF NOT EXISTS {} PARTITION OF {} FOR VALUES WITH (MODULUS {}, REMAINDER {})",
                    self.qualified_partition(variant, r),
                    parent,
                    PARTITION_COUNT,
                    r
                )
            })
            .collect()
    }

    pub fn create_index_sql(&self, variant: TableVariant) -> Option<String> {
        variant.index_name().map(|index| {
            format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                quote_ident(&index),
                self.qualified_table(variant),
                quote_ident(PARTITION_COLUMN)
            )
        })
    }

    /// Idempotently create the table, its partitions and its index.
    pub async fn create_variant(&self, variant: TableVariant) -> Result<(), BenchError> {
        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await?;

        sqlx::query(&format!(
            "CREATE SCHEMA IF NOT EXISTS {}",
            quote_ident(&self.config.schema)
        ))
        .execute(&mut *tx)
        .await?;

        sqlx::query(&self.create_table_sql(variant))
            .execute(&mut *tx)
            .await?;

        for stmt in self.create_partitions_sql(variant) {
            sqlx::query(&stmt).execute(&mut *tx).await?;
        }

        if let Some(stmt) = self.create_index_sql(variant) {
            sqlx::query(&stmt).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        conn.close().await?;

        info!(table = %variant.table_name(), "Table ready");
        Ok(())
    }

    /// Drop the table with its partitions and indexes. Absent tables are fine.
    pub async fn drop_variant(&self, variant: TableVariant) -> Result<(), BenchError> {
        let mut conn = self.connect().await?;
        sqlx::query(&format!(
            "DROP TABLE IF EXISTS {} CASCADE",
            self.qualified_table(variant)
        ))
        .execute(&mut conn)
        .await?;
        conn.close().await?;

        info!(table = %variant.table_name(), "Table dropped");
        Ok(())
    }

    pub async fn create_all(&self) -> Result<(), BenchError> {
        for variant in TableVariant::ALL {
            self.create_variant(variant).await?;
        }
        Ok(())
    }

    pub async fn drop_all(&self) -> Result<(), BenchError> {
        for variant in TableVariant::ALL {
            self.drop_variant(variant).await?;
        }
        Ok(())
    }

    /// Child tables attached to the variant's parent, sorted by name.
    pub async fn list_partitions(&self, variant: TableVariant) -> Result<Vec<String>, BenchError> {
        let mut conn = self.connect().await?;
        let rows = sqlx::query(
            r#"
            SELECT child.relname::text
            FROM pg_inherits
            JOIN pg_class parent ON pg_inherits.inhparent = parent.oid
            JOIN pg_class child ON pg_inherits.inhrelid = child.oid
            JOIN pg_namespace ns ON parent.relnamespace = ns.oid
            WHERE ns.nspname = $1 AND parent.relname = $2
            ORDER BY child.relname
            "#,
        )
        .bind(&self.config.schema)
        .bind(variant.table_name())
        .fetch_all(&mut conn)
        .await?;
        conn.close().await?;

        Ok(rows.iter().map(|r| r.get::<String, _>(0)).collect())
    }

    pub async fn table_exists(&self, variant: TableVariant) -> Result<bool, BenchError> {
        let mut conn = self.connect().await?;
        let exists: bool = sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
            .bind(self.qualified_table(variant))
            .fetch_one(&mut conn)
            .await?;
        conn.close().await?;
        Ok(exists)
    }

    /// Authoritative row count. A missing table yields `TableMissing`.
    pub async fn row_count(&self, variant: TableVariant) -> Result<u64, BenchError> {
        let table = self.qualified_table(variant);
        let mut conn = self.connect().await?;
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&mut conn)
            .await
            .map_err(|e| BenchError::from_sqlx(e, &table))?;
        conn.close().await?;
        Ok(count.max(0) as u64)
    }

    /// Drop the variant's secondary index if it has one.
    pub async fn drop_index(&self, variant: TableVariant) -> Result<(), BenchError> {
        let Some(index) = variant.index_name() else {
            return Ok(());
        };
        let mut conn = self.connect().await?;
        sqlx::query(&format!(
            "DROP INDEX IF EXISTS {}",
            qualified_name(None, &self.config.schema, &index)
        ))
        .execute(&mut conn)
        .await?;
        conn.close().await?;
        debug!(index = %index, "Index dropped");
        Ok(())
    }

    /// Build the variant's secondary index and return how long it took.
    pub async fn create_index(&self, variant: TableVariant) -> Result<Duration, BenchError> {
        let Some(stmt) = self.create_index_sql(variant) else {
            return Ok(Duration::ZERO);
        };
        let table = self.qualified_table(variant);
        let mut conn = self.connect().await?;
        let started = Instant::now();
        sqlx::query(&stmt)
            .execute(&mut conn)
            .await
            .map_err(|e| BenchError::from_sqlx(e, &table))?;
        let elapsed = started.elapsed();
        conn.close().await?;
        Ok(elapsed)
    }

    /// Switch write-ahead logging for non-partitioned variants.
    ///
    /// Partitioned variants always stay logged; the call is a no-op for them.
    pub async fn set_logged(&self, variant: TableVariant, logged: bool) -> Result<(), BenchError> {
        if variant.is_partitioned() {
            return Ok(());
        }
        let table = self.qualified_table(variant);
        let mode = if logged { "LOGGED" } else { "UNLOGGED" };
        let mut conn = self.connect().await?;
        sqlx::query(&format!("ALTER TABLE {} SET {}", table, mode))
            .execute(&mut conn)
            .await
            .map_err(|e| BenchError::from_sqlx(e, &table))?;
        conn.close().await?;
        debug!(table = %table, mode, "Logging mode changed");
        Ok(())
    }

    /// Refresh planner statistics.
    pub async fn analyze(&self, variant: TableVariant) -> Result<(), BenchError> {
        let table = self.qualified_table(variant);
        let mut conn = self.connect().await?;
        sqlx::query(&format!("ANALYZE {}", table))
            .execute(&mut conn)
            .await
            .map_err(|e| BenchError::from_sqlx(e, &table))?;
        conn.close().await?;
        Ok(())
    }

    /// Human-readable summary of what `create_variant` builds, for log lines.
    pub fn describe(&self, variant: TableVariant) -> String {
        let mut parts = vec![format!("table {}", quote_literal(&variant.table_name()))];
        if variant.is_partitioned() {
            parts.push(format!("{} hash partitions", PARTITION_COUNT));
        }
        if let Some(index) = variant.index_name() {
            parts.push(format!("index {}", quote_literal(&index)));
        }
        parts.join(", ")
    }
}
