//! The operations the orchestrator sequences.

use crate::backend::QueryBackend;
use crate::bench::queries::QueryOptions;
use crate::bench::{self, report, FillSummary, LatencyStats, QueryResult};
use crate::config::AppConfig;
use crate::error::BenchError;
use crate::runlog::RunLog;
use crate::schema::SchemaManager;
use crate::variant::TableVariant;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait BenchSteps: Send + Sync {
    async fn create_table(&self, variant: TableVariant) -> Result<(), BenchError>;

    /// Authoritative row count; `TableMissing` when the table is gone.
    async fn row_count(&self, variant: TableVariant) -> Result<u64, BenchError>;

    async fn drop_index(&self, variant: TableVariant) -> Result<(), BenchError>;

    /// Rebuild the secondary index, returning the build time.
    async fn create_index(&self, variant: TableVariant) -> Result<Duration, BenchError>;

    async fn set_logged(&self, variant: TableVariant, logged: bool) -> Result<(), BenchError>;

    async fn analyze(&self, variant: TableVariant) -> Result<(), BenchError>;

    async fn fill(
        &self,
        variant: TableVariant,
        count: u64,
        fill_batch: u64,
        log: &RunLog,
    ) -> Result<FillSummary, BenchError>;

    async fn read(&self, variant: TableVariant, log: &RunLog) -> Result<LatencyStats, BenchError>;

    async fn queries(
        &self,
        variant: TableVariant,
        log: &RunLog,
    ) -> Result<Vec<QueryResult>, BenchError>;
}

/// Steps against a real database. DDL goes to Postgres, benchmarks go
/// through the configured backend.
#[derive(Debug)]
pub struct LiveSteps {
    schema: SchemaManager,
    backend: Arc<dyn QueryBackend>,
    read_samples: u64,
    query_options: QueryOptions,
    results_dir: PathBuf,
}

impl LiveSteps {
    pub fn new(config: &AppConfig, backend: Arc<dyn QueryBackend>) -> Self {
        Self {
            schema: SchemaManager::new(config.postgres.clone()),
            backend,
            read_samples: config.bench.read_samples,
            query_options: QueryOptions {
                runs: config.bench.query_runs,
                discovery_limit: config.bench.discovery_limit,
                repair_fixtures: config.bench.repair_fixtures,
            },
            results_dir: config.paths.results_dir.clone(),
        }
    }
}

#[async_trait]
impl BenchSteps for LiveSteps {
    async fn create_table(&self, variant: TableVariant) -> Result<(), BenchError> {
        self.schema.create_variant(variant).await
    }

    async fn row_count(&self, variant: TableVariant) -> Result<u64, BenchError> {
        self.schema.row_count(variant).await
    }

    async fn drop_index(&self, variant: TableVariant) -> Result<(), BenchError> {
        self.schema.drop_index(variant).await
    }

    async fn create_index(&self, variant: TableVariant) -> Result<Duration, BenchError> {
        self.schema.create_index(variant).await
    }

    async fn set_logged(&self, variant: TableVariant, logged: bool) -> Result<(), BenchError> {
        self.schema.set_logged(variant, logged).await
    }

    async fn analyze(&self, variant: TableVariant) -> Result<(), BenchError> {
        self.schema.analyze(variant).await
    }

    async fn fill(
        &self,
        variant: TableVariant,
        count: u64,
        fill_batch: u64,
        log: &RunLog,
    ) -> Result<FillSummary, BenchError> {
        bench::fill(self.backend.as_ref(), variant, count, fill_batch, log).await
    }

    async fn read(&self, variant: TableVariant, log: &RunLog) -> Result<LatencyStats, BenchError> {
        let stats = bench::run_read(self.backend.as_ref(), variant, self.read_samples).await?;
        let out = report::read_report(variant, self.backend.name(), self.read_samples, &stats);
        log.line(&out);
        let path = report::write_report(&self.results_dir, "read-benchmark", variant, &out)?;
        log.line(format!("Written to {}", path.display()));
        Ok(stats)
    }

    async fn queries(
        &self,
        variant: TableVariant,
        log: &RunLog,
    ) -> Result<Vec<QueryResult>, BenchError> {
        let results =
            bench::run_queries(self.backend.as_ref(), variant, &self.query_options, log).await?;
        let out = report::queries_report(
            variant,
            self.backend.name(),
            self.query_options.runs,
            &results,
        );
        log.line(&out);
        let path = report::write_report(&self.results_dir, "queries-benchmark", variant, &out)?;
        log.line(format!("Written to {}", path.display()));
        Ok(results)
    }
}
