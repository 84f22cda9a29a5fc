//! Schema, fill, read and query benchmarks against a real Postgres.
//!
//! Requires docker; run with `cargo test -- --ignored`.

use bonus_bench::backend::{BackendSession, PostgresBackend, QueryBackend};
use bonus_bench::bench::queries::{expiry_cutoff, QueryDef};
use bonus_bench::bench::{self, QueryOptions, QUERIES};
use bonus_bench::config::PostgresConfig;
use bonus_bench::http::{BackendInserter, Inserter};
use bonus_bench::rows::{coerce, column, RowGenerator};
use bonus_bench::runlog::RunLog;
use bonus_bench::schema::SchemaManager;
use bonus_bench::sql::SqlValue;
use bonus_bench::{BenchError, TableVariant};
use serde_json::Value;
use testcontainers::{runners::AsyncRunner, ImageExt};
use testcontainers_modules::postgres::Postgres;

async fn start_postgres() -> (PostgresConfig, testcontainers::ContainerAsync<Postgres>) {
    let container = Postgres::default()
        .with_tag("15-alpine")
        .start()
        .await
        .expect("Failed to start postgres container");

    let host_port = container.get_host_port_ipv4(5432).await.unwrap();
    let config = PostgresConfig {
        host: "localhost".to_string(),
        port: host_port,
        database: "postgres".to_string(),
        ..Default::default()
    };

    (config, container)
}

fn quiet_log(dir: &tempfile::TempDir) -> RunLog {
    RunLog::open(dir.path().join("test.log")).unwrap().quiet()
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires docker"]
async fn test_create_is_idempotent_for_every_variant() {
    let (config, _container) = start_postgres().await;
    let schema = SchemaManager::new(config);

    schema.create_all().await.unwrap();
    schema.create_all().await.unwrap();

    for variant in TableVariant::ALL {
        assert!(schema.table_exists(variant).await.unwrap());
        assert_eq!(schema.row_count(variant).await.unwrap(), 0);
    }
    assert_eq!(
        schema.list_partitions(TableVariant::Part).await.unwrap().len(),
        64
    );
    assert!(schema
        .list_partitions(TableVariant::Plain)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires docker"]
async fn test_drop_removes_partitions() {
    let (config, _container) = start_postgres().await;
    let schema = SchemaManager::new(config);

    schema.create_variant(TableVariant::IdxPart).await.unwrap();
    schema.drop_variant(TableVariant::IdxPart).await.unwrap();
    schema.drop_variant(TableVariant::IdxPart).await.unwrap();

    assert!(!schema.table_exists(TableVariant::IdxPart).await.unwrap());
    assert!(schema
        .list_partitions(TableVariant::IdxPart)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires docker"]
async fn test_row_count_on_dropped_table_is_missing() {
    let (config, _container) = start_postgres().await;
    let schema = SchemaManager::new(config);

    schema.create_variant(TableVariant::Idx).await.unwrap();
    schema.drop_variant(TableVariant::Idx).await.unwrap();
    let err = schema.row_count(TableVariant::Idx).await.unwrap_err();
    assert!(matches!(err, BenchError::TableMissing { .. }), "{:?}", err);
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires docker"]
async fn test_fill_then_read_single_row() {
    let (config, _container) = start_postgres().await;
    let dir = tempfile::tempdir().unwrap();
    let log = quiet_log(&dir);
    let schema = SchemaManager::new(config.clone());
    let backend = PostgresBackend::new(config);

    schema.create_variant(TableVariant::Part).await.unwrap();
    let summary = bench::fill(&backend, TableVariant::Part, 1, 10, &log)
        .await
        .unwrap();
    assert_eq!(summary.rows_inserted, 1);
    assert_eq!(schema.row_count(TableVariant::Part).await.unwrap(), 1);

    let stats = bench::run_read(&backend, TableVariant::Part, 100)
        .await
        .unwrap();
    assert_eq!(stats.n, 1);
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires docker"]
async fn test_fill_in_chunks_and_index_rebuild() {
    let (config, _container) = start_postgres().await;
    let dir = tempfile::tempdir().unwrap();
    let log = quiet_log(&dir);
    let schema = SchemaManager::new(config.clone());
    let backend = PostgresBackend::new(config);
    let variant = TableVariant::Idx;

    schema.create_variant(variant).await.unwrap();
    schema.drop_index(variant).await.unwrap();
    schema.set_logged(variant, false).await.unwrap();
    bench::fill(&backend, variant, 2500, 1000, &log).await.unwrap();
    schema.set_logged(variant, true).await.unwrap();
    schema.create_index(variant).await.unwrap();
    schema.analyze(variant).await.unwrap();

    assert_eq!(schema.row_count(variant).await.unwrap(), 2500);
    let written = std::fs::read_to_string(dir.path().join("test.log")).unwrap();
    assert_eq!(written.matches("batchSize=").count(), 3);
}

/// Rows discovered for a shape, straight from its discovery statement.
async fn discover(backend: &PostgresBackend, def: &QueryDef, table: &str) -> Vec<Vec<Option<String>>> {
    let sql = def.discovery_sql(table, 20).unwrap();
    let mut session = backend.session().await.unwrap();
    let rows = session.fetch_text(&sql, &[]).await.unwrap();
    session.close().await.unwrap();
    rows
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires docker"]
async fn test_queries_with_fixture_repair() {
    let (config, _container) = start_postgres().await;
    let dir = tempfile::tempdir().unwrap();
    let log = quiet_log(&dir);
    let schema = SchemaManager::new(config.clone());
    let backend = PostgresBackend::new(config);
    let variant = TableVariant::Plain;
    let table = backend.qualified_table(variant);
    let (charge, quota) = (&QUERIES[0], &QUERIES[6]);

    schema.create_variant(variant).await.unwrap();
    bench::fill(&backend, variant, 200, 100, &log).await.unwrap();

    // No row satisfies the charge or quota shapes
    let mut session = backend.session().await.unwrap();
    let updated = session
        .execute(&format!("UPDATE {} SET amount = 1, \"row\" = NULL", table), &[])
        .await
        .unwrap();
    session.close().await.unwrap();
    assert_eq!(updated, 200);
    assert!(discover(&backend, charge, &table).await.is_empty());
    assert!(discover(&backend, quota, &table).await.is_empty());

    let options = QueryOptions {
        runs: 2,
        discovery_limit: 5,
        repair_fixtures: true,
    };
    let results = bench::run_queries(&backend, variant, &options, &log)
        .await
        .unwrap();

    assert!(results.iter().any(|r| r.id == 1));
    assert!(results.iter().any(|r| r.id == 7));
    assert!(results.iter().all(|r| r.stats.n == 2));
    let written = std::fs::read_to_string(dir.path().join("test.log")).unwrap();
    assert_eq!(written.matches("repaired row id=").count(), 2);

    let found = discover(&backend, charge, &table).await;
    assert_eq!(found.len(), 1);
    assert_eq!(discover(&backend, quota, &table).await.len(), 1);

    let columns = [
        "doc_to_track_id",
        "doc_to_track_type_id",
        "accounted_for_bs_profile_id",
        "bonus_type_id",
    ];
    let mut params: Vec<SqlValue> = columns
        .iter()
        .zip(&found[0])
        .map(|(name, cell)| {
            coerce(column(name).unwrap(), &Value::String(cell.clone().unwrap())).unwrap()
        })
        .collect();
    params.push(SqlValue::Date(expiry_cutoff()));

    let mut session = backend.session().await.unwrap();
    let matched = session
        .fetch_discard(&charge.sql(&table), &params)
        .await
        .unwrap();
    session.close().await.unwrap();
    assert_eq!(matched, 1);
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires docker"]
async fn test_single_row_insert() {
    let (config, _container) = start_postgres().await;
    let schema = SchemaManager::new(config.clone());
    let backend = std::sync::Arc::new(PostgresBackend::new(config));
    let inserter = BackendInserter::new(backend.clone());

    schema.create_variant(TableVariant::IdxPart).await.unwrap();
    let row = RowGenerator::new().generate();
    inserter.insert_row(TableVariant::IdxPart, &row).await.unwrap();

    assert_eq!(schema.row_count(TableVariant::IdxPart).await.unwrap(), 1);
    assert_eq!(backend.name(), "postgres");
}
