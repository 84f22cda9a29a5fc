use crate::variant::TableVariant;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub postgres: PostgresConfig,
    #[serde(default)]
    pub trino: TrinoConfig,
    #[serde(default)]
    pub bench: BenchConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Attach statement text to debug events
    #[serde(default)]
    pub log_sql: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostgresConfig {
    #[serde(default = "default_pg_host")]
    pub host: String,
    #[serde(default = "default_pg_port")]
    pub port: u16,
    #[serde(default = "default_pg_user")]
    pub user: String,
    #[serde(default = "default_pg_password")]
    pub password: String,
    #[serde(default = "default_pg_database")]
    pub database: String,
    /// Schema holding the benchmark tables
    #[serde(default = "default_schema")]
    pub schema: String,
}

fn default_pg_host() -> String {
    "localhost".to_string()
}

fn default_pg_port() -> u16 {
    5432
}

fn default_pg_user() -> String {
    "postgres".to_string()
}

fn default_pg_password() -> String {
    "postgres".to_string()
}

fn default_pg_database() -> String {
    "appdb".to_string()
}

fn default_schema() -> String {
    "bench".to_string()
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: default_pg_host(),
            port: default_pg_port(),
            user: default_pg_user(),
            password: default_pg_password(),
            database: default_pg_database(),
            schema: default_schema(),
        }
    }
}

impl PostgresConfig {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            urlencoding::encode(&self.user),
            urlencoding::encode(&self.password),
            self.host,
            self.port,
            self.database
        )
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrinoConfig {
    #[serde(default = "default_trino_host")]
    pub host: String,
    #[serde(default = "default_trino_port")]
    pub port: u16,
    /// Trino catalog that maps onto the Postgres database
    #[serde(default = "default_trino_catalog")]
    pub catalog: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_trino_user")]
    pub user: String,
}

fn default_trino_host() -> String {
    "localhost".to_string()
}

fn default_trino_port() -> u16 {
    8080
}

fn default_trino_catalog() -> String {
    "postgres".to_string()
}

fn default_trino_user() -> String {
    "trino".to_string()
}

impl Default for TrinoConfig {
    fn default() -> Self {
        Self {
            host: default_trino_host(),
            port: default_trino_port(),
            catalog: default_trino_catalog(),
            schema: default_schema(),
            user: default_trino_user(),
        }
    }
}

impl TrinoConfig {
    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Engine that fill, read and query benchmarks go through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BenchMode {
    #[default]
    Postgres,
    Trino,
}

impl std::fmt::Display for BenchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BenchMode::Postgres => f.write_str("postgres"),
            BenchMode::Trino => f.write_str("trino"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BenchConfig {
    #[serde(default)]
    pub mode: BenchMode,
    /// Rows added per orchestrator round
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    /// Row count the orchestrator fills the table up to
    #[serde(default = "default_record_max")]
    pub record_max: u64,
    #[serde(default = "default_table_variant")]
    pub table_variant: TableVariant,
    /// Rows per INSERT statement during a full run
    #[serde(default = "default_fill_batch")]
    pub fill_batch: u64,
    /// Rows per INSERT statement for a stand-alone fill
    #[serde(default = "default_fill_chunk")]
    pub fill_chunk: u64,
    #[serde(default = "default_read_samples")]
    pub read_samples: u64,
    #[serde(default = "default_query_runs")]
    pub query_runs: u64,
    /// Upper bound on parameter tuples discovered per query shape
    #[serde(default = "default_discovery_limit")]
    pub discovery_limit: u64,
    /// Allow the query benchmark to update rows so every shape has a match
    #[serde(default)]
    pub repair_fixtures: bool,
}

fn default_batch_size() -> u64 {
    100_000_000
}

fn default_record_max() -> u64 {
    500_000_000
}

fn default_table_variant() -> TableVariant {
    TableVariant::Plain
}

fn default_fill_batch() -> u64 {
    5_000_000
}

fn default_fill_chunk() -> u64 {
    5_000
}

fn default_read_samples() -> u64 {
    100
}

fn default_query_runs() -> u64 {
    5
}

fn default_discovery_limit() -> u64 {
    20
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            mode: BenchMode::default(),
            batch_size: default_batch_size(),
            record_max: default_record_max(),
            table_variant: default_table_variant(),
            fill_batch: default_fill_batch(),
            fill_chunk: default_fill_chunk(),
            read_samples: default_read_samples(),
            query_runs: default_query_runs(),
            discovery_limit: default_discovery_limit(),
            repair_fixtures: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Directory for run, fill and error logs
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,
    /// Directory for read and query benchmark reports
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// Persisted orchestrator state. Defaults to {logs_dir}/bench-full-state.json
    pub state_file: Option<PathBuf>,
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            logs_dir: default_logs_dir(),
            results_dir: default_results_dir(),
            state_file: None,
        }
    }
}

impl PathsConfig {
    pub fn state_file(&self) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(|| self.logs_dir.join("bench-full-state.json"))
    }
}

impl AppConfig {
    /// Load configuration from an optional file and environment variables
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Example: BONUS_BENCH__POSTGRES__HOST=db.internal
        builder = builder.add_source(
            config::Environment::with_prefix("BONUS_BENCH")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let bench = &self.bench;
        let positive = [
            ("bench.batch_size", bench.batch_size),
            ("bench.record_max", bench.record_max),
            ("bench.fill_batch", bench.fill_batch),
            ("bench.fill_chunk", bench.fill_chunk),
            ("bench.read_samples", bench.read_samples),
            ("bench.query_runs", bench.query_runs),
            ("bench.discovery_limit", bench.discovery_limit),
        ];
        for (name, value) in positive {
            if value == 0 {
                anyhow::bail!("'{}' must be greater than zero", name);
            }
        }

        if self.postgres.schema.trim().is_empty() {
            anyhow::bail!("'postgres.schema' cannot be empty");
        }
        if self.postgres.host.trim().is_empty() {
            anyhow::bail!("'postgres.host' cannot be empty");
        }
        if bench.mode == BenchMode::Trino && self.trino.catalog.trim().is_empty() {
            anyhow::bail!("Trino mode requires 'trino.catalog'");
        }

        Ok(())
    }
}
