use anyhow::{Context, Result};
use bonus_bench::backend;
use bonus_bench::bench::{self, report, QueryOptions};
use bonus_bench::config::{AppConfig, BenchMode};
use bonus_bench::orchestrator::{BenchOrchestrator, FileStateStore, LiveSteps, RunParams};
use bonus_bench::runlog::RunLog;
use bonus_bench::schema::SchemaManager;
use bonus_bench::telemetry::init_telemetry;
use bonus_bench::TableVariant;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bonus-bench", about = "bonus_registry table layout benchmarks", version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Engine for fill, read and queries (overrides bench.mode)
    #[arg(long, global = true)]
    mode: Option<BenchMode>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone, Copy)]
struct TableArg {
    /// Table variant (default: bench.table_variant)
    #[arg(long)]
    table: Option<TableVariant>,
}

#[derive(Args, Clone, Copy)]
struct TableSelection {
    #[command(flatten)]
    table: TableArg,

    /// Apply to all four variants
    #[arg(long, conflicts_with = "table")]
    all: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Create benchmark tables
    Setup(TableSelection),
    /// Drop benchmark tables with their partitions and indexes
    Drop(TableSelection),
    /// Insert synthetic rows
    Fill {
        #[command(flatten)]
        table: TableArg,
        /// Rows to insert (default: bench.batch_size)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        count: Option<u64>,
        /// Rows per INSERT statement (default: bench.fill_chunk)
        #[arg(long, alias = "chunk", value_parser = clap::value_parser!(u64).range(1..))]
        batch: Option<u64>,
    },
    /// Time point lookups on sampled partition keys
    Read {
        #[command(flatten)]
        table: TableArg,
        /// Keys to sample (default: bench.read_samples)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        samples: Option<u64>,
    },
    /// Time the fixed query catalog
    Queries {
        #[command(flatten)]
        table: TableArg,
        /// Runs per query (default: bench.query_runs)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        runs: Option<u64>,
        /// Update existing rows so every query shape has a match
        #[arg(long)]
        repair_fixtures: bool,
    },
    /// Resumable create, fill and benchmark rounds up to bench.record_max
    Full {
        #[command(flatten)]
        table: TableArg,
        /// Rows per INSERT statement (default: bench.fill_batch)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        batch: Option<u64>,
        /// Update existing rows so every query shape has a match
        #[arg(long)]
        repair_fixtures: bool,
    },
}

impl TableArg {
    fn resolve(&self, config: &AppConfig) -> TableVariant {
        self.table.unwrap_or(config.bench.table_variant)
    }
}

impl TableSelection {
    fn variants(&self, config: &AppConfig) -> Vec<TableVariant> {
        if self.all {
            TableVariant::ALL.to_vec()
        } else {
            vec![self.table.resolve(config)]
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry().map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(mode) = cli.mode {
        config.bench.mode = mode;
    }
    config.validate()?;

    match cli.command {
        Command::Setup(selection) => {
            let schema = SchemaManager::new(config.postgres.clone());
            for variant in selection.variants(&config) {
                println!("Creating {}", schema.describe(variant));
                schema
                    .create_variant(variant)
                    .await
                    .with_context(|| format!("Failed to create {}", variant.table_name()))?;
            }
        }
        Command::Drop(selection) => {
            let schema = SchemaManager::new(config.postgres.clone());
            for variant in selection.variants(&config) {
                schema
                    .drop_variant(variant)
                    .await
                    .with_context(|| format!("Failed to drop {}", variant.table_name()))?;
                println!("Dropped {}", variant.table_name());
            }
        }
        Command::Fill { table, count, batch } => {
            let variant = table.resolve(&config);
            let count = count.unwrap_or(config.bench.batch_size);
            let batch = batch.unwrap_or(config.bench.fill_chunk);
            let backend = backend::from_config(&config)?;

            let log = RunLog::create(&config.paths.logs_dir, "write", variant.as_str())?;
            log.line(format!(
                "# bench-fill table={} count={} chunk={} mode={}",
                variant, count, batch, config.bench.mode
            ));
            let summary = bench::fill(backend.as_ref(), variant, count, batch, &log).await?;
            tracing::info!(rows = summary.rows_inserted, "Fill complete");
            if let Some(path) = log.path() {
                println!("Log: {}", path.display());
            }
        }
        Command::Read { table, samples } => {
            let variant = table.resolve(&config);
            let samples = samples.unwrap_or(config.bench.read_samples);
            let backend = backend::from_config(&config)?;

            println!(
                "Read benchmark table={} samples={} mode={}",
                variant, samples, config.bench.mode
            );
            let stats = bench::run_read(backend.as_ref(), variant, samples).await?;
            let out = report::read_report(variant, backend.name(), samples, &stats);
            let path = report::write_report(&config.paths.results_dir, "read-benchmark", variant, &out)?;
            println!("{}\n\nWritten to {}", out, path.display());
        }
        Command::Queries {
            table,
            runs,
            repair_fixtures,
        } => {
            let variant = table.resolve(&config);
            let options = QueryOptions {
                runs: runs.unwrap_or(config.bench.query_runs),
                discovery_limit: config.bench.discovery_limit,
                repair_fixtures: repair_fixtures || config.bench.repair_fixtures,
            };
            let backend = backend::from_config(&config)?;

            println!(
                "Queries benchmark table={} runs={} mode={}",
                variant, options.runs, config.bench.mode
            );
            let log = RunLog::stdout();
            let results = bench::run_queries(backend.as_ref(), variant, &options, &log).await?;
            let out = report::queries_report(variant, backend.name(), options.runs, &results);
            let path = report::write_report(&config.paths.results_dir, "queries-benchmark", variant, &out)?;
            println!("{}\n\nWritten to {}", out, path.display());
        }
        Command::Full {
            table,
            batch,
            repair_fixtures,
        } => {
            let variant = table.resolve(&config);
            if let Some(batch) = batch {
                config.bench.fill_batch = batch;
            }
            config.bench.repair_fixtures |= repair_fixtures;

            let params = RunParams {
                table: variant,
                record_max: config.bench.record_max,
                batch_size: config.bench.batch_size,
                fill_batch: config.bench.fill_batch,
            };
            let log = RunLog::create(&config.paths.logs_dir, "bench-full", variant.as_str())?;
            log.line(format!(
                "# bench:full table={} batch_size={} record_max={} fill_batch={} mode={}",
                variant, params.batch_size, params.record_max, params.fill_batch, config.bench.mode
            ));
            log.line(format!("Started at {}", chrono::Local::now().to_rfc3339()));

            let backend = backend::from_config(&config)?;
            let steps = LiveSteps::new(&config, backend);
            let store = FileStateStore::new(config.paths.state_file());
            let outcome = BenchOrchestrator::new(&steps, &store, params, &log)
                .run()
                .await?;
            tracing::info!(
                rounds = outcome.rounds,
                rows = outcome.total_rows,
                resumed = outcome.resumed,
                "Full benchmark complete"
            );
        }
    }

    Ok(())
}
