use anyhow::Result;
use bonus_bench::backend;
use bonus_bench::config::AppConfig;
use bonus_bench::http::app_server::AppServer;
use bonus_bench::http::BackendInserter;
use bonus_bench::telemetry::init_telemetry;
use clap::Parser;
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "bonus-bench-server", about = "Single-row insert endpoint for load tests")]
struct Cli {
    /// Path to config file
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let now = Instant::now();
    init_telemetry().map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    let cli = Cli::parse();

    tracing::info!("Starting insert server");

    let config = AppConfig::load(cli.config.as_deref())?;
    config.validate()?;

    tracing::info!(
        "Configuration loaded (mode={}, default table={})",
        config.bench.mode,
        config.bench.table_variant
    );

    let backend = backend::from_config(&config)?;
    let app = AppServer::new(
        Arc::new(BackendInserter::new(backend)),
        config.bench.table_variant,
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server started in {}ms", now.elapsed().as_millis());
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app.router)
        .with_graceful_shutdown(shutdown())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

async fn shutdown() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping server...");
}
