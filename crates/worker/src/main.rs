use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use folio_db::{PgRecordStore, RecordStore};
use folio_worker::config::{WorkerConfig, DEFAULT_LOG_FILTER};
use folio_worker::engine::SweepEngine;
use folio_worker::registry::{build_job, JOB_NAMES};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Run batch maintenance sweeps over stored collections
#[derive(Parser)]
#[command(name = "folio-worker")]
#[command(about = "folio-worker - Batch maintenance sweeps over stored collections", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available jobs
    #[command(name = "list")]
    List,

    /// Run one job over every record it covers
    #[command(name = "run")]
    Run {
        /// Job name, as printed by `list`
        job: String,

        /// Override the job's shard count
        #[arg(long)]
        shards: Option<usize>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::List => {
            for name in JOB_NAMES {
                println!("{name}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run { job, shards, json } => run(&job, shards, json).await,
    }
}

async fn run(job_name: &str, shards: Option<usize>, json: bool) -> anyhow::Result<ExitCode> {
    let mut config = WorkerConfig::from_env()?;
    config.engine.shard_override = shards;

    let pool = folio_db::create_pool(&config.database_url, config.db_max_connections)
        .await
        .context("Failed to connect to database")?;
    folio_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database connection established");

    folio_db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    let store: Arc<dyn RecordStore> = Arc::new(PgRecordStore::new(pool));
    let job = build_job(job_name, store.clone())?;
    let engine = SweepEngine::new(store, config.engine);
    let report = engine.run(job).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in report.render_lines() {
            println!("{line}");
        }
    }

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!(failed = report.failures.len(), "Sweep finished with failures");
        Ok(ExitCode::FAILURE)
    }
}
