use crate::api::{self, ApiState};
use crate::cli::args::{Cli, Commands};
use crate::cli::config::AppConfig;
use crate::cli::logging;
use crate::models::StationReference;
use crate::pipeline::{drive, IntervalTrigger, PipelineRunner, RunOutcome};
use crate::processors::ObservationProcessor;
use crate::readers::StationReader;
use crate::source::ClimatelySource;
use crate::store::SqliteStore;
use anyhow::{bail, Context};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{self, SignalKind};

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    // .env only fills variables that are not already set
    dotenv::dotenv().ok();

    let config = AppConfig::load(cli.config.as_deref(), &cli.overrides())
        .context("Failed to load configuration")?;
    logging::init(config.level()?, config.log_file.as_deref())?;

    match cli.command {
        Commands::Run { .. } => {
            let mut runner = build_runner(&config)?;
            migrate_store(store_for(&config)).await?;

            tracing::info!(
                message = "scheduler started",
                interval_secs = config.interval_secs,
                top_k = config.top_k,
                database = %config.database_path.display(),
            );

            let mut trigger = IntervalTrigger::new(config.interval(), shutdown_signal());
            let summary = drive(&mut runner, &mut trigger).await;

            println!(
                "Completed {} runs: {} stored, {} skipped, {} failed",
                summary.runs, summary.succeeded, summary.skipped, summary.failed
            );
        }

        Commands::Once { .. } => {
            let mut runner = build_runner(&config)?;
            migrate_store(store_for(&config)).await?;

            match runner.run().await {
                RunOutcome::Success(count) => {
                    println!("Stored {} rows in {}", count, config.database_path.display())
                }
                RunOutcome::SkippedNoData => println!("No valid observations in this snapshot"),
                failed @ RunOutcome::Failed { .. } => bail!("Pipeline run {}", failed),
            }
        }

        Commands::Migrate => {
            let store = store_for(&config);
            let version = migrate_store(store).await?;
            println!(
                "Schema of {} is at version {}",
                config.database_path.display(),
                version
            );
        }

        Commands::Serve { .. } => {
            let store = store_for(&config);
            migrate_store(store.clone()).await?;

            api::serve(config.bind, ApiState::new(store), shutdown_signal())
                .await
                .with_context(|| format!("Read API on {} failed", config.bind))?;
        }
    }

    Ok(())
}

fn store_for(config: &AppConfig) -> SqliteStore {
    SqliteStore::new(&config.database_path)
        .with_busy_timeout(Duration::from_secs(config.store_timeout_secs))
}

/// Apply pending migrations and report the resulting version.
async fn migrate_store(store: SqliteStore) -> anyhow::Result<u32> {
    let version = tokio::task::spawn_blocking(move || {
        store.ensure_schema()?;
        store.schema_version()
    })
    .await
    .context("Schema task did not complete")??;
    Ok(version)
}

fn build_runner(config: &AppConfig) -> anyhow::Result<PipelineRunner> {
    let pipeline = config.pipeline_config();

    let stations = match &config.stations_path {
        Some(path) => {
            let reference = StationReader::new().read_reference(path)?;
            tracing::info!(
                message = "loaded station reference",
                path = %path.display(),
                stations = reference.len(),
            );
            reference
        }
        None => {
            tracing::warn!(message = "no station reference configured, coordinates will be empty");
            StationReference::empty()
        }
    };

    let source = ClimatelySource::new(
        &config.base_url,
        config.require_api_key()?,
        pipeline.fetch_timeout,
    )?
    .with_expected_entry(pipeline.expected_entry.clone());
    tracing::debug!(message = "configured provider", url = %source.display_url());

    Ok(PipelineRunner::new(
        Box::new(source),
        ObservationProcessor::new(Arc::new(stations)),
        store_for(config),
        pipeline,
    ))
}

/// Resolves on the first SIGTERM or SIGINT
async fn shutdown_signal() {
    tokio::select! {
        _ = until_signal(unix::signal(SignalKind::terminate()), "SIGTERM") => {}
        _ = until_signal(unix::signal(SignalKind::interrupt()), "SIGINT") => {}
    }
    tracing::info!(message = "shutdown requested, finishing current run");
}

/// Return after the listener sees its signal. A listener that could not be
/// registered never resolves, so it cannot stop the daemon by itself.
async fn until_signal(listener: io::Result<unix::Signal>, name: &'static str) {
    match listener {
        Ok(mut signal) => {
            signal.recv().await;
        }
        Err(e) => {
            tracing::error!(message = "unable to listen for signal", signal = name, error = %e);
            std::future::pending::<()>().await;
        }
    }
}
